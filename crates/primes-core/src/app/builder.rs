//! RunControllerBuilder - RunController の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定の検証は build() 時に行う（start() まで遅らせない）
//! - sink が無ければ BuildError を返す
//! - worker を載せる runtime は `runtime()` で渡すか、build() を呼んだ runtime を使う

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::app::controller::RunController;
use crate::config::EngineConfig;
use crate::domain::PrimesError;
use crate::ports::ResultSink;
use crate::primality::{self, CheckFn};

/// # 使用例
/// ```ignore
/// let controller = RunControllerBuilder::new()
///     .config(EngineConfig::default().with_worker_count(8))
///     .sink(Arc::new(TracingSink))
///     .build()?;
/// ```
pub struct RunControllerBuilder {
    config: EngineConfig,
    sink: Option<Arc<dyn ResultSink>>,
    check: Option<CheckFn>,
    runtime: Option<Handle>,
}

/// BuildError はコントローラ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no result sink configured; call sink() before build()")]
    MissingSink,

    #[error(transparent)]
    InvalidConfig(#[from] PrimesError),

    #[error("no Tokio runtime: call runtime() or build() from inside a runtime")]
    NoRuntime,
}

impl RunControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            sink: None,
            check: None,
            runtime: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the primality check. Defaults to trial division.
    pub fn check(mut self, check: CheckFn) -> Self {
        self.check = Some(check);
        self
    }

    /// Runtime the workers are spawned on. `start` may then be called from
    /// any thread.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<RunController, BuildError> {
        self.config.validate()?;
        let sink = self.sink.ok_or(BuildError::MissingSink)?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        let check = self.check.unwrap_or_else(primality::trial_division);
        Ok(RunController::from_parts(self.config, sink, check, runtime))
    }
}

impl Default for RunControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;
    use crate::ports::NoopSink;

    #[tokio::test]
    async fn test_build_success() {
        let controller = RunControllerBuilder::new()
            .sink(Arc::new(NoopSink))
            .build()
            .unwrap();
        assert_eq!(controller.status(), RunStatus::Idle);
        assert_eq!(controller.config(), &EngineConfig::default());
    }

    #[test]
    fn test_build_missing_sink() {
        let result = RunControllerBuilder::new().build();
        assert!(matches!(result, Err(BuildError::MissingSink)));
    }

    #[test]
    fn test_build_invalid_config() {
        let result = RunControllerBuilder::new()
            .config(EngineConfig::default().with_worker_count(0))
            .sink(Arc::new(NoopSink))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::InvalidConfig(PrimesError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_build_without_runtime() {
        let result = RunControllerBuilder::new().sink(Arc::new(NoopSink)).build();
        assert!(matches!(result, Err(BuildError::NoRuntime)));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let controller = RunControllerBuilder::new()
            .sink(Arc::new(NoopSink))
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert_eq!(controller.status(), RunStatus::Idle);
    }
}
