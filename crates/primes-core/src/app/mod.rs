//! App - アプリケーション層
//!
//! pool / aggregator / sink を組み合わせて run を実行する。
//!
//! # 主要コンポーネント
//! - **RunControllerBuilder**: 構築と起動時検証
//! - **RunController**: start / cancel と状態遷移
//! - **ResultAggregator**: outcome の集約と不変条件チェック

pub mod aggregator;
pub mod builder;
pub mod controller;

pub use self::aggregator::{ResultAggregator, RunState};
pub use self::builder::{BuildError, RunControllerBuilder};
pub use self::controller::{RunController, RunHandle};
