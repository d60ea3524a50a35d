//! Run identifiers.
//!
//! # ULID ベースの ID
//! - 生成順でソートできるので、ログ上で run の前後関係が追える
//! - 調整なしで生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of one run (one `start` call on the controller).
///
/// Display form is `run-<ULID>`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    /// 新しい RunId を生成
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_run_prefix() {
        let ulid = Ulid::new();
        let id = RunId::from_ulid(ulid);
        assert_eq!(id.to_string(), format!("run-{ulid}"));
    }

    #[test]
    fn generated_ids_sort_by_creation() {
        let first = RunId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = RunId::generate();
        assert!(first < second);
    }

    #[test]
    fn serializes_transparently() {
        let ulid = Ulid::new();
        let id = RunId::from(ulid);
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, format!("\"{ulid}\""));
        let back: RunId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }
}
