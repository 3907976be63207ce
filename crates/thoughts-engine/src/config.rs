//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for an [`Outline`](crate::outline::Outline).
///
/// Missing fields deserialize to their defaults, so hosts can embed a partial
/// table in their own settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether `check_integrity` inspects and repairs. When false it always
    /// reports `NoOp`.
    pub integrity_check: bool,
    /// Step used by `rank_after` / `rank_before` past the last / first
    /// sibling. Default: 1.0.
    pub rank_increment: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            integrity_check: true,
            rank_increment: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"integrity_check": false}"#).unwrap();
        assert!(!config.integrity_check);
        assert_eq!(config.rank_increment, 1.0);
    }
}
