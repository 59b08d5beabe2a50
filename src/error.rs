// src/error.rs

use thiserror::Error;

use crate::map::LineId;

/// Everything that can stop a BSP build.
///
/// The first group are setup errors raised while a [`BspBuilder`](crate::bsp::BspBuilder)
/// is being constructed; no tree is produced. The second group are
/// internal-consistency failures raised mid-build. They point at a defect in one
/// of the sub-engines and are never retried.
#[derive(Debug, Error)]
pub enum BspError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed map line {line}: {reason}")]
    MalformedLine { line: LineId, reason: String },

    #[error("map data unavailable: {0}")]
    MapData(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("work stack exceeded {limit} pending items")]
    WorkStackOverflow { limit: usize },

    #[error("no splitter available for {segments} non-convex segments on branch {branch:?}")]
    MissingSplitter { branch: String, segments: usize },

    #[error("work stack is empty but the build is not complete")]
    EmptyWorkStack,
}

impl BspError {
    /// `true` for failures caused by a builder defect rather than by the input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            BspError::WorkStackOverflow { .. }
                | BspError::MissingSplitter { .. }
                | BspError::EmptyWorkStack
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(BspError::WorkStackOverflow { limit: 10 }.is_internal());
        assert!(BspError::EmptyWorkStack.is_internal());
        assert!(!BspError::InvalidConfig("x".into()).is_internal());
        assert!(!BspError::MalformedLine {
            line: LineId(3),
            reason: "nan".into()
        }
        .is_internal());
    }

    #[test]
    fn test_display_names_line() {
        let err = BspError::MalformedLine {
            line: LineId(7),
            reason: "start x is not finite".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed map line #7: start x is not finite"
        );
    }
}
