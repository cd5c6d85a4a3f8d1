//! Errors surfaced by the gridstore indices.
//!
//! Only the conditions below are errors. Duplicate adds, removal of absent
//! edges or values and deletes of unknown ids are silent no-ops so the stores
//! stay idempotent under replay.

use thiserror::Error;

use crate::label::LabelName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Malformed input: bad address text, bad label name, bad paging window,
    /// non-inclusive range bound.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Raised only by `load_or_fail`-style calls; plain loads return `None`.
    #[error("not found: {0}")]
    NotFound(String),

    /// A label chain revisited a label. `path` is every label visited in
    /// order followed by the repeated one.
    #[error("Cycle detected for {}", format_cycle(.path))]
    CycleDetected { path: Vec<LabelName> },

    /// A watcher handle outlived the registry it was issued by.
    #[error("watcher registry has been dropped")]
    WatcherDetached,
}

impl StoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StoreError::InvalidArgument(msg.into())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        StoreError::NotFound(what.to_string())
    }
}

fn format_cycle(path: &[LabelName]) -> String {
    path.iter()
        .map(|label| format!("\"{label}\""))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message() {
        let path = ["A", "B", "C", "A"]
            .iter()
            .map(|s| LabelName::new(*s).unwrap())
            .collect();
        let err = StoreError::CycleDetected { path };
        assert_eq!(err.to_string(), r#"Cycle detected for "A" -> "B" -> "C" -> "A""#);
    }

    #[test]
    fn invalid_argument_message() {
        assert_eq!(
            StoreError::invalid("offset too large").to_string(),
            "invalid argument: offset too large"
        );
        assert_eq!(StoreError::not_found("B2").to_string(), "not found: B2");
    }
}
