#![allow(dead_code)]

use gridstore::{CellRange, CellReference, LabelName};

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn cell(s: &str) -> CellReference {
    s.parse().unwrap()
}

pub fn range(s: &str) -> CellRange {
    s.parse().unwrap()
}

pub fn label(s: &str) -> LabelName {
    LabelName::new(s).unwrap()
}
