//! Cross-crate integration tests for Canopy
//!
//! The tests under `tests/` load settings with `canopy-config` and drive a
//! full application through `canopy-engine`.
