//! Crate-level unit and BDD tests.
