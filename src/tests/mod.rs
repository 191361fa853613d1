//! Behavior tests for the labeler.
//!
//! These drive the rule engine and the full labeler through message
//! sequences, with the in-memory gateway standing in for the backend.

mod labeler_tests;
