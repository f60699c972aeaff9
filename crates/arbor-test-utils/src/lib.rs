//! Shared test utilities for the arbor workspace.
//!
//! This crate provides standardised source/target tree fixtures so crate
//! test suites do not each hand-roll temp directories. It is a
//! dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder for directory trees on disk

pub mod tree;

pub use tree::TestTree;
