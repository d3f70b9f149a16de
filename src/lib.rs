// THEORY:
// This file is the main entry point for the `atlas_dedup` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like an atlas build pipeline).
//
// The primary goal is to export the `Optimizer` and its associated data
// structures (`OptimizerConfig`, `RemovalRecord`, etc.) as the clean, high-level
// interface for the entire deduplication engine. The internal modules
// (`core_modules`) stay available for consumers that need to plug in their own
// sizing, scoring, or enumeration strategies, but the optimizer module
// re-exports everything a typical caller touches.

pub mod cancel;
pub mod core_modules;
pub mod error;
pub mod optimizer;
pub mod progress;
