//! Training module
//!
//! This module provides:
//! - The supervised training loop (Adam + binary cross-entropy)
//! - Per-epoch history with JSON and SVG output
//! - Model evaluation shared with the `evaluate` command

pub mod evaluation;
pub mod trainer;

pub use evaluation::{evaluate_model, Evaluation};
pub use trainer::{
    build_generators, run_training, EpochRecord, Generators, TrainingHistory, TrainingOutcome,
};
