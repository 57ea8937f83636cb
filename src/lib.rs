//! buildx-step - docker buildx with a persistent layer cache
//!
//! Restores a saved layer cache, builds through a temporary buildx builder
//! and saves the refreshed cache for the next isolated CI run.

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod log_writer;
pub mod process;
pub mod step;
pub mod tokenize;

pub use error::{StepError, StepResult};
