//! docker buildx integration
//!
//! - `command`: argument list for `docker buildx build`
//! - `env`: per-run builder instance lifecycle
//! - `orchestrator`: the cache-aware build sequence

pub mod command;
pub mod env;
pub mod orchestrator;

pub use command::{build_args, CacheMode};
pub use env::BuilderHandle;
pub use orchestrator::{BuildOrchestrator, OrchestratorSettings, RunReport};
