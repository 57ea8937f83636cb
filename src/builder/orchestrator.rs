//! Build orchestration
//!
//! One run goes through:
//!
//! ```text
//! restore cache? -> ensure cache dirs -> create builder -> build
//!     -> promote cache? -> save cache? -> destroy builder
//! ```
//!
//! The builder instance is destroyed on every path once it was created.
//! Restore misses, promotion failures and builder teardown failures are
//! logged and never fail the run.

use crate::builder::command::{build_args, CacheMode};
use crate::builder::env::{self, BuilderHandle};
use crate::cache::{self, CacheBackend, CacheKeys, CacheLocation};
use crate::error::{Stage, StepError, StepResult};
use crate::log_writer::SharedLineWriter;
use crate::process::{CommandSpec, ProcessRunner};
use crate::step::BuildConfiguration;
use std::sync::Arc;
use tracing::{info, warn};

/// Settings the orchestrator needs besides the per-run configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Builder executable, normally `docker`
    pub program: String,
    pub location: CacheLocation,
}

/// What happened during a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Key the cache was restored from, if any
    pub restored_key: Option<String>,
    pub builder: Option<String>,
    /// Whether the staging cache replaced the stable one
    pub promoted: bool,
    pub saved_key: Option<String>,
}

pub struct BuildOrchestrator {
    runner: Arc<dyn ProcessRunner>,
    backend: Arc<dyn CacheBackend>,
    settings: OrchestratorSettings,
    output: SharedLineWriter,
}

impl BuildOrchestrator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        backend: Arc<dyn CacheBackend>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            runner,
            backend,
            settings,
            output: SharedLineWriter::tracing(),
        }
    }

    /// Send builder output somewhere other than the tracing subscriber
    pub fn with_output(mut self, output: SharedLineWriter) -> Self {
        self.output = output;
        self
    }

    pub async fn run(
        &self,
        config: &BuildConfiguration,
        keys: &CacheKeys,
    ) -> StepResult<RunReport> {
        let mut report = RunReport::default();

        if config.use_cache {
            report.restored_key = self
                .restore_cache(keys)
                .await
                .map_err(|e| e.stage(Stage::RestoreCache))?;
        }

        info!("Building docker image...");

        let location = &self.settings.location;
        for dir in [location.stable(), location.staging()] {
            cache::ensure_exists(dir)
                .await
                .map_err(|e| e.stage(Stage::EnsureCacheDirs))?;
        }

        let handle = env::create(
            self.runner.as_ref(),
            &self.settings.program,
            config.host_network,
        )
        .await
        .map_err(|e| e.stage(Stage::CreateBuilderEnv))?;
        report.builder = Some(handle.name().to_string());

        let outcome = self.build_and_persist(config, keys, &mut report).await;

        self.destroy_builder(&handle).await;

        outcome.map(|()| report)
    }

    async fn restore_cache(&self, keys: &CacheKeys) -> StepResult<Option<String>> {
        info!("Restoring cache...");

        let hit = self.backend.restore(&keys.restore_keys()).await?;
        match &hit {
            Some(key) => info!("Restored cache from key {}", key),
            None => info!("No cache entry found, building without cache"),
        }
        Ok(hit)
    }

    async fn build_and_persist(
        &self,
        config: &BuildConfiguration,
        keys: &CacheKeys,
        report: &mut RunReport,
    ) -> StepResult<()> {
        self.build(config)
            .await
            .map_err(|e| e.stage(Stage::Build))?;

        if !config.use_cache {
            return Ok(());
        }

        let location = &self.settings.location;
        match cache::promote(location.staging(), location.stable()).await {
            Ok(()) => report.promoted = true,
            Err(e) => {
                warn!("Cache update lost, the image itself was built: {}", e);
                warn!(
                    "Skipping cache save for {}: stable cache was not refreshed",
                    keys.full()
                );
                return Ok(());
            }
        }

        info!("Saving cache...");
        self.backend
            .save(keys.full(), &[location.stable().to_path_buf()])
            .await
            .map_err(|e| e.stage(Stage::SaveCache))?;
        report.saved_key = Some(keys.full().to_string());

        Ok(())
    }

    async fn build(&self, config: &BuildConfiguration) -> StepResult<()> {
        let mode = if config.use_cache {
            CacheMode::Local(&self.settings.location)
        } else {
            CacheMode::Raw
        };
        let cmd = CommandSpec::new(self.settings.program.clone(), build_args(config, mode));
        info!("$ {}", cmd);

        let code = self.runner.run(&cmd, self.output.clone()).await?;
        if code != 0 {
            return Err(StepError::BuildExecution {
                command: cmd.to_string(),
                code,
            });
        }
        Ok(())
    }

    async fn destroy_builder(&self, handle: &BuilderHandle) {
        if let Err(e) = env::destroy(self.runner.as_ref(), &self.settings.program, handle).await {
            warn!("destroy buildx instance: {}", e);
        }
    }
}
