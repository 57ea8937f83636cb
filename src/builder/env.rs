//! Transient buildx builder instances
//!
//! Each run creates its own `docker-container` builder with
//! `docker buildx create --use` and removes it afterwards, so the local
//! cache export is available and runs never share builder state.

use crate::error::{StepError, StepResult};
use crate::process::{CommandSpec, ProcessRunner};
use std::fmt;
use tracing::{debug, info};

/// Name of a builder instance created for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderHandle(String);

impl BuilderHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuilderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn create_args(host_network: bool) -> Vec<String> {
    let mut args = vec!["buildx".to_string(), "create".to_string(), "--use".to_string()];
    if host_network {
        args.extend([
            "--driver-opt".to_string(),
            "network=host".to_string(),
            "--buildkitd-flags".to_string(),
            "--allow-insecure-entitlement network.host".to_string(),
        ]);
    }
    args
}

pub fn destroy_args(handle: &BuilderHandle) -> Vec<String> {
    vec![
        "buildx".to_string(),
        "rm".to_string(),
        "--force".to_string(),
        handle.name().to_string(),
    ]
}

/// Create a builder instance and select it for subsequent builds
pub async fn create(
    runner: &dyn ProcessRunner,
    program: &str,
    host_network: bool,
) -> StepResult<BuilderHandle> {
    let cmd = CommandSpec::new(program, create_args(host_network));
    info!("$ {}", cmd);

    let out = runner.run_capture_output(&cmd).await?;
    if !out.success() {
        return Err(StepError::BuilderEnv(format!(
            "create buildx instance failed (exit code {}): {}",
            out.code, out.output
        )));
    }
    if out.output.is_empty() {
        return Err(StepError::BuilderEnv(
            "buildx create did not report an instance name".to_string(),
        ));
    }

    debug!("Created buildx instance {}", out.output);
    Ok(BuilderHandle(out.output))
}

/// Remove a builder instance
pub async fn destroy(
    runner: &dyn ProcessRunner,
    program: &str,
    handle: &BuilderHandle,
) -> StepResult<()> {
    let cmd = CommandSpec::new(program, destroy_args(handle));
    debug!("$ {}", cmd);

    let out = runner.run_capture_output(&cmd).await?;
    if !out.success() {
        return Err(StepError::BuilderEnv(format!(
            "remove buildx instance {} failed: {}",
            handle, out.output
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_plain() {
        assert_eq!(create_args(false), vec!["buildx", "create", "--use"]);
    }

    #[test]
    fn create_args_host_network() {
        assert_eq!(
            create_args(true),
            vec![
                "buildx",
                "create",
                "--use",
                "--driver-opt",
                "network=host",
                "--buildkitd-flags",
                "--allow-insecure-entitlement network.host",
            ]
        );
    }

    #[test]
    fn destroy_args_name_instance() {
        let handle = BuilderHandle("eager_turing".to_string());
        assert_eq!(
            destroy_args(&handle),
            vec!["buildx", "rm", "--force", "eager_turing"]
        );
    }
}
