//! Step inputs and the validated per-run build configuration

use crate::error::{StepError, StepResult};
use std::fmt;

/// Raw step inputs as received from the CI environment
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    pub use_cache: bool,
    pub push: bool,
    pub verbose: bool,
    pub host_network: bool,
    pub tags: Option<String>,
    pub file: Option<String>,
    pub context: Option<String>,
    pub build_arg: Option<String>,
    pub cache_from: Option<String>,
    pub cache_to: Option<String>,
    pub extra_options: Option<String>,
}

/// Immutable configuration for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Image tags; never empty, the first one names the cache line
    pub tags: Vec<String>,
    pub file: String,
    pub context: String,
    pub build_args: Vec<String>,
    pub cache_from: Vec<String>,
    pub cache_to: Vec<String>,
    /// Each line is tokenized on its own
    pub extra_options: Vec<String>,
    pub push: bool,
    pub host_network: bool,
    pub use_cache: bool,
    pub verbose: bool,
}

/// Split a newline-separated input, dropping blank lines and `\r` endings
pub fn split_lines(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn required(name: &str, value: Option<&str>) -> StepResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(StepError::ConfigParse(format!("missing required input: {}", name))),
    }
}

impl BuildConfiguration {
    pub fn from_inputs(inputs: &StepInputs) -> StepResult<Self> {
        let tags = split_lines(inputs.tags.as_deref());
        if tags.is_empty() {
            return Err(StepError::ConfigParse(
                "missing required input: tags".to_string(),
            ));
        }

        Ok(Self {
            tags,
            file: required("file", inputs.file.as_deref())?,
            context: required("context", inputs.context.as_deref())?,
            build_args: split_lines(inputs.build_arg.as_deref()),
            cache_from: split_lines(inputs.cache_from.as_deref()),
            cache_to: split_lines(inputs.cache_to.as_deref()),
            extra_options: split_lines(inputs.extra_options.as_deref()),
            push: inputs.push,
            host_network: inputs.host_network,
            use_cache: inputs.use_cache,
            verbose: inputs.verbose,
        })
    }

    /// The tag that discriminates cache keys
    pub fn cache_tag(&self) -> &str {
        &self.tags[0]
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "- use_bitrise_cache: {}", self.use_cache)?;
        writeln!(f, "- push: {}", self.push)?;
        writeln!(f, "- verbose: {}", self.verbose)?;
        writeln!(f, "- buildx_host_network: {}", self.host_network)?;
        writeln!(f, "- tags: {}", self.tags.join(", "))?;
        writeln!(f, "- file: {}", self.file)?;
        writeln!(f, "- context: {}", self.context)?;
        writeln!(f, "- build_arg: {}", self.build_args.join(", "))?;
        writeln!(f, "- cache_from: {}", self.cache_from.join(", "))?;
        writeln!(f, "- cache_to: {}", self.cache_to.join(", "))?;
        write!(f, "- extra_options: {}", self.extra_options.join(" | "))
    }
}
