//! `docker buildx build` argument construction

use crate::cache::CacheLocation;
use crate::step::BuildConfiguration;
use crate::tokenize::tokenize_lines;

/// Options appended to the local cache export
pub const LOCAL_CACHE_EXPORT_OPTIONS: &str = "mode=max,compression=zstd";

/// Where the builder reads and writes its layer cache
#[derive(Debug, Clone, Copy)]
pub enum CacheMode<'a> {
    /// Integrated cache: read the stable directory, export to staging
    Local(&'a CacheLocation),
    /// Use the raw cache-from/cache-to inputs, if any
    Raw,
}

/// Build the argument list for the builder program. Pure.
pub fn build_args(config: &BuildConfiguration, cache_mode: CacheMode<'_>) -> Vec<String> {
    let mut args = vec!["buildx".to_string(), "build".to_string()];

    for arg in &config.build_args {
        args.push("--build-arg".to_string());
        args.push(arg.clone());
    }

    match cache_mode {
        CacheMode::Local(location) => {
            args.push(format!(
                "--cache-from=type=local,src={}",
                location.stable().display()
            ));
            args.push(format!(
                "--cache-to=type=local,dest={},{}",
                location.staging().display(),
                LOCAL_CACHE_EXPORT_OPTIONS
            ));
        }
        CacheMode::Raw => {
            // cache-from falls through to cache-to; cache-to alone skips cache-from
            for from in &config.cache_from {
                args.push(format!("--cache-from={}", from));
            }
            for to in &config.cache_to {
                args.push(format!("--cache-to={}", to));
            }
        }
    }

    args.extend(tokenize_lines(&config.extra_options));

    if config.push {
        args.push("--push".to_string());
    } else {
        // Without --load the result stays in the builder cache and the
        // image cannot be used later in the same run.
        args.push("--load".to_string());
    }

    for tag in &config.tags {
        args.push("--tag".to_string());
        args.push(tag.clone());
    }

    args.push("-f".to_string());
    args.push(config.file.clone());
    args.push(config.context.clone());

    args
}
