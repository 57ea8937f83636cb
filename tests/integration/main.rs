//! Integration tests for buildx-step

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const STEP_INPUTS: &[&str] = &[
        "tags",
        "file",
        "context",
        "use_bitrise_cache",
        "push",
        "verbose",
        "buildx_host_network",
        "build_arg",
        "cache_from",
        "cache_to",
        "extra_options",
        "BITRISE_GIT_BRANCH",
        "BITRISE_GIT_COMMIT",
        "RUST_LOG",
    ];

    /// Command with a private settings file and no inherited step inputs
    fn step(settings: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("buildx-step");
        for name in STEP_INPUTS {
            cmd.env_remove(name);
        }
        cmd.env("BUILDX_STEP_CONFIG", settings);
        cmd
    }

    fn write_settings(temp: &TempDir, program: &str) -> std::path::PathBuf {
        let path = temp.path().join("config.toml");
        let content = format!(
            "[cache]\ndir = {:?}\nstore_dir = {:?}\n\n[builder]\nprogram = {:?}\n",
            temp.path().join("buildx-cache"),
            temp.path().join("store"),
            program,
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("persistent layer cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildx-step"));
    }

    #[test]
    fn config_path_uses_override() {
        let temp = TempDir::new().unwrap();
        let settings = temp.path().join("custom.toml");
        step(&settings)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("/tmp/.buildx-cache"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let settings = temp.path().join("nested").join("config.toml");
        step(&settings)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(settings.exists());

        step(&settings)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_settings_fail() {
        let temp = TempDir::new().unwrap();
        let settings = temp.path().join("config.toml");
        std::fs::write(&settings, "cache = 5").unwrap();
        step(&settings)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn config_init_force_replaces_broken_file() {
        let temp = TempDir::new().unwrap();
        let settings = temp.path().join("config.toml");
        std::fs::write(&settings, "[cache]\ncompression_level = 99\n").unwrap();

        step(&settings)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("compression_level"));

        step(&settings)
            .args(["config", "init", "--force"])
            .assert()
            .success();

        step(&settings)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("compression_level = 3"));
    }

    #[test]
    fn cache_keys_most_specific_first() {
        let temp = TempDir::new().unwrap();
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        step(&temp.path().join("config.toml"))
            .args([
                "cache", "keys", "--tags", "app:1.0", "--branch", "main", "--commit", "abc",
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!(
                "docker-app:1.0-{os}-{arch}-main-abc\n\
                 docker-app:1.0-{os}-{arch}-main\n\
                 docker-app:1.0-{os}-{arch}\n"
            )));
    }

    #[test]
    fn cache_keys_from_env_inputs() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .env("tags", "web:2\nweb:latest")
            .env("BITRISE_GIT_BRANCH", "dev")
            .args(["cache", "keys"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("docker-web:2-"))
            .stdout(predicate::str::contains("web:latest").not());
    }

    #[test]
    fn cache_list_empty_store() {
        let temp = TempDir::new().unwrap();
        let settings = write_settings(&temp, "docker");
        step(&settings)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No saved caches"));
    }

    #[test]
    fn run_without_tags_fails() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .args(["run", "--file", "Dockerfile", "--context", "."])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid step input"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn run_rejects_bad_flag_value() {
        let temp = TempDir::new().unwrap();
        step(&temp.path().join("config.toml"))
            .env("use_bitrise_cache", "sometimes")
            .args(["run"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("use yes/no"));
    }

    #[cfg(unix)]
    fn fake_docker(dir: &Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("docker");
        std::fs::write(
            &path,
            "#!/bin/sh\n\
             case \"$2\" in\n\
               create) echo fake-builder ;;\n\
               build) echo \"building with $*\" ;;\n\
             esac\n\
             exit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn run_saves_then_restores_cache() {
        let temp = TempDir::new().unwrap();
        let docker = fake_docker(temp.path());
        let settings = write_settings(&temp, docker.to_str().unwrap());

        let run = |expect: &str| {
            step(&settings)
                .env("tags", "app:1.0")
                .env("file", "Dockerfile")
                .env("context", ".")
                .env("use_bitrise_cache", "yes")
                .env("BITRISE_GIT_BRANCH", "main")
                .env("BITRISE_GIT_COMMIT", "abc")
                .arg("run")
                .assert()
                .success()
                .stdout(predicate::str::contains("- use_bitrise_cache: true"))
                .stdout(predicate::str::contains("Built app:1.0"))
                .stdout(predicate::str::contains("--cache-from=type=local"))
                .stdout(predicate::str::contains(expect.to_string()));
        };

        run("Cache saved as:");
        assert!(temp.path().join("buildx-cache").is_dir());
        assert!(!temp.path().join("buildx-cache-new").exists());

        run("Cache restored from: docker-app:1.0-");

        step(&settings)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-main-abc"));
    }

    #[cfg(unix)]
    #[test]
    fn run_without_cache_skips_save() {
        let temp = TempDir::new().unwrap();
        let docker = fake_docker(temp.path());
        let settings = write_settings(&temp, docker.to_str().unwrap());

        step(&settings)
            .env("tags", "app:1.0")
            .env("file", "Dockerfile")
            .env("context", ".")
            .env("cache_from", "type=registry,ref=example/app:cache")
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("--cache-from=type=registry"))
            .stdout(predicate::str::contains("Cache saved as").not());

        step(&settings)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No saved caches"));
    }
}
