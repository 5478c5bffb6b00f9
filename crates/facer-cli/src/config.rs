use anyhow::{Context, Result};
use facer_aws::TableOptions;
use facer_core::{BatchPolicy, MatchThreshold};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration, loaded from an optional TOML file with defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// V4L2 device of the camera (default: /dev/video0).
    pub camera_device: String,
    /// Where each capture is written; overwritten every time.
    pub capture_path: PathBuf,
    /// Auto-exposure settle time before the kept frame.
    pub warmup_ms: u64,
    /// Minimum similarity (0–100) for recognition.
    pub match_threshold: MatchThreshold,
    /// Region override; the profile's region is used when unset.
    pub region: Option<String>,
    /// Max wait for a newly created identity table to become active.
    pub table_wait_secs: u64,
    pub read_capacity: i64,
    pub write_capacity: i64,
    /// Directory enrollment failure policy (`fail-fast` or `keep-going`).
    pub batch_policy: BatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: facer_hw::DEFAULT_DEVICE.to_string(),
            capture_path: PathBuf::from("selfie.png"),
            warmup_ms: facer_hw::DEFAULT_WARMUP.as_millis() as u64,
            match_threshold: MatchThreshold::default(),
            region: None,
            table_wait_secs: 60,
            read_capacity: 5,
            write_capacity: 5,
            batch_policy: BatchPolicy::default(),
        }
    }
}

impl Config {
    /// Load from `explicit` if given (must exist), else from the default
    /// location if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config =
            Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            read_capacity: self.read_capacity,
            write_capacity: self.write_capacity,
            ready_timeout: Duration::from_secs(self.table_wait_secs),
            ..TableOptions::default()
        }
    }
}

/// `$XDG_CONFIG_HOME/facer/config.toml`, falling back to `~/.config`.
fn default_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
        .ok()?;
    Some(base.join("facer").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.capture_path, PathBuf::from("selfie.png"));
        assert_eq!(config.warmup(), Duration::from_millis(200));
        assert_eq!(config.match_threshold.value(), 80.0);
        assert_eq!(config.batch_policy, BatchPolicy::FailFast);
        assert!(config.region.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse(
            r#"
            camera_device = "/dev/video2"
            capture_path = "/tmp/capture.png"
            warmup_ms = 500
            match_threshold = 90.0
            region = "eu-west-1"
            table_wait_secs = 120
            read_capacity = 1
            write_capacity = 2
            batch_policy = "keep-going"
            "#,
        )
        .unwrap();

        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!(config.warmup(), Duration::from_millis(500));
        assert_eq!(config.match_threshold.value(), 90.0);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.batch_policy, BatchPolicy::KeepGoing);

        let options = config.table_options();
        assert_eq!(options.read_capacity, 1);
        assert_eq!(options.write_capacity, 2);
        assert_eq!(options.ready_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(Config::parse("match_threshold = 150.0").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("camera = \"/dev/video1\"").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facer.toml");
        std::fs::write(&path, "warmup_ms = 50\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.warmup_ms, 50);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
