//! Runtime configuration
//!
//! Priority order for every key:
//! 1. Command-line argument or environment variable
//! 2. TOML config file (`--config`)
//! 3. Built-in default

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::resolver::{RetryPolicy, DEFAULT_RESOLVE_TIMEOUT};

pub const DEFAULT_CATALOG: &str = "music_data.json";
pub const DEFAULT_LOG_DIR: &str = ".logs";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/music/url";
const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Check URLs and run a clock, no sound device needed
    #[default]
    Headless,
    /// Play through the default sound device
    Rodio,
}

/// Command-line arguments for jukebox-rs
#[derive(Parser, Debug, Default)]
#[command(name = "jukebox-rs")]
#[command(about = "Terminal player for a fixed catalog of streamable tracks")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog JSON file
    #[arg(long, env = "JUKEBOX_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, env = "JUKEBOX_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// URL lookup service endpoint
    #[arg(long, env = "JUKEBOX_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Seconds to wait for the lookup service
    #[arg(long, env = "JUKEBOX_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Shortest delay before the automatic retry, in milliseconds
    #[arg(long, env = "JUKEBOX_RETRY_MIN_MS")]
    pub retry_min_ms: Option<u64>,

    /// Upper bound (exclusive) of the retry delay, in milliseconds
    #[arg(long, env = "JUKEBOX_RETRY_MAX_MS")]
    pub retry_max_ms: Option<u64>,

    /// Initial volume, 0.0 - 1.0
    #[arg(long, env = "JUKEBOX_VOLUME")]
    pub volume: Option<f32>,

    /// Audio output
    #[arg(long, value_enum, env = "JUKEBOX_OUTPUT")]
    pub output: Option<OutputKind>,

    /// Where downloads are saved
    #[arg(long, env = "JUKEBOX_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    catalog: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    resolver: ResolverSection,
    playback: PlaybackSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResolverSection {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    retry_min_ms: Option<u64>,
    retry_max_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PlaybackSection {
    volume: Option<f32>,
    output: Option<OutputKind>,
    download_dir: Option<PathBuf>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub catalog: PathBuf,
    pub log_dir: PathBuf,
    pub endpoint: String,
    pub resolve_timeout: Duration,
    pub retry: RetryPolicy,
    pub volume: f32,
    pub output: OutputKind,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: Args, file: FileConfig) -> Result<Self> {
        let timeout_secs = args
            .timeout_secs
            .or(file.resolver.timeout_secs)
            .unwrap_or(DEFAULT_RESOLVE_TIMEOUT.as_secs());
        if timeout_secs == 0 {
            bail!("resolver timeout must be at least one second");
        }

        let defaults = RetryPolicy::default();
        let retry_min_ms = args
            .retry_min_ms
            .or(file.resolver.retry_min_ms)
            .unwrap_or(defaults.min_delay.as_millis() as u64);
        let retry_max_ms = args
            .retry_max_ms
            .or(file.resolver.retry_max_ms)
            .unwrap_or(defaults.max_delay.as_millis() as u64);
        if retry_max_ms < retry_min_ms {
            bail!(
                "retry_max_ms ({}) is below retry_min_ms ({})",
                retry_max_ms,
                retry_min_ms
            );
        }

        let volume = args
            .volume
            .or(file.playback.volume)
            .unwrap_or(DEFAULT_VOLUME);
        if !(0.0..=1.0).contains(&volume) {
            bail!("volume must be between 0.0 and 1.0, got {}", volume);
        }

        Ok(Self {
            catalog: args
                .catalog
                .or(file.catalog)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG)),
            log_dir: args
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            endpoint: args
                .endpoint
                .or(file.resolver.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            resolve_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                min_delay: Duration::from_millis(retry_min_ms),
                max_delay: Duration::from_millis(retry_max_ms),
            },
            volume,
            output: args.output.or(file.playback.output).unwrap_or_default(),
            download_dir: args
                .download_dir
                .or(file.playback.download_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}
