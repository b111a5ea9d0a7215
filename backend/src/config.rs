//! Configuration management.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::topology::{BlinderSettings, DEFAULT_AUDIO_CAPS, DEFAULT_VIDEO_CAPS};

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    blinder: BlinderConfig,
    #[serde(default)]
    mix: MixConfig,
    #[serde(default)]
    caps: CapsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlinderConfig {
    /// Filler source names, in pad order
    #[serde(default)]
    sources: Vec<String>,
    /// Default gain of the filler audio
    #[serde(default = "default_volume")]
    volume: f64,
}

impl Default for BlinderConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            volume: default_volume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct MixConfig {
    /// Whether a secondary (slides) video bus is blinded too
    #[serde(default)]
    slides: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CapsConfig {
    #[serde(default = "default_video_caps")]
    video: String,
    #[serde(default = "default_audio_caps")]
    audio: String,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            video: default_video_caps(),
            audio: default_audio_caps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

fn default_port() -> u16 {
    blinder_types::DEFAULT_PORT
}

fn default_volume() -> f64 {
    1.0
}

fn default_video_caps() -> String {
    DEFAULT_VIDEO_CAPS.to_string()
}

fn default_audio_caps() -> String {
    DEFAULT_AUDIO_CAPS.to_string()
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Filler source names, in pad order
    pub sources: Vec<String>,
    /// Default gain of the filler audio
    pub volume: f64,
    /// Whether the secondary video bus exists
    pub slides: bool,
    pub video_caps: String,
    pub audio_caps: String,
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    pub log_file: Option<PathBuf>,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with full priority chain: CLI args > env vars > config files > defaults.
    ///
    /// Config files are searched in this order:
    /// 1. `.blinder.toml` in current directory
    /// 2. `config.toml` in user config directory (~/.config/blinder/ on Linux)
    pub fn from_figment(
        port: Option<u16>,
        sources: Option<Vec<String>>,
        slides: Option<bool>,
        log_level: Option<String>,
    ) -> anyhow::Result<Self> {
        let local_config = std::env::current_dir()
            .ok()
            .map(|d| d.join(".blinder.toml"));
        let user_config = directories::ProjectDirs::from("", "", "blinder")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        // Priority: defaults < user config < local config < env vars < CLI args
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        if let Some(ref path) = user_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(ref path) = local_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // BLINDER_SECTION__KEY, e.g. BLINDER_LOGGING__LOG_LEVEL
        figment = figment.merge(Env::prefixed("BLINDER_").split("__"));

        if let Some(p) = port {
            figment = figment.merge(Serialized::default("server.port", p));
        }
        if let Some(ref s) = sources {
            figment = figment.merge(Serialized::default("blinder.sources", s));
        }
        if let Some(s) = slides {
            figment = figment.merge(Serialized::default("mix.slides", s));
        }
        if let Some(ref level) = log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        let config_file: ConfigFile = figment.extract()?;

        if !(0.0..=1.0).contains(&config_file.blinder.volume) {
            anyhow::bail!(
                "blinder.volume must be between 0.0 and 1.0, got {}",
                config_file.blinder.volume
            );
        }

        Ok(Self {
            port: config_file.server.port,
            sources: config_file.blinder.sources,
            volume: config_file.blinder.volume,
            slides: config_file.mix.slides,
            video_caps: config_file.caps.video,
            audio_caps: config_file.caps.audio,
            log_file: config_file.logging.log_file,
            log_level: config_file.logging.log_level,
        })
    }

    /// Settings handed to the topology builder.
    pub fn settings(&self) -> BlinderSettings {
        BlinderSettings {
            sources: self.sources.clone(),
            secondary: self.slides,
            video_caps: self.video_caps.clone(),
            audio_caps: self.audio_caps.clone(),
            volume: self.volume,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let settings = BlinderSettings::default();
        Self {
            port: blinder_types::DEFAULT_PORT,
            sources: settings.sources,
            volume: settings.volume,
            slides: settings.secondary,
            video_caps: settings.video_caps,
            audio_caps: settings.audio_caps,
            log_file: None,
            log_level: None,
        }
    }
}
