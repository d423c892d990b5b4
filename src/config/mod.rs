//! Configuration hierarchy: CLI > environment > TOML file > defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::EncodingConfig;
use crate::error::{CutXError, CutXResult};

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "cutx.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "CUTX_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cut: CutConfig,
    pub encoding: EncodingConfig,
    pub tools: ToolsConfig,
    pub hub: HubConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 8899,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Padding added on both sides of every delete range
    pub buffer_ms: i64,
    /// Audio crossfade at each single-pass join
    pub crossfade_ms: i64,
    /// Keep-range count above which the fallback strategy is used
    pub max_segments: usize,
    /// Where each accepted delete list is recorded
    pub audit_file: PathBuf,
    /// Parent of fallback scratch directories; system temp dir when unset
    pub work_dir: Option<PathBuf>,
    /// Output directory; next to the source when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            buffer_ms: 50,
            crossfade_ms: 30,
            max_segments: 100,
            audit_file: PathBuf::from("delete_segments.json"),
            work_dir: None,
            output_dir: None,
        }
    }
}

impl CutConfig {
    pub fn buffer_secs(&self) -> f64 {
        self.buffer_ms as f64 / 1000.0
    }

    pub fn crossfade_secs(&self) -> f64 {
        self.crossfade_ms as f64 / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Queued events per subscriber before it is dropped
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: crate::events::hub::DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> CutXResult<T> {
    value.trim().parse().map_err(|_| CutXError::Config {
        message: format!("{} has an invalid value '{}'", key, value),
    })
}

fn parse_bool(key: &str, value: &str) -> CutXResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CutXError::Config {
            message: format!("{} has an invalid value '{}'", key, value),
        }),
    }
}

impl AppConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> CutXResult<Self> {
        toml::from_str(text).map_err(|e| CutXError::Config {
            message: format!("invalid config: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> CutXResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CutXError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Load the file layer. An explicitly named file must exist; the
    /// default file is optional.
    pub fn discover(explicit: Option<&Path>) -> CutXResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.exists() {
            return Self::from_file(default);
        }
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `CUTX_*` overrides from the process environment
    pub fn apply_env(&mut self) -> CutXResult<usize> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `CUTX_*` overrides using `lookup` as the environment
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CutXResult<usize> {
        let mut applied = 0;
        let mut take = |key: &str| {
            let value = lookup(key);
            if value.is_some() {
                info!("Found environment override: {}", key);
                applied += 1;
            }
            value
        };

        if let Some(v) = take("CUTX_ADDR") {
            self.server.addr = v;
        }
        if let Some(v) = take("CUTX_PORT") {
            self.server.port = parse_env("CUTX_PORT", &v)?;
        }
        if let Some(v) = take("CUTX_BUFFER_MS") {
            self.cut.buffer_ms = parse_env("CUTX_BUFFER_MS", &v)?;
        }
        if let Some(v) = take("CUTX_CROSSFADE_MS") {
            self.cut.crossfade_ms = parse_env("CUTX_CROSSFADE_MS", &v)?;
        }
        if let Some(v) = take("CUTX_MAX_SEGMENTS") {
            self.cut.max_segments = parse_env("CUTX_MAX_SEGMENTS", &v)?;
        }
        if let Some(v) = take("CUTX_AUDIT_FILE") {
            self.cut.audit_file = PathBuf::from(v);
        }
        if let Some(v) = take("CUTX_WORK_DIR") {
            self.cut.work_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = take("CUTX_OUTPUT_DIR") {
            self.cut.output_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = take("CUTX_CRF") {
            self.encoding.crf = parse_env("CUTX_CRF", &v)?;
        }
        if let Some(v) = take("CUTX_PRESET") {
            self.encoding.preset = v;
        }
        if let Some(v) = take("CUTX_FFMPEG") {
            self.tools.ffmpeg = PathBuf::from(v);
        }
        if let Some(v) = take("CUTX_FFPROBE") {
            self.tools.ffprobe = PathBuf::from(v);
        }
        if let Some(v) = take("CUTX_SUBSCRIBER_BUFFER") {
            self.hub.subscriber_buffer = parse_env("CUTX_SUBSCRIBER_BUFFER", &v)?;
        }
        if let Some(v) = take("CUTX_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = take("CUTX_LOG_JSON") {
            self.logging.json = parse_bool("CUTX_LOG_JSON", &v)?;
        }

        if applied > 0 {
            info!("Applied {} environment variable overrides", applied);
        }
        Ok(applied)
    }

    pub fn validate(&self) -> CutXResult<()> {
        let invalid = |message: String| Err(CutXError::Config { message });
        if self.cut.max_segments == 0 {
            return invalid("cut.max_segments must be at least 1".to_string());
        }
        if self.cut.buffer_ms < 0 {
            return invalid(format!("cut.buffer_ms must not be negative (got {})", self.cut.buffer_ms));
        }
        if self.cut.crossfade_ms < 0 {
            return invalid(format!(
                "cut.crossfade_ms must not be negative (got {})",
                self.cut.crossfade_ms
            ));
        }
        if self.encoding.crf > 51 {
            return invalid(format!("encoding.crf must be 0-51 (got {})", self.encoding.crf));
        }
        if self.hub.subscriber_buffer == 0 {
            return invalid("hub.subscriber_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}
