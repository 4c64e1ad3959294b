//! Sheen Configuration Management
//!
//! Handles loading configuration from ~/.sheen/config.toml, or from an
//! explicit path, and writes a commented default file on first run.

use serde::{Deserialize, Serialize};
use sheen_core::{Color, ColorMode, DepthCompare, FilterMode};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = ".sheen";
/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Which rasterizer renders a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Reference rasterizer on the CPU
    #[default]
    Cpu,
    /// wgpu pipeline, rendered offscreen and read back
    Gpu,
}

/// Color management for atlases and instance colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorModeSetting {
    #[default]
    Accurate,
    Web,
}

impl From<ColorModeSetting> for ColorMode {
    fn from(setting: ColorModeSetting) -> Self {
        match setting {
            ColorModeSetting::Accurate => ColorMode::Accurate,
            ColorModeSetting::Web => ColorMode::Web,
        }
    }
}

/// Atlas sampler filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    #[default]
    Nearest,
    Linear,
}

impl From<FilterSetting> for FilterMode {
    fn from(setting: FilterSetting) -> Self {
        match setting {
            FilterSetting::Nearest => FilterMode::Nearest,
            FilterSetting::Linear => FilterMode::Linear,
        }
    }
}

/// Depth test applied while compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DepthSetting {
    #[default]
    Always,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl From<DepthSetting> for DepthCompare {
    fn from(setting: DepthSetting) -> Self {
        match setting {
            DepthSetting::Always => DepthCompare::Always,
            DepthSetting::Less => DepthCompare::Less,
            DepthSetting::LessEqual => DepthCompare::LessEqual,
            DepthSetting::Greater => DepthCompare::Greater,
            DepthSetting::GreaterEqual => DepthCompare::GreaterEqual,
        }
    }
}

/// General configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (off, error, warn, info, debug, trace), overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Rasterizer used when the command line does not pick one
    #[serde(default)]
    pub backend: Backend,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: Backend::default(),
        }
    }
}

impl GeneralConfig {
    /// `log_level` as a level filter, `None` when it is not a level name
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.log_level.trim().parse().ok()
    }
}

/// Output image configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Width in pixels, used when the scene does not set one
    #[serde(default = "default_width")]
    pub width: u32,

    /// Height in pixels, used when the scene does not set one
    #[serde(default = "default_height")]
    pub height: u32,

    /// Background as #RRGGBB or #RRGGBBAA
    #[serde(default = "default_clear_color")]
    pub clear_color: String,

    /// PNG written when no output path is given
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_clear_color() -> String {
    "#000000ff".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("sheen.png")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            clear_color: default_clear_color(),
            path: default_output_path(),
        }
    }
}

impl OutputConfig {
    /// Parsed clear color, as stored (no sRGB decode)
    pub fn clear_color(&self) -> Result<Color, ConfigError> {
        let [r, g, b, a] = sheen_core::parse_hex_rgba(&self.clear_color)
            .ok_or_else(|| ConfigError::InvalidColor(self.clear_color.clone()))?;
        Ok(Color::from_u8(r, g, b, a))
    }
}

/// Atlas configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub color_mode: ColorModeSetting,

    #[serde(default)]
    pub filter: FilterSetting,
}

/// Rasterizer configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    #[serde(default)]
    pub depth_compare: DepthSetting,

    /// Instance buffer capacity on the GPU path
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,
}

fn default_max_instances() -> usize {
    16 * 1024
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            depth_compare: DepthSetting::default(),
            max_instances: default_max_instances(),
        }
    }
}

/// Shadow defaults for mask quads that do not set their own
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Blur radius in pixels, 0 disables
    #[serde(default)]
    pub radius: f32,

    #[serde(default)]
    pub intensity: f32,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub atlas: AtlasConfig,

    #[serde(default)]
    pub raster: RasterConfig,

    #[serde(default)]
    pub shadow: ShadowConfig,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            log::info!("Config file not found, creating default at {:?}", config_path);
            Self::create_default_config()?;
        }

        let config = Self::load_from(&config_path)?;
        log::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        config.output.clear_color()?;
        Ok(config)
    }

    /// Get the configuration directory path (~/.sheen/)
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(CONFIG_DIR_NAME))
    }

    /// Get the configuration file path (~/.sheen/config.toml)
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Create the default configuration file and directory
    pub fn create_default_config() -> Result<(), ConfigError> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).map_err(|e| ConfigError::CreateDir(config_dir.clone(), e))?;
        Self::write_default(&Self::config_file_path()?)
    }

    /// Write the commented default configuration to `path`
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(&Config::default()).map_err(ConfigError::Serialize)?;

        let content = format!(
            "# Sheen Configuration\n\
             #\n\
             # backend: cpu | gpu\n\
             # color_mode: accurate (sRGB atlas, linear blending) | web (blend sRGB values directly)\n\
             # depth_compare: always | less | less-equal | greater | greater-equal\n\
             \n\
             {toml_content}"
        );

        fs::write(path, content).map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;

        log::info!("Created default configuration at {:?}", path);
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("Failed to read {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse {0:?}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write {0:?}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to create {0:?}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Invalid color {0:?}, expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),
}
