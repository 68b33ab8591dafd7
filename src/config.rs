// src/config.rs

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine_lib::visibility::VisibilityConfig;
use crate::rendering_lib::renderer::{RenderMode, DEFAULT_CIRCLE_SEGMENTS};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSection {
    pub mode: RenderMode,
    pub circle_segments: u32,
    /// RGB, alpha is always 1.
    pub clear_color: [f32; 3],
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            mode: RenderMode::Default,
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
            clear_color: [0.05, 0.05, 0.1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSection {
    pub unit_width: f32,
    pub unit_height: f32,
    /// Size in tiles of the generated demo map.
    pub width: i32,
    pub height: i32,
    pub density: f32,
    pub seed: Option<u64>,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            unit_width: 32.0,
            unit_height: 32.0,
            width: 40,
            height: 30,
            density: 0.12,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `env_logger` filter string, e.g. "lumen2d=debug,wgpu=warn".
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub renderer: RendererSection,
    pub visibility: VisibilityConfig,
    pub map: MapSection,
    pub logging: LoggingSection,
}

impl EngineConfig {
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = self.renderer.clear_color;
        wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.renderer.circle_segments, 32);
        assert_relative_eq!(config.visibility.max_range, 1000.0);
        assert_relative_eq!(config.map.unit_width, 32.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [renderer]
            mode = "shadow"

            [visibility]
            boundary_rays = 16

            [logging]
            filter = "lumen2d=trace"
            "#,
        )
        .unwrap();
        assert_eq!(config.renderer.mode, RenderMode::Shadow);
        assert_eq!(config.renderer.circle_segments, 32);
        assert_eq!(config.visibility.boundary_rays, 16);
        assert_relative_eq!(config.visibility.angle_epsilon, 1e-4);
        assert_eq!(config.logging.filter.as_deref(), Some("lumen2d=trace"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let err = EngineConfig::from_toml_str("[renderer]\nmode = \"sideways\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = EngineConfig::load_or_default("definitely/not/here/lumen2d.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn non_toml_path_is_rejected() {
        let err = EngineConfig::load_from_file("Cargo.lock").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn saved_config_reloads() {
        let path = std::env::temp_dir().join(format!("lumen2d-config-{}.toml", std::process::id()));
        let mut config = EngineConfig::default();
        config.renderer.mode = RenderMode::Shadow;
        config.map.seed = Some(7);
        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
