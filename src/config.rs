use crate::rules::thresholds::RuleThresholds;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FormcoachConfig {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Per-exercise rule thresholds, all individually overridable
    #[serde(default)]
    pub rules: RuleThresholds,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Ideal camera resolution (width, height); the device may grant less
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Camera facing ("user" for front-facing, "environment" for rear)
    #[serde(default = "default_camera_facing")]
    pub facing: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    /// Analysis tick cadence in cycles per second
    #[serde(default = "default_analysis_fps")]
    pub fps: u32,

    /// Whole-pose confidence below which a detection is treated as no pose
    #[serde(default = "default_min_pose_score")]
    pub min_pose_score: f32,
}

impl FormcoachConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("formcoach.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default(
                "camera.resolution",
                vec![
                    default_camera_resolution().0,
                    default_camera_resolution().1,
                ],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.facing", default_camera_facing())?
            .set_default("analysis.fps", default_analysis_fps())?
            .set_default("analysis.min_pose_score", default_min_pose_score() as f64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with FORMCOACH_ prefix
            .add_source(Environment::with_prefix("FORMCOACH").separator("_"))
            .build()?;

        let config: FormcoachConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.facing != "user" && self.camera.facing != "environment" {
            return Err(ConfigError::Message(
                "Camera facing must be \"user\" or \"environment\"".to_string(),
            ));
        }

        if self.analysis.fps == 0 {
            return Err(ConfigError::Message(
                "Analysis fps must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.analysis.min_pose_score) {
            return Err(ConfigError::Message(
                "Minimum pose score must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FormcoachConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            analysis: AnalysisConfig::default(),
            rules: RuleThresholds::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: default_camera_resolution(),
            fps: default_camera_fps(),
            facing: default_camera_facing(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fps: default_analysis_fps(),
            min_pose_score: default_min_pose_score(),
        }
    }
}

// Default value functions
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_facing() -> String {
    "user".to_string()
}

fn default_analysis_fps() -> u32 {
    60
}
fn default_min_pose_score() -> f32 {
    0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FormcoachConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.camera.facing, "user");
        assert_eq!(config.analysis.fps, 60);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FormcoachConfig::default();

        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());
        config.camera.resolution = (1280, 720);
        assert!(config.validate().is_ok());

        config.analysis.min_pose_score = 1.5;
        assert!(config.validate().is_err());
        config.analysis.min_pose_score = 0.3;

        config.camera.facing = "sideways".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_override_keeps_defaults() {
        let toml = r#"
            [analysis]
            min_pose_score = 0.5

            [rules.squat]
            knee_valgus_ratio = 0.2
        "#;
        let config: FormcoachConfig = toml::from_str(toml).unwrap();

        assert!((config.analysis.min_pose_score - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.analysis.fps, default_analysis_fps());
        assert!((config.rules.squat.knee_valgus_ratio - 0.2).abs() < f32::EPSILON);
        // Untouched sections fall back wholesale
        assert_eq!(config.camera.resolution, (1280, 720));
    }
}
