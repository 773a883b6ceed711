//! Agent configuration
//!
//! Every tunable is a named number with a documented default. Configs are
//! plain serde structs so they can live in JSON files next to other assets;
//! missing fields fall back to their defaults.

use crate::animation::AnimationSetConfig;
use crate::error::{ConfigError, Result};
use crate::states::wander_path::{WanderDirection, WanderStep};
use horde_physics::layers::{CollisionLayer, SightMasks};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How long a better near target must stay the best candidate before a
/// switch is recommended (seconds)
pub const TARGET_SWITCH_TIME_THRESHOLD: f32 = 2.0;

/// How often a bound target that is currently visible is re-raycast (seconds)
pub const TARGET_RAYCAST_INTERVAL: f32 = 2.0;

fn clamp_logged(name: &str, value: f32, min: f32, max: f32) -> f32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{} = {} out of range [{}, {}], using {}", name, value, min, max, clamped);
    }
    clamped
}

fn require_positive(name: &'static str, value: f32) -> std::result::Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Vision tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Range inside which a sighting triggers an immediate chase
    pub near_range: f32,
    /// Maximum sight range
    pub far_range: f32,
    /// Horizontal cone used at near range (degrees, full width)
    pub near_cone_angle: f32,
    /// Horizontal cone used beyond near range (degrees, full width)
    pub far_cone_angle: f32,
    /// Vertical cone (degrees, full width)
    pub vertical_cone_angle: f32,
    /// Seconds of far visibility before investigating
    pub detection_time_threshold: f32,
    /// Further seconds of far visibility before chasing
    pub chase_time_threshold: f32,
    /// Seconds a bound target may stay hidden before it counts as lost
    pub target_lost_time: f32,
    /// Seconds between evaluation passes
    pub update_interval: f32,
    /// Evaluate on every frame instead of on the interval
    pub use_frame_updates: bool,
    /// Layers that block sight
    pub blocking_layers: Vec<CollisionLayer>,
    /// Layers that can be sensed
    pub target_layers: Vec<CollisionLayer>,
    /// Category of this observer, matched against combination detector masks
    pub observer_layer: CollisionLayer,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            near_range: 15.0,
            far_range: 30.0,
            near_cone_angle: 90.0,
            far_cone_angle: 45.0,
            vertical_cone_angle: 60.0,
            detection_time_threshold: 5.0,
            chase_time_threshold: 3.0,
            target_lost_time: 11.0,
            update_interval: 0.2,
            use_frame_updates: false,
            blocking_layers: vec![
                CollisionLayer::BUILDINGS,
                CollisionLayer::OBSTACLES,
                CollisionLayer::VEHICLES,
            ],
            target_layers: vec![
                CollisionLayer::PLAYERS,
                CollisionLayer::NPCS,
                CollisionLayer::HUMAN_ENEMIES,
            ],
            observer_layer: CollisionLayer::ZOMBIES,
        }
    }
}

impl VisionConfig {
    /// Check for contradictions
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("near_range", self.near_range)?;
        require_positive("far_range", self.far_range)?;
        require_positive("detection_time_threshold", self.detection_time_threshold)?;
        require_positive("chase_time_threshold", self.chase_time_threshold)?;
        require_positive("target_lost_time", self.target_lost_time)?;

        if self.near_range > self.far_range {
            return Err(ConfigError::RangeOrder {
                near: self.near_range,
                far: self.far_range,
            });
        }
        Ok(())
    }

    /// Clamp tunables into their supported ranges
    pub fn sanitized(mut self) -> Self {
        self.near_cone_angle = clamp_logged("near_cone_angle", self.near_cone_angle, 0.0, 360.0);
        self.far_cone_angle = clamp_logged("far_cone_angle", self.far_cone_angle, 0.0, 360.0);
        self.vertical_cone_angle =
            clamp_logged("vertical_cone_angle", self.vertical_cone_angle, 0.0, 90.0);
        self.update_interval = clamp_logged("update_interval", self.update_interval, 0.1, 1.0);
        self
    }

    /// Blocking and target masks
    pub fn sight_masks(&self) -> SightMasks {
        SightMasks::new(&self.blocking_layers, &self.target_layers)
    }
}

/// Investigation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectingConfig {
    /// Seconds before the whole detecting state gives up
    pub detection_timeout: f32,
    /// Seconds spent looking around at the investigated point
    pub investigation_time: f32,
    /// Movement speed while investigating
    pub investigation_speed: f32,
    /// Distance at which the investigated point counts as reached
    pub investigation_distance: f32,
    /// Seconds spent facing the point before walking to it
    pub face_delay: f32,
}

impl Default for DetectingConfig {
    fn default() -> Self {
        Self {
            detection_timeout: 5.0,
            investigation_time: 3.0,
            investigation_speed: 1.0,
            investigation_distance: 1.0,
            face_delay: 0.5,
        }
    }
}

impl DetectingConfig {
    /// Check for contradictions
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("detection_timeout", self.detection_timeout)?;
        require_positive("investigation_distance", self.investigation_distance)?;
        Ok(())
    }
}

/// Chase tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChasingConfig {
    /// Seconds a chase continues after the target is lost
    pub chase_persistence_time: f32,
    /// Chase is abandoned beyond this distance
    pub max_chase_distance: f32,
    /// Seconds between chase point refreshes
    pub target_update_interval: f32,
    /// Chase at walking pace instead of running
    pub use_walk_for_chasing: bool,
}

impl Default for ChasingConfig {
    fn default() -> Self {
        Self {
            chase_persistence_time: 20.0,
            max_chase_distance: 50.0,
            target_update_interval: 0.2,
            use_walk_for_chasing: false,
        }
    }
}

impl ChasingConfig {
    /// Check for contradictions
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("chase_persistence_time", self.chase_persistence_time)?;
        require_positive("max_chase_distance", self.max_chase_distance)?;
        require_positive("target_update_interval", self.target_update_interval)?;
        Ok(())
    }
}

/// Wander path tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    /// Relative steps of the path
    pub steps: Vec<WanderStep>,
    /// Idle seconds between steps
    pub step_delay: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                WanderStep::new(WanderDirection::Forward, 5.0),
                WanderStep::new(WanderDirection::Right, 3.0),
                WanderStep::new(WanderDirection::Forward, 3.0),
            ],
            step_delay: 1.0,
        }
    }
}

impl WanderConfig {
    /// Check for contradictions
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyWanderPath);
        }
        Ok(())
    }

    /// Clamp step angles into their supported range
    pub fn sanitized(mut self) -> Self {
        for step in &mut self.steps {
            step.angle = clamp_logged("wander step angle", step.angle, -89.0, 89.0);
        }
        self.step_delay = self.step_delay.max(0.0);
        self
    }
}

/// State an agent starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialState {
    /// Stand still until something is sensed
    #[default]
    Idle,
    /// Walk the wander path
    Wandering,
}

/// Complete configuration of one agent kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Vision tunables
    pub vision: VisionConfig,
    /// Investigation tunables
    pub detecting: DetectingConfig,
    /// Chase tunables
    pub chasing: ChasingConfig,
    /// Wander path
    pub wander: WanderConfig,
    /// Animation states
    pub animations: AnimationSetConfig,
    /// Starting behaviour
    pub initial_state: InitialState,
}

impl AgentConfig {
    /// Parse from JSON; out-of-range tunables are clamped
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded agent config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp every tunable into its supported range
    pub fn sanitized(mut self) -> Self {
        self.vision = self.vision.sanitized();
        self.wander = self.wander.sanitized();
        self
    }

    /// Check every section for contradictions
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.vision.validate()?;
        self.detecting.validate()?;
        self.chasing.validate()?;
        self.wander.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.vision.near_range, 15.0);
        assert_eq!(config.vision.far_range, 30.0);
        assert_eq!(config.vision.target_lost_time, 11.0);
        assert_eq!(config.detecting.detection_timeout, 5.0);
        assert_eq!(config.chasing.chase_persistence_time, 20.0);
        assert_eq!(config.wander.steps.len(), 3);
        assert_eq!(config.initial_state, InitialState::Idle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AgentConfig::from_json_str(
            r#"{ "vision": { "near_range": 8.0 }, "initial_state": "Wandering" }"#,
        )
        .unwrap();

        assert_eq!(config.vision.near_range, 8.0);
        assert_eq!(config.vision.far_range, 30.0);
        assert_eq!(config.initial_state, InitialState::Wandering);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = AgentConfig::from_json_str(
            r#"{ "vision": { "vertical_cone_angle": 170.0, "update_interval": 0.01 } }"#,
        )
        .unwrap();

        assert_eq!(config.vision.vertical_cone_angle, 90.0);
        assert_eq!(config.vision.update_interval, 0.1);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AgentConfig::default();
        config.vision.near_range = 40.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::RangeOrder {
                near: 40.0,
                far: 30.0
            })
        );

        let mut config = AgentConfig::default();
        config.chasing.max_chase_distance = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "max_chase_distance", .. })
        ));

        let mut config = AgentConfig::default();
        config.wander.steps.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyWanderPath));
    }

    #[test]
    fn test_json_round_trip_keeps_layers() {
        let config = AgentConfig::default();
        let json = config.to_json_string().unwrap();
        let parsed = AgentConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.vision.sight_masks(), config.vision.sight_masks());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(AgentConfig::load("/definitely/not/here.json").is_err());
    }
}
