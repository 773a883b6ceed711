//! Animation state descriptors and per-agent clip selection
//!
//! [`AnimationStateConfig`] is immutable configuration shared by every agent
//! of a kind. [`ResolvedAnimation`] is computed once per agent at spawn (so
//! a randomized state picks one clip and keeps it) and is what behaviour
//! states actually read.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Playback surface the behaviour states drive
pub trait Animator {
    /// Switch to an animation state by name
    fn play_state(&mut self, name: &str);
    /// Set the playback speed multiplier
    fn set_playback_speed(&mut self, speed: f32);
}

/// Animator that ignores every call
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn play_state(&mut self, _name: &str) {}
    fn set_playback_speed(&mut self, _speed: f32) {}
}

/// One clip option of an animation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipEntry {
    /// Clip name; entries without a clip are skipped during selection
    pub clip: Option<String>,
    /// Playback speed multiplier
    pub animation_speed: f32,
    /// Ground speed that matches the clip
    pub movement_speed: f32,
}

impl Default for ClipEntry {
    fn default() -> Self {
        Self {
            clip: None,
            animation_speed: 1.0,
            movement_speed: 1.0,
        }
    }
}

impl ClipEntry {
    /// Create an entry for a named clip
    pub fn new(clip: &str, animation_speed: f32, movement_speed: f32) -> Self {
        Self {
            clip: Some(clip.to_string()),
            animation_speed,
            movement_speed,
        }
    }
}

/// Static description of an animation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationStateConfig {
    /// Animator state to play
    pub state_name: String,
    /// Clip options
    pub clips: Vec<ClipEntry>,
    /// Pick a random valid clip per agent instead of `selected_clip`
    pub randomized: bool,
    /// Preferred clip, counted among valid clips only
    pub selected_clip: usize,
}

impl Default for AnimationStateConfig {
    fn default() -> Self {
        Self {
            state_name: String::new(),
            clips: Vec::new(),
            randomized: false,
            selected_clip: 0,
        }
    }
}

impl AnimationStateConfig {
    /// A state with a single clip
    pub fn single(state_name: &str, clip: ClipEntry) -> Self {
        Self {
            state_name: state_name.to_string(),
            clips: vec![clip],
            ..Default::default()
        }
    }

    /// Make selection random per agent
    pub fn randomized(mut self) -> Self {
        self.randomized = true;
        self
    }

    fn valid_clips(&self) -> impl Iterator<Item = &ClipEntry> {
        self.clips.iter().filter(|entry| entry.clip.is_some())
    }

    /// Pick this agent's clip
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> ResolvedAnimation {
        let valid: Vec<&ClipEntry> = self.valid_clips().collect();

        let chosen = if valid.is_empty() {
            None
        } else if self.randomized {
            Some(valid[rng.gen_range(0..valid.len())])
        } else {
            valid.get(self.selected_clip).or_else(|| valid.first()).copied()
        };

        match chosen {
            Some(entry) => ResolvedAnimation {
                state_name: self.state_name.clone(),
                clip: entry.clip.clone(),
                animation_speed: entry.animation_speed,
                movement_speed: entry.movement_speed,
            },
            None => ResolvedAnimation {
                state_name: self.state_name.clone(),
                clip: None,
                animation_speed: 1.0,
                movement_speed: 1.0,
            },
        }
    }
}

/// The clip an agent settled on for one animation state
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnimation {
    /// Animator state to play
    pub state_name: String,
    /// Chosen clip, if the state had any valid clip
    pub clip: Option<String>,
    /// Playback speed multiplier
    pub animation_speed: f32,
    /// Ground speed that matches the clip
    pub movement_speed: f32,
}

impl ResolvedAnimation {
    /// Play this state on an animator
    pub fn play(&self, animator: &mut dyn Animator) {
        if self.state_name.is_empty() {
            return;
        }
        animator.play_state(&self.state_name);
        animator.set_playback_speed(self.animation_speed);
    }
}

/// Animation states used by the behaviour states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSetConfig {
    /// Standing still
    pub idle: AnimationStateConfig,
    /// Wandering and investigating
    pub walk: AnimationStateConfig,
    /// Chasing at walking pace
    pub chase_walk: AnimationStateConfig,
    /// Chasing at running pace
    pub chase_run: AnimationStateConfig,
}

impl Default for AnimationSetConfig {
    fn default() -> Self {
        Self {
            idle: AnimationStateConfig::single("Idle", ClipEntry::new("zombie_idle", 1.0, 0.0)),
            walk: AnimationStateConfig::single("Walk", ClipEntry::new("zombie_walk", 1.0, 1.0)),
            chase_walk: AnimationStateConfig::single(
                "ChaseWalk",
                ClipEntry::new("zombie_chase_walk", 1.0, 1.5),
            ),
            chase_run: AnimationStateConfig::single(
                "ChaseRun",
                ClipEntry::new("zombie_run", 1.2, 4.0),
            ),
        }
    }
}

impl AnimationSetConfig {
    /// Resolve every state for one agent
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> AnimationSet {
        AnimationSet {
            idle: self.idle.resolve(rng),
            walk: self.walk.resolve(rng),
            chase_walk: self.chase_walk.resolve(rng),
            chase_run: self.chase_run.resolve(rng),
        }
    }
}

/// Per-agent resolved animation states
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSet {
    /// Standing still
    pub idle: ResolvedAnimation,
    /// Wandering and investigating
    pub walk: ResolvedAnimation,
    /// Chasing at walking pace
    pub chase_walk: ResolvedAnimation,
    /// Chasing at running pace
    pub chase_run: ResolvedAnimation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Recorder {
        states: Vec<String>,
        speed: f32,
    }

    impl Animator for Recorder {
        fn play_state(&mut self, name: &str) {
            self.states.push(name.to_string());
        }
        fn set_playback_speed(&mut self, speed: f32) {
            self.speed = speed;
        }
    }

    fn three_clips() -> AnimationStateConfig {
        AnimationStateConfig {
            state_name: "Walk".to_string(),
            clips: vec![
                ClipEntry::default(),
                ClipEntry::new("a", 1.0, 1.0),
                ClipEntry::new("b", 0.8, 2.0),
                ClipEntry::new("c", 1.1, 3.0),
            ],
            randomized: false,
            selected_clip: 1,
        }
    }

    #[test]
    fn test_selected_index_counts_valid_clips() {
        let mut rng = StdRng::seed_from_u64(1);
        let resolved = three_clips().resolve(&mut rng);
        assert_eq!(resolved.clip.as_deref(), Some("b"));
        assert_eq!(resolved.movement_speed, 2.0);
    }

    #[test]
    fn test_out_of_range_index_falls_back_to_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut config = three_clips();
        config.selected_clip = 9;
        assert_eq!(config.resolve(&mut rng).clip.as_deref(), Some("a"));
    }

    #[test]
    fn test_randomized_is_stable_per_seed() {
        let config = three_clips().randomized();
        let first = config.resolve(&mut StdRng::seed_from_u64(42));
        let second = config.resolve(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
        assert!(first.clip.is_some());
    }

    #[test]
    fn test_no_valid_clips() {
        let config = AnimationStateConfig {
            state_name: "Idle".to_string(),
            clips: vec![ClipEntry::default()],
            ..Default::default()
        };
        let resolved = config.resolve(&mut StdRng::seed_from_u64(0));
        assert_eq!(resolved.clip, None);
        assert_eq!(resolved.animation_speed, 1.0);
    }

    #[test]
    fn test_play_sets_state_and_speed() {
        let mut recorder = Recorder::default();
        let resolved = AnimationSetConfig::default()
            .resolve(&mut StdRng::seed_from_u64(0))
            .chase_run;
        resolved.play(&mut recorder);
        assert_eq!(recorder.states, vec!["ChaseRun".to_string()]);
        assert_eq!(recorder.speed, 1.2);
    }
}
