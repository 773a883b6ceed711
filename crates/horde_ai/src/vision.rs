//! Vision detector
//!
//! Turns an observer pose and the target registry into detection events.
//! Each evaluation pass runs three phases over the registered targets:
//!
//! 1. **Range**: squared distance from the eye to each target root.
//! 2. **Cone**: every anchor of a hit combination must sit inside the
//!    horizontal and vertical cones. The combinations that pass are kept
//!    per candidate.
//! 3. **Line of sight**: a ray from the eye to each anchor must hit the
//!    candidate's own collider first. A combination needs all of its
//!    anchors, and a candidate needs one combination.
//!
//! Evaluation passes are expensive and run on an interval. The timers that
//! debounce their results advance every frame in [`VisionDetector::update`].

use crate::body::EyePose;
use crate::config::{VisionConfig, TARGET_RAYCAST_INTERVAL, TARGET_SWITCH_TIME_THRESHOLD};
use crate::events::{DetectionEvent, DetectionLevel};
use crate::geometry::{sqr_distance, ConeAngles};
use crate::registry::{HitCombination, SharedTarget, Target, TargetHandle, TargetId, TargetRegistry};
use crate::timer::{Accumulator, HysteresisTimer, Interval, Stopwatch, TimerEvent};
use glam::Vec3;
use horde_physics::layers::SightMasks;
use horde_physics::query::LineOfSight;

/// Consecutive evaluation passes without an eye pose before perception halts
pub const MAX_POSE_FAILURES: u32 = 30;

/// Operating status of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStatus {
    /// Sensing normally
    Active,
    /// Configuration fault; never senses anything
    Disabled,
    /// The eye pose could not be resolved for too long
    Halted,
}

/// Which horizontal cone applies to an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConeRule {
    /// Near cone inside near range, far cone beyond it
    NearOrFar,
    /// Near cone regardless of distance
    NearOnly,
}

/// A confirmed sighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    /// Who was seen
    pub target: TargetId,
    /// Target root position at the time
    pub position: Vec3,
    /// Distance from the eye to the target root
    pub distance: f32,
}

/// A target that survived the cone phase
struct ConeCandidate {
    id: TargetId,
    target: SharedTarget,
    distance: f32,
    /// Indices of combinations whose anchors are all inside the cone
    combinations: Vec<usize>,
}

#[derive(Debug, Clone)]
struct BoundTarget {
    handle: TargetHandle,
    visible: bool,
    last_raycast: Option<f32>,
}

/// Range, cone and line-of-sight detection with debounced events
pub struct VisionDetector {
    config: VisionConfig,
    sqr_near_range: f32,
    sqr_far_range: f32,
    masks: SightMasks,
    observer_mask: u32,

    registry: TargetRegistry,
    candidates: Vec<TargetHandle>,
    seen_revision: Option<u64>,

    status: DetectorStatus,
    pose_failures: u32,
    clock: f32,
    evaluation: Interval,

    bound: Option<BoundTarget>,
    last_seen_position: Vec3,

    far_target: Option<TargetId>,
    target_visible: bool,
    far_timer: HysteresisTimer,
    chase_timer: HysteresisTimer,
    lost_watch: Stopwatch,
    switch_timer: Accumulator,
    switch_candidate: Option<TargetId>,
}

impl VisionDetector {
    /// Create a detector reading from `registry`.
    ///
    /// An invalid config is logged and yields a disabled detector.
    pub fn new(config: VisionConfig, registry: TargetRegistry) -> Self {
        let config = config.sanitized();
        let fault = config.validate().err();

        let mut detector = Self {
            sqr_near_range: config.near_range * config.near_range,
            sqr_far_range: config.far_range * config.far_range,
            masks: config.sight_masks(),
            observer_mask: config.observer_layer.as_mask(),
            registry,
            candidates: Vec::new(),
            seen_revision: None,
            status: DetectorStatus::Active,
            pose_failures: 0,
            clock: 0.0,
            evaluation: Interval::due_now(config.update_interval),
            bound: None,
            last_seen_position: Vec3::ZERO,
            far_target: None,
            target_visible: false,
            far_timer: HysteresisTimer::new("far-detection", config.detection_time_threshold),
            chase_timer: HysteresisTimer::new("chase-buildup", config.chase_time_threshold),
            lost_watch: Stopwatch::new("target-lost", config.target_lost_time),
            switch_timer: Accumulator::new("target-switch", TARGET_SWITCH_TIME_THRESHOLD),
            switch_candidate: None,
            config,
        };

        if let Some(err) = fault {
            log::error!("Vision config rejected ({}), detection disabled", err);
            detector.status = DetectorStatus::Disabled;
        }

        detector
    }

    /// Permanently stop sensing
    pub fn disable(&mut self, reason: &str) {
        log::error!("Vision detection disabled: {}", reason);
        self.status = DetectorStatus::Disabled;
        self.clear_target();
        self.reset_far_detection();
    }

    /// Current status
    pub fn status(&self) -> DetectorStatus {
        self.status
    }

    /// Whether the detector is sensing
    pub fn is_active(&self) -> bool {
        self.status == DetectorStatus::Active
    }

    /// Vision tunables in use
    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Switch between per-frame and interval evaluation
    pub fn set_use_frame_updates(&mut self, enabled: bool) {
        self.config.use_frame_updates = enabled;
        self.evaluation.reset();
        log::debug!(
            "Vision evaluation mode: {}",
            if enabled { "every frame" } else { "interval" }
        );
    }

    // ==================== Target binding ====================

    /// Track a specific target (done when a chase starts)
    pub fn bind_target(&mut self, handle: TargetHandle) {
        log::info!("Vision bound to {}", handle.id());
        self.reset_far_detection();
        self.reset_switch();
        self.lost_watch.disarm();
        self.bound = Some(BoundTarget {
            handle,
            visible: true,
            last_raycast: None,
        });
    }

    /// Stop tracking and go back to searching
    pub fn clear_target(&mut self) {
        if let Some(bound) = self.bound.take() {
            log::info!("Vision released {}", bound.handle.id());
        }
        self.lost_watch.disarm();
        self.reset_switch();
        self.target_visible = false;
    }

    /// Currently bound target
    pub fn bound_target(&self) -> Option<TargetId> {
        self.bound.as_ref().map(|b| b.handle.id())
    }

    /// Whether the bound target was visible at the last check
    pub fn is_target_visible(&self) -> bool {
        self.bound.as_ref().map_or(self.target_visible, |b| b.visible)
    }

    /// Where the last confirmed sighting happened
    pub fn last_seen_position(&self) -> Vec3 {
        self.last_seen_position
    }

    /// Far target being debounced
    pub fn far_target(&self) -> Option<TargetId> {
        self.far_target
    }

    /// Far-detection timer progress (seconds)
    pub fn far_detection_time(&self) -> f32 {
        self.far_timer.value()
    }

    /// Chase-buildup timer progress (seconds)
    pub fn chase_buildup_time(&self) -> f32 {
        self.chase_timer.value()
    }

    /// Whether the target-lost stopwatch is running
    pub fn is_lost_timer_armed(&self) -> bool {
        self.lost_watch.is_armed()
    }

    /// Time spent preferring another near target, if one is pending
    pub fn switch_time(&self) -> Option<f32> {
        self.switch_timer
            .is_running()
            .then(|| self.switch_timer.value())
    }

    // ==================== Ticking ====================

    /// Advance timers and run an evaluation pass when one is due
    pub fn tick(
        &mut self,
        dt: f32,
        eye: Option<EyePose>,
        sight: &dyn LineOfSight,
    ) -> Vec<DetectionEvent> {
        let mut events = self.update(dt);

        let due = self.config.use_frame_updates || self.evaluation.tick(dt);
        if due {
            events.extend(self.evaluate(eye, sight));
        }

        events
    }

    /// Per-frame timer update
    pub fn update(&mut self, dt: f32) -> Vec<DetectionEvent> {
        let mut events = Vec::new();
        if !self.is_active() {
            return events;
        }

        self.clock += dt;
        self.update_far_timers(dt, &mut events);
        self.update_lost_timer(dt, &mut events);
        self.update_switch_timer(dt, &mut events);

        for event in &events {
            log::debug!("Vision event: {:?}", event);
        }
        events
    }

    /// One evaluation pass
    pub fn evaluate(&mut self, eye: Option<EyePose>, sight: &dyn LineOfSight) -> Vec<DetectionEvent> {
        let mut events = Vec::new();
        if !self.is_active() {
            return events;
        }

        let Some(eye) = eye else {
            self.record_pose_failure();
            return events;
        };
        self.pose_failures = 0;

        self.refresh_candidates();

        if self.bound.is_some() {
            self.check_bound_target(&eye, sight, &mut events);
        } else {
            self.search_for_target(&eye, sight, &mut events);
        }

        for event in &events {
            log::debug!("Vision event: {:?}", event);
        }
        events
    }

    fn record_pose_failure(&mut self) {
        self.pose_failures += 1;
        if self.pose_failures == 1 {
            log::warn!("Observer eye pose unavailable, skipping vision pass");
        }
        if self.pose_failures >= MAX_POSE_FAILURES {
            log::error!(
                "Observer eye pose unavailable for {} passes, halting perception",
                self.pose_failures
            );
            self.status = DetectorStatus::Halted;
            self.clear_target();
            self.reset_far_detection();
        }
    }

    fn refresh_candidates(&mut self) {
        let revision = self.registry.revision();
        if self.seen_revision != Some(revision) {
            self.candidates = self.registry.snapshot();
            self.seen_revision = Some(revision);
            log::debug!("Vision candidates refreshed: {}", self.candidates.len());
        }
    }

    // ==================== Frame timers ====================

    fn update_far_timers(&mut self, dt: f32, events: &mut Vec<DetectionEvent>) {
        let Some(target) = self.far_target else {
            return;
        };

        let far = self.far_timer.tick(dt, self.target_visible);
        let chase = self.chase_timer.tick(dt, self.target_visible);

        match far {
            TimerEvent::Fired => {
                events.push(DetectionEvent::FarDetected {
                    target,
                    position: self.last_seen_position,
                    level: DetectionLevel::Investigate,
                });
                self.chase_timer.arm();
            }
            TimerEvent::Drained => {
                self.reset_far_detection();
                return;
            }
            TimerEvent::None => {}
        }

        match chase {
            TimerEvent::Fired => events.push(DetectionEvent::FarDetected {
                target,
                position: self.last_seen_position,
                level: DetectionLevel::Chase,
            }),
            TimerEvent::Drained => self.reset_far_detection(),
            TimerEvent::None => {}
        }
    }

    fn update_lost_timer(&mut self, dt: f32, events: &mut Vec<DetectionEvent>) {
        if !self.lost_watch.tick(dt) {
            return;
        }

        if let Some(bound) = &self.bound {
            events.push(DetectionEvent::Lost {
                target: bound.handle.id(),
                last_known_position: self.last_seen_position,
            });
            self.reset_far_detection();
        }
    }

    fn update_switch_timer(&mut self, dt: f32, events: &mut Vec<DetectionEvent>) {
        if !self.switch_timer.tick(dt) {
            return;
        }

        if let (Some(from), Some(to)) = (self.bound_target(), self.switch_candidate.take()) {
            events.push(DetectionEvent::SwitchTarget { from, to });
        }
    }

    fn reset_far_detection(&mut self) {
        self.far_timer.reset();
        self.chase_timer.reset();
        self.far_target = None;
        self.target_visible = false;
    }

    fn reset_switch(&mut self) {
        self.switch_timer.stop();
        self.switch_candidate = None;
    }

    // ==================== Evaluation ====================

    fn search_for_target(
        &mut self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        events: &mut Vec<DetectionEvent>,
    ) {
        let Some(sighting) = self.detect(eye, sight, self.far_target) else {
            self.target_visible = false;
            return;
        };

        self.last_seen_position = sighting.position;

        if sighting.distance * sighting.distance <= self.sqr_near_range {
            self.reset_far_detection();
            events.push(DetectionEvent::NearDetected {
                target: sighting.target,
                position: sighting.position,
            });
        } else {
            self.handle_far_sighting(sighting.target);
        }
    }

    fn handle_far_sighting(&mut self, target: TargetId) {
        if self.far_target != Some(target) {
            self.reset_far_detection();
            self.far_target = Some(target);
            self.far_timer.arm();
        } else if !self.far_timer.is_active() && !self.chase_timer.is_active() {
            self.far_timer.arm();
        }
        self.target_visible = true;
    }

    fn check_bound_target(
        &mut self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        events: &mut Vec<DetectionEvent>,
    ) {
        self.check_for_switch(eye, sight);

        let Some(bound) = self.bound.as_ref() else {
            return;
        };

        let recheck_due = bound
            .last_raycast
            .map_or(true, |at| self.clock - at >= TARGET_RAYCAST_INTERVAL);
        if bound.visible && !recheck_due {
            return;
        }

        let handle = bound.handle.clone();
        let sighting = self.revalidate(eye, sight, &handle);
        let clock = self.clock;

        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        bound.last_raycast = Some(clock);

        match sighting {
            Some(sighting) => {
                self.last_seen_position = sighting.position;
                self.lost_watch.disarm();
                if !bound.visible {
                    bound.visible = true;
                    events.push(DetectionEvent::Reacquired {
                        target: sighting.target,
                        position: sighting.position,
                    });
                }
            }
            None => {
                if bound.visible {
                    bound.visible = false;
                    self.lost_watch.arm();
                    log::debug!("Bound {} went out of sight", handle.id());
                }
            }
        }
    }

    fn revalidate(
        &self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        handle: &TargetHandle,
    ) -> Option<Sighting> {
        let in_range = self.range_filter(eye.position, std::slice::from_ref(handle), self.sqr_far_range);
        let in_cone = self.cone_filter(eye, in_range, ConeRule::NearOrFar);
        self.pick_visible(eye, sight, &in_cone, Some(handle.id()))
    }

    fn check_for_switch(&mut self, eye: &EyePose, sight: &dyn LineOfSight) {
        let Some(current) = self.bound_target() else {
            return;
        };

        let in_range = self.range_filter(eye.position, &self.candidates, self.sqr_near_range);
        let in_cone = self.cone_filter(eye, in_range, ConeRule::NearOnly);
        if in_cone.len() < 2 {
            self.reset_switch();
            return;
        }

        match self.pick_visible(eye, sight, &in_cone, None) {
            Some(best) if best.target != current => {
                let same_candidate = self.switch_candidate == Some(best.target);
                if !same_candidate || !self.switch_timer.is_running() {
                    self.switch_candidate = Some(best.target);
                    self.switch_timer.start();
                }
            }
            _ => self.reset_switch(),
        }
    }

    /// Run all three phases over the registered targets.
    ///
    /// If `priority` passes line of sight it wins regardless of distance;
    /// otherwise the nearest visible candidate is returned.
    pub fn detect(
        &self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        priority: Option<TargetId>,
    ) -> Option<Sighting> {
        let in_range = self.range_filter(eye.position, &self.candidates, self.sqr_far_range);
        let in_cone = self.cone_filter(eye, in_range, ConeRule::NearOrFar);
        self.pick_visible(eye, sight, &in_cone, priority)
    }

    /// Refresh the candidate snapshot and run [`detect`](Self::detect)
    pub fn detect_now(
        &mut self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        priority: Option<TargetId>,
    ) -> Option<Sighting> {
        self.refresh_candidates();
        self.detect(eye, sight, priority)
    }

    // Phase 1
    fn range_filter(
        &self,
        eye: Vec3,
        handles: &[TargetHandle],
        sqr_range: f32,
    ) -> Vec<(TargetId, SharedTarget)> {
        handles
            .iter()
            .filter_map(|handle| {
                let target = handle.upgrade()?;
                let in_range = sqr_distance(eye, target.read().position()) <= sqr_range;
                in_range.then(|| (handle.id(), target))
            })
            .collect()
    }

    // Phase 2
    fn cone_filter(
        &self,
        eye: &EyePose,
        in_range: Vec<(TargetId, SharedTarget)>,
        rule: ConeRule,
    ) -> Vec<ConeCandidate> {
        in_range
            .into_iter()
            .filter_map(|(id, shared)| {
                let (combinations, distance) = {
                    let target = shared.read();
                    let combinations: Vec<usize> = target
                        .combinations()
                        .iter()
                        .enumerate()
                        .filter(|(_, combo)| combo.applies_to(self.observer_mask))
                        .filter(|(_, combo)| self.combination_in_cone(eye, &target, combo, rule))
                        .map(|(index, _)| index)
                        .collect();
                    (combinations, eye.position.distance(target.position()))
                };

                (!combinations.is_empty()).then(|| ConeCandidate {
                    id,
                    target: shared,
                    distance,
                    combinations,
                })
            })
            .collect()
    }

    fn combination_in_cone(
        &self,
        eye: &EyePose,
        target: &Target,
        combination: &HitCombination,
        rule: ConeRule,
    ) -> bool {
        let forward = eye.forward();
        let up = eye.up();

        combination.parts.iter().all(|&part| {
            let Some(anchor) = target.part_position(part) else {
                return false;
            };

            let direction = anchor - eye.position;
            let horizontal_cone = match rule {
                ConeRule::NearOnly => self.config.near_cone_angle,
                ConeRule::NearOrFar if direction.length_squared() <= self.sqr_near_range => {
                    self.config.near_cone_angle
                }
                ConeRule::NearOrFar => self.config.far_cone_angle,
            };

            ConeAngles::measure(forward, up, direction)
                .within(horizontal_cone, self.config.vertical_cone_angle)
        })
    }

    // Phase 3
    fn pick_visible(
        &self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        candidates: &[ConeCandidate],
        priority: Option<TargetId>,
    ) -> Option<Sighting> {
        if let Some(priority) = priority {
            if let Some(candidate) = candidates.iter().find(|c| c.id == priority) {
                if self.has_line_of_sight(eye, sight, candidate) {
                    return Some(self.sighting(candidate));
                }
            }
        }

        candidates
            .iter()
            .filter(|c| Some(c.id) != priority)
            .filter(|c| self.has_line_of_sight(eye, sight, c))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map(|c| self.sighting(c))
    }

    fn sighting(&self, candidate: &ConeCandidate) -> Sighting {
        Sighting {
            target: candidate.id,
            position: candidate.target.read().position(),
            distance: candidate.distance,
        }
    }

    fn has_line_of_sight(
        &self,
        eye: &EyePose,
        sight: &dyn LineOfSight,
        candidate: &ConeCandidate,
    ) -> bool {
        let target = candidate.target.read();
        let tag = candidate.id.collider_tag();
        let mask = self.masks.combined();
        let origin = eye.position.to_array();

        // Anchors already confirmed by an earlier combination are not recast
        let mut confirmed: Vec<usize> = Vec::new();

        candidate.combinations.iter().any(|&index| {
            let Some(combination) = target.combinations().get(index) else {
                return false;
            };

            combination.parts.iter().all(|&part| {
                if confirmed.contains(&part) {
                    return true;
                }
                let Some(anchor) = target.part_position(part) else {
                    return false;
                };

                let hit = sight
                    .first_hit(origin, anchor.to_array(), mask)
                    .map_or(false, |hit| hit.user_data == tag);
                if hit {
                    confirmed.push(part);
                }
                hit
            })
        })
    }
}
