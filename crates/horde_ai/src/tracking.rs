//! Who is chasing whom
//!
//! Other systems (music intensity, HUD warnings) only need to know whether a
//! target is being chased; the chasing state keeps this up to date through
//! [`ChaseTracker`].

use crate::registry::TargetId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Identifier of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Receiver of chase relationship changes
pub trait ChaseTracker: Send + Sync {
    /// `chaser` started chasing `target`
    fn register(&self, chaser: AgentId, target: TargetId);
    /// `chaser` stopped chasing `target`
    fn unregister(&self, chaser: AgentId, target: TargetId);
}

/// Tracker that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChaseTracker;

impl ChaseTracker for NullChaseTracker {
    fn register(&self, _chaser: AgentId, _target: TargetId) {}
    fn unregister(&self, _chaser: AgentId, _target: TargetId) {}
}

/// Shared chase bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ChaseRegistry {
    chasers: Arc<Mutex<HashMap<TargetId, HashSet<AgentId>>>>,
}

impl ChaseRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one agent chases `target`
    pub fn is_chased(&self, target: TargetId) -> bool {
        self.chaser_count(target) > 0
    }

    /// Number of agents chasing `target`
    pub fn chaser_count(&self, target: TargetId) -> usize {
        self.chasers.lock().get(&target).map_or(0, HashSet::len)
    }

    /// Agents chasing `target`
    pub fn chasers_of(&self, target: TargetId) -> Vec<AgentId> {
        let mut chasers: Vec<AgentId> = self
            .chasers
            .lock()
            .get(&target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        chasers.sort();
        chasers
    }
}

impl ChaseTracker for ChaseRegistry {
    fn register(&self, chaser: AgentId, target: TargetId) {
        let added = self.chasers.lock().entry(target).or_default().insert(chaser);
        if added {
            log::debug!("{} now chasing {}", chaser, target);
        }
    }

    fn unregister(&self, chaser: AgentId, target: TargetId) {
        let mut chasers = self.chasers.lock();
        if let Some(set) = chasers.get_mut(&target) {
            set.remove(&chaser);
            if set.is_empty() {
                chasers.remove(&target);
            }
        }
    }
}
