//! Detection and behaviour events

use crate::registry::TargetId;
use crate::states::BehaviorState;
use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;

/// How strongly a far sighting should be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionLevel {
    /// Walk over and look
    Investigate,
    /// Start chasing
    Chase,
}

impl DetectionLevel {
    /// Numeric level (1 = investigate, 2 = chase)
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Investigate => 1,
            Self::Chase => 2,
        }
    }
}

/// Signals raised by the vision detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionEvent {
    /// A target was confirmed inside near range
    NearDetected {
        target: TargetId,
        position: Vec3,
    },
    /// A far target stayed visible long enough
    FarDetected {
        target: TargetId,
        position: Vec3,
        level: DetectionLevel,
    },
    /// The bound target stayed hidden too long
    Lost {
        target: TargetId,
        last_known_position: Vec3,
    },
    /// The bound target is visible again after being hidden
    Reacquired { target: TargetId, position: Vec3 },
    /// A different near target has been the better candidate for a while
    SwitchTarget { from: TargetId, to: TargetId },
}

impl DetectionEvent {
    /// Target the event is about
    pub fn target(&self) -> TargetId {
        match self {
            Self::NearDetected { target, .. }
            | Self::FarDetected { target, .. }
            | Self::Lost { target, .. }
            | Self::Reacquired { target, .. } => *target,
            Self::SwitchTarget { to, .. } => *to,
        }
    }

    /// Check if this is a near detection
    pub fn is_near(&self) -> bool {
        matches!(self, Self::NearDetected { .. })
    }

    /// Check if this is a far detection
    pub fn is_far(&self) -> bool {
        matches!(self, Self::FarDetected { .. })
    }

    /// Check if this is a lost signal
    pub fn is_lost(&self) -> bool {
        matches!(self, Self::Lost { .. })
    }
}

/// Everything an agent publishes to outside listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentEvent {
    /// A perception signal
    Detection(DetectionEvent),
    /// The coordinator moved to another state
    StateChanged {
        from: BehaviorState,
        to: BehaviorState,
    },
}

/// Fan-out of agent events to channel subscribers
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<AgentEvent>>,
}

impl EventHub {
    /// Create a hub with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all future events
    pub fn subscribe(&mut self) -> Receiver<AgentEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send an event to every live subscriber, dropping disconnected ones
    pub fn publish(&mut self, event: AgentEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_helpers() {
        let near = DetectionEvent::NearDetected {
            target: TargetId(3),
            position: Vec3::ZERO,
        };
        assert!(near.is_near());
        assert!(!near.is_lost());
        assert_eq!(near.target(), TargetId(3));

        let switch = DetectionEvent::SwitchTarget {
            from: TargetId(1),
            to: TargetId(2),
        };
        assert_eq!(switch.target(), TargetId(2));
        assert_eq!(DetectionLevel::Chase.as_u8(), 2);
    }

    #[test]
    fn test_hub_fan_out_and_disconnect() {
        let mut hub = EventHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();

        let event = AgentEvent::StateChanged {
            from: BehaviorState::Idle,
            to: BehaviorState::Wandering,
        };
        hub.publish(event);
        assert_eq!(a.try_recv().unwrap(), event);
        assert_eq!(b.try_recv().unwrap(), event);

        drop(b);
        hub.publish(event);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(a.try_recv().unwrap(), event);
    }
}
