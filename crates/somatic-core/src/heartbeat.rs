//! Heartbeat publisher.
//!
//! Periodic upkeep (stamina regeneration, staying aloft, effect expiry)
//! runs on two fixed-interval heartbeats shared by every character. A
//! character subscribes on login and is removed from every heartbeat in
//! one call on logout or death. This registry is the only global mutable
//! state the engine keeps outside the realm.

use std::collections::{BTreeMap, BTreeSet};

use somatic_types::CharacterId;
use tracing::debug;

use crate::clock::ClockError;
use crate::config::TimeConfig;

/// A periodic heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Heartbeat {
    /// Every few seconds of game time.
    Short,
    /// Every game minute or so.
    Long,
}

impl Heartbeat {
    /// Both heartbeats, in firing order.
    pub const ALL: [Self; 2] = [Self::Short, Self::Long];
}

#[derive(Debug, Clone)]
struct Schedule {
    period_ms: u64,
    next_ms: u64,
    subscribers: BTreeSet<CharacterId>,
}

impl Schedule {
    const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            next_ms: period_ms,
            subscribers: BTreeSet::new(),
        }
    }
}

/// Subscriptions to the short and long heartbeats.
#[derive(Debug, Clone)]
pub struct HeartbeatRegistry {
    schedules: BTreeMap<Heartbeat, Schedule>,
}

impl HeartbeatRegistry {
    /// Create a registry with the configured periods. The first beat of
    /// each fires one period after game time 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if either period is 0.
    pub fn new(config: &TimeConfig) -> Result<Self, ClockError> {
        if config.heartbeat_short_ms == 0 || config.heartbeat_long_ms == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "heartbeat periods must be at least 1 ms".to_owned(),
            });
        }
        let schedules = BTreeMap::from([
            (Heartbeat::Short, Schedule::new(config.heartbeat_short_ms)),
            (Heartbeat::Long, Schedule::new(config.heartbeat_long_ms)),
        ]);
        Ok(Self { schedules })
    }

    /// Subscribe a character to a heartbeat. Returns `false` if it already
    /// was.
    pub fn subscribe(&mut self, character: CharacterId, beat: Heartbeat) -> bool {
        self.schedules
            .get_mut(&beat)
            .is_some_and(|s| s.subscribers.insert(character))
    }

    /// Subscribe a character to every heartbeat.
    pub fn subscribe_all(&mut self, character: CharacterId) {
        for beat in Heartbeat::ALL {
            self.subscribe(character, beat);
        }
    }

    /// Unsubscribe a character from one heartbeat.
    pub fn unsubscribe(&mut self, character: CharacterId, beat: Heartbeat) -> bool {
        self.schedules
            .get_mut(&beat)
            .is_some_and(|s| s.subscribers.remove(&character))
    }

    /// Remove a character from every heartbeat. Returns how many
    /// subscriptions were dropped.
    pub fn unregister_all(&mut self, character: CharacterId) -> usize {
        let dropped = self
            .schedules
            .values_mut()
            .map(|s| s.subscribers.remove(&character))
            .filter(|&removed| removed)
            .count();
        debug!(character = %character, dropped, "heartbeats unregistered");
        dropped
    }

    /// Whether a character is subscribed to a heartbeat.
    pub fn is_subscribed(&self, character: CharacterId, beat: Heartbeat) -> bool {
        self.schedules
            .get(&beat)
            .is_some_and(|s| s.subscribers.contains(&character))
    }

    /// Subscribers of a heartbeat, in id order.
    pub fn subscribers(&self, beat: Heartbeat) -> Vec<CharacterId> {
        self.schedules
            .get(&beat)
            .map(|s| s.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Heartbeats due at `now_ms`, advancing each past `now_ms`.
    ///
    /// A heartbeat that fell several periods behind fires once, not once
    /// per missed period.
    pub fn due(&mut self, now_ms: u64) -> Vec<Heartbeat> {
        let mut due = Vec::new();
        for (beat, schedule) in &mut self.schedules {
            if schedule.next_ms > now_ms {
                continue;
            }
            let behind = now_ms.saturating_sub(schedule.next_ms);
            let missed = behind
                .checked_div(schedule.period_ms)
                .unwrap_or_default()
                .saturating_add(1);
            schedule.next_ms = schedule
                .next_ms
                .saturating_add(missed.saturating_mul(schedule.period_ms));
            if missed > 1 {
                debug!(?beat, missed, "heartbeat caught up");
            }
            due.push(*beat);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HeartbeatRegistry {
        HeartbeatRegistry::new(&TimeConfig {
            heartbeat_short_ms: 10,
            heartbeat_long_ms: 60,
        })
        .ok()
        .unwrap_or_else(|| HeartbeatRegistry {
            schedules: BTreeMap::new(),
        })
    }

    #[test]
    fn subscribe_and_unregister_all() {
        let mut hb = registry();
        let id = CharacterId::new();
        hb.subscribe_all(id);
        assert!(hb.is_subscribed(id, Heartbeat::Short));
        assert!(hb.is_subscribed(id, Heartbeat::Long));
        assert!(!hb.subscribe(id, Heartbeat::Short));

        assert_eq!(hb.unregister_all(id), 2);
        assert!(!hb.is_subscribed(id, Heartbeat::Short));
        assert!(hb.subscribers(Heartbeat::Long).is_empty());
        assert_eq!(hb.unregister_all(id), 0);
    }

    #[test]
    fn unsubscribe_single_beat() {
        let mut hb = registry();
        let id = CharacterId::new();
        hb.subscribe_all(id);
        assert!(hb.unsubscribe(id, Heartbeat::Long));
        assert!(hb.is_subscribed(id, Heartbeat::Short));
        assert!(!hb.is_subscribed(id, Heartbeat::Long));
    }

    #[test]
    fn beats_fire_on_period() {
        let mut hb = registry();
        assert!(hb.due(9).is_empty());
        assert_eq!(hb.due(10), vec![Heartbeat::Short]);
        assert!(hb.due(15).is_empty());
        assert_eq!(hb.due(20), vec![Heartbeat::Short]);
        assert_eq!(hb.due(60), vec![Heartbeat::Short, Heartbeat::Long]);
    }

    #[test]
    fn missed_beats_collapse() {
        let mut hb = registry();
        assert_eq!(hb.due(55), vec![Heartbeat::Short]);
        // Next short beat is at 60, not 20.
        assert_eq!(hb.due(60), vec![Heartbeat::Short, Heartbeat::Long]);
        assert!(hb.due(65).is_empty());
    }

    #[test]
    fn zero_period_is_rejected() {
        let result = HeartbeatRegistry::new(&TimeConfig {
            heartbeat_short_ms: 0,
            heartbeat_long_ms: 60,
        });
        assert!(matches!(result, Err(ClockError::InvalidConfig { .. })));
    }
}
