use serde::Serialize;

use crate::config::AlertConfig;
use crate::detect::Status;
use crate::event::Timestamp;

/// Outcome of feeding one tick's status into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub previous: Status,
    pub current: Status,
    /// Status differs from the previous tick; drives local cues.
    pub changed: bool,
    /// Entered ATTACK from a non-ATTACK status on this tick.
    pub rising_edge: bool,
    /// Send the outbound notification (rising edge and cooldown elapsed).
    pub notify: bool,
}

/// Edge detector with a single-timestamp notification cooldown.
///
/// Status itself is computed elsewhere from the score alone; this only tracks
/// the previous status and when the last notification went out.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    cooldown_seconds: f64,
    previous: Status,
    last_alert_time: Option<Timestamp>,
}

impl AlertStateMachine {
    pub fn new(cooldown_seconds: f64) -> Self {
        Self {
            cooldown_seconds,
            previous: Status::Safe,
            last_alert_time: None,
        }
    }

    pub fn from_config(cfg: &AlertConfig) -> Self {
        Self::new(cfg.alert_cooldown_seconds)
    }

    pub fn evaluate(&mut self, status: Status, now: Timestamp) -> Transition {
        let previous = self.previous;
        let rising_edge = status == Status::Attack && previous != Status::Attack;
        let cooled_down = self
            .last_alert_time
            .map_or(true, |last| now - last >= self.cooldown_seconds);
        let notify = rising_edge && cooled_down;

        if notify {
            self.last_alert_time = Some(now);
        }
        self.previous = status;

        Transition {
            previous,
            current: status,
            changed: previous != status,
            rising_edge,
            notify,
        }
    }

    pub fn status(&self) -> Status {
        self.previous
    }

    pub fn last_alert_time(&self) -> Option<Timestamp> {
        self.last_alert_time
    }
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::from_config(&AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rising_edge_notifies() {
        let mut sm = AlertStateMachine::new(120.0);
        let t = sm.evaluate(Status::Attack, 1_000.0);
        assert!(t.rising_edge);
        assert!(t.notify);
        assert!(t.changed);
        assert_eq!(t.previous, Status::Safe);
        assert_eq!(sm.last_alert_time(), Some(1_000.0));
    }

    #[test]
    fn test_sustained_attack_notifies_once() {
        let mut sm = AlertStateMachine::new(120.0);
        let mut fired = 0;
        for i in 0..1_000 {
            // 500 seconds of ATTACK at 0.5s ticks.
            let t = sm.evaluate(Status::Attack, i as f64 * 0.5);
            if t.notify {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(sm.last_alert_time(), Some(0.0));
    }

    #[test]
    fn test_flapping_inside_cooldown_is_suppressed() {
        let mut sm = AlertStateMachine::new(120.0);
        assert!(sm.evaluate(Status::Attack, 0.0).notify);
        assert!(!sm.evaluate(Status::Safe, 1.0).notify);

        let second = sm.evaluate(Status::Attack, 2.0);
        assert!(second.rising_edge);
        assert!(!second.notify);
        // Suppressed edges do not move the cooldown.
        assert_eq!(sm.last_alert_time(), Some(0.0));

        sm.evaluate(Status::HighRisk, 100.0);
        let third = sm.evaluate(Status::Attack, 120.0);
        assert!(third.notify);
        assert_eq!(sm.last_alert_time(), Some(120.0));
    }

    #[test]
    fn test_non_attack_changes_only_cue() {
        let mut sm = AlertStateMachine::new(120.0);
        let t = sm.evaluate(Status::HighRisk, 0.0);
        assert!(t.changed);
        assert!(!t.rising_edge);
        assert!(!t.notify);

        let same = sm.evaluate(Status::HighRisk, 0.5);
        assert!(!same.changed);

        sm.evaluate(Status::Attack, 1.0);
        let down = sm.evaluate(Status::HighRisk, 1.5);
        assert!(down.changed);
        assert!(!down.rising_edge);
        assert_eq!(sm.status(), Status::HighRisk);
    }
}
