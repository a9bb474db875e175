use crate::constants::{FRIGHTENED_SECS, PATROL_SECS, PURSUE_SECS};
use crate::types::BehaviorState;

#[derive(Clone, Debug)]
pub struct PhaseTimer {
    phase: BehaviorState,
    elapsed: f32,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self {
            phase: BehaviorState::Patrol,
            elapsed: 0.0,
        }
    }

    pub fn phase(&self) -> BehaviorState {
        self.phase
    }

    fn duration(&self) -> f32 {
        match self.phase {
            BehaviorState::Pursue => PURSUE_SECS,
            _ => PATROL_SECS,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        if self.elapsed >= self.duration() {
            self.phase = match self.phase {
                BehaviorState::Patrol => BehaviorState::Pursue,
                _ => BehaviorState::Patrol,
            };
            self.elapsed = 0.0;
        }
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Override {
    Frightened { remaining: f32 },
    Retreating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorEvent {
    FrightenExpired,
    ReachedHome,
}

/// Phase cycle shared by every ghost plus a per-ghost frightened/retreat override.
#[derive(Clone, Debug, Default)]
pub struct BehaviorMachine {
    phase: PhaseTimer,
    active: Option<Override>,
}

impl BehaviorMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> BehaviorState {
        match self.active {
            Some(Override::Frightened { .. }) => BehaviorState::Frightened,
            Some(Override::Retreating) => BehaviorState::Retreating,
            None => self.phase.phase(),
        }
    }

    pub fn frightened_remaining(&self) -> Option<f32> {
        match self.active {
            Some(Override::Frightened { remaining }) => Some(remaining),
            _ => None,
        }
    }

    pub fn update(&mut self, dt: f32, at_home: bool) -> Option<BehaviorEvent> {
        self.phase.update(dt);
        match self.active {
            Some(Override::Frightened { remaining }) => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.active = None;
                    return Some(BehaviorEvent::FrightenExpired);
                }
                self.active = Some(Override::Frightened { remaining });
                None
            }
            Some(Override::Retreating) if at_home => {
                self.active = None;
                Some(BehaviorEvent::ReachedHome)
            }
            _ => None,
        }
    }

    pub fn frighten(&mut self) -> bool {
        if self.active == Some(Override::Retreating) {
            return false;
        }
        self.active = Some(Override::Frightened {
            remaining: FRIGHTENED_SECS,
        });
        true
    }

    pub fn retreat(&mut self) -> bool {
        if !matches!(self.active, Some(Override::Frightened { .. })) {
            return false;
        }
        self.active = Some(Override::Retreating);
        true
    }

    pub fn clear_override(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{BehaviorEvent, BehaviorMachine};
    use crate::types::BehaviorState;

    fn run(machine: &mut BehaviorMachine, seconds: f32, at_home: bool) -> Vec<BehaviorEvent> {
        let steps = (seconds * 10.0).round() as usize;
        (0..steps)
            .filter_map(|_| machine.update(0.1, at_home))
            .collect()
    }

    #[test]
    fn phase_alternates_patrol_and_pursue() {
        let mut machine = BehaviorMachine::new();
        assert_eq!(machine.current(), BehaviorState::Patrol);
        run(&mut machine, 6.9, false);
        assert_eq!(machine.current(), BehaviorState::Patrol);
        run(&mut machine, 0.2, false);
        assert_eq!(machine.current(), BehaviorState::Pursue);
        run(&mut machine, 19.7, false);
        assert_eq!(machine.current(), BehaviorState::Pursue);
        run(&mut machine, 0.4, false);
        assert_eq!(machine.current(), BehaviorState::Patrol);
    }

    #[test]
    fn retriggered_frighten_resets_instead_of_extending() {
        let mut machine = BehaviorMachine::new();
        assert!(machine.frighten());
        run(&mut machine, 5.0, false);
        assert!(machine.frighten());
        assert_eq!(machine.frightened_remaining(), Some(7.0));

        run(&mut machine, 6.8, false);
        assert_eq!(machine.current(), BehaviorState::Frightened);
        let events = run(&mut machine, 0.4, false);
        assert_eq!(events, vec![BehaviorEvent::FrightenExpired]);
        assert_ne!(machine.current(), BehaviorState::Frightened);
    }

    #[test]
    fn frighten_expiry_reverts_to_running_phase() {
        let mut machine = BehaviorMachine::new();
        run(&mut machine, 5.0, false);
        machine.frighten();
        run(&mut machine, 7.5, false);
        assert_eq!(machine.current(), BehaviorState::Pursue);
    }

    #[test]
    fn retreat_ends_only_at_home() {
        let mut machine = BehaviorMachine::new();
        assert!(!machine.retreat());
        machine.frighten();
        assert!(machine.retreat());
        assert!(run(&mut machine, 120.0, false).is_empty());
        assert_eq!(machine.current(), BehaviorState::Retreating);
        assert!(!machine.frighten());
        assert_eq!(machine.current(), BehaviorState::Retreating);

        assert_eq!(machine.update(0.0, true), Some(BehaviorEvent::ReachedHome));
        assert_ne!(machine.current(), BehaviorState::Retreating);
    }
}
