use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingTransition {
    Resume,
    NextLevel,
    ResetLevel,
    RestartGame,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pending {
    remaining: f32,
    transition: PendingTransition,
}

/// One deferred transition at most; scheduling again replaces it.
#[derive(Clone, Debug, Default)]
pub struct PauseScheduler {
    paused: bool,
    pending: Option<Pending>,
}

impl PauseScheduler {
    pub fn new(paused: bool) -> Self {
        Self {
            paused,
            pending: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending.map(|pending| pending.transition)
    }

    pub fn remaining(&self) -> Option<f32> {
        self.pending.map(|pending| pending.remaining)
    }

    pub fn schedule(&mut self, duration: f32, transition: PendingTransition) {
        self.paused = true;
        self.pending = Some(Pending {
            remaining: duration,
            transition,
        });
    }

    pub fn toggle(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.paused = !self.paused;
        true
    }

    pub fn update(&mut self, dt: f32) -> Option<PendingTransition> {
        let mut pending = self.pending?;
        pending.remaining -= dt;
        if pending.remaining > 0.0 {
            self.pending = Some(pending);
            return None;
        }
        self.pending = None;
        self.paused = false;
        Some(pending.transition)
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.paused = false;
    }
}
