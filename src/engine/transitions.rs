use tracing::info;

use super::GameEngine;
use crate::pause::PendingTransition;

impl GameEngine {
    pub(super) fn apply_transition(&mut self, transition: PendingTransition) {
        info!(?transition, tick = self.tick, "applying pending transition");
        match transition {
            PendingTransition::Resume => self.show_entities(),
            PendingTransition::NextLevel => self.next_level(),
            PendingTransition::ResetLevel => self.reset_level(),
            PendingTransition::RestartGame => self.restart_game(),
        }
    }

    pub(super) fn show_entities(&mut self) {
        self.player.agent.visible = true;
        self.ghosts.show();
    }

    pub(super) fn hide_entities(&mut self) {
        self.player.agent.visible = false;
        self.ghosts.hide();
    }

    pub fn next_level(&mut self) {
        self.load_level(self.level + 1);
    }

    pub fn reset_level(&mut self) {
        self.player.reset(&self.current.graph);
        self.ghosts.reset(&mut self.current.graph);
        self.fruit = None;
        self.pause.clear();
        if self.start_paused {
            self.pause.toggle();
        }
    }

    pub fn restart_game(&mut self) {
        self.lives = self.starting_lives;
        self.score = 0;
        self.load_level(0);
    }
}
