use tracing::{debug, info};

use super::GameEngine;
use crate::constants::{
    release_threshold, DEATH_PAUSE_SECS, FRUIT_SPAWN_THRESHOLDS, GHOST_EATEN_PAUSE_SECS,
    LEVEL_CLEAR_PAUSE_SECS, MAGNET_RADIUS, TILE_HEIGHT, TILE_WIDTH,
};
use crate::pause::PendingTransition;
use crate::pickups::{Fruit, Pickup};
use crate::types::{AgentId, BehaviorState, Direction, PickupKind, RuntimeEvent};
use crate::vector::Vector2;

fn crossed(before: u32, after: u32, threshold: u32) -> bool {
    before < threshold && after >= threshold
}

impl GameEngine {
    pub(super) fn check_pickup_events(&mut self) {
        if !self.player.alive {
            return;
        }
        let Some(index) = self.pickups.first_colliding(&self.player.agent) else {
            return;
        };
        let before = self.pickups.num_eaten;
        let Some(pickup) = self.pickups.consume(index) else {
            return;
        };
        self.score_pickup(&pickup);

        match pickup.kind {
            PickupKind::Standard => {}
            PickupKind::Power => {
                self.ghosts.frighten_all();
                self.events.push(RuntimeEvent::Frightened);
            }
            PickupKind::Teleport => self.teleport_player(),
            PickupKind::Invisibility => self.player.grant_invisibility(),
            PickupKind::Speed => self.player.grant_speed_boost(),
            PickupKind::Magnet => {
                let absorbed = self
                    .pickups
                    .absorb_within(self.player.agent.position, MAGNET_RADIUS);
                debug!(count = absorbed.len(), "magnet absorbed pickups");
                for extra in &absorbed {
                    self.score_pickup(extra);
                }
            }
        }

        let after = self.pickups.num_eaten;
        self.release_ghosts(before, after);
        if self.fruit.is_none()
            && FRUIT_SPAWN_THRESHOLDS
                .iter()
                .any(|threshold| crossed(before, after, *threshold))
        {
            let fruit = Fruit::new(self.current.fruit_start, &self.current.graph, self.level);
            self.events.push(RuntimeEvent::FruitSpawned {
                points: fruit.points,
            });
            self.fruit = Some(fruit);
        }

        if self.pickups.is_empty() {
            self.level_complete = true;
            self.hide_entities();
            self.pause
                .schedule(LEVEL_CLEAR_PAUSE_SECS, PendingTransition::NextLevel);
            self.events.push(RuntimeEvent::LevelCleared { level: self.level });
            info!(level = self.level, score = self.score, "level cleared");
        }
    }

    fn score_pickup(&mut self, pickup: &Pickup) {
        self.score += pickup.points;
        self.events.push(RuntimeEvent::PickupEaten {
            kind: pickup.kind,
            col: pickup.col,
            row: pickup.row,
            points: pickup.points,
        });
    }

    fn release_ghosts(&mut self, before: u32, after: u32) {
        for (ghost, dir) in [(AgentId::Inky, Direction::Right), (AgentId::Clyde, Direction::Left)] {
            let Some(threshold) = release_threshold(ghost) else {
                continue;
            };
            if !crossed(before, after, threshold) {
                continue;
            }
            let start = self.current.ghost_start(ghost);
            self.current.graph.allow_access(start, dir, ghost);
            self.events.push(RuntimeEvent::GhostReleased { ghost });
            debug!(?ghost, eaten = after, "ghost released from home");
        }
    }

    fn teleport_player(&mut self) {
        let candidates = self.current.graph.non_home_nodes();
        let Some(node) = self.rng.pick(&candidates) else {
            return;
        };
        self.player.warp_to(node, &self.current.graph);
        let position = self.player.agent.position;
        self.events.push(RuntimeEvent::Teleported {
            x: position.x,
            y: position.y,
        });
    }

    pub(super) fn check_ghost_events(&mut self) {
        let ghost_size = Vector2::new(TILE_WIDTH * 2.0, TILE_HEIGHT * 2.0);
        for idx in 0..self.ghosts.ghosts.len() {
            let ghost = &self.ghosts.ghosts[idx];
            if !ghost.agent.visible || ghost.state() == BehaviorState::Retreating {
                continue;
            }
            let center = ghost.agent.position;
            let Some(ability) = self.player.ability.as_mut() else {
                break;
            };
            let hit = ability
                .bullets
                .iter_mut()
                .find(|bullet| bullet.active && bullet.hits(center, ghost_size));
            if let Some(bullet) = hit {
                bullet.active = false;
                self.ghosts.ghosts[idx].frighten();
                self.eat_ghost(idx, true);
            }
        }
        if let Some(ability) = self.player.ability.as_mut() {
            ability.bullets.retain(|bullet| bullet.active);
        }

        for idx in 0..self.ghosts.ghosts.len() {
            if !self.player.alive {
                return;
            }
            let ghost = &self.ghosts.ghosts[idx];
            if !ghost.agent.visible
                || !self
                    .player
                    .agent
                    .collides_with(ghost.agent.position, ghost.agent.collide_radius)
            {
                continue;
            }
            match ghost.state() {
                BehaviorState::Frightened => self.eat_ghost(idx, false),
                BehaviorState::Retreating => {}
                BehaviorState::Patrol | BehaviorState::Pursue => {
                    if self.player.is_invisible() {
                        continue;
                    }
                    if self.player.shield_active() {
                        self.ghosts.ghosts[idx].frighten();
                        self.eat_ghost(idx, false);
                        continue;
                    }
                    self.lose_life();
                }
            }
        }
    }

    fn eat_ghost(&mut self, idx: usize, by_bullet: bool) {
        let ghost = &mut self.ghosts.ghosts[idx];
        let id = ghost.id();
        let points = ghost.points;
        ghost.agent.visible = false;
        ghost.start_retreat();
        if !by_bullet {
            self.player.agent.visible = false;
        }
        self.score += points;
        self.ghosts.double_points();
        self.pause
            .schedule(GHOST_EATEN_PAUSE_SECS, PendingTransition::Resume);
        self.current.graph.allow_home_access(id);
        self.events.push(RuntimeEvent::GhostEaten {
            ghost: id,
            points,
            by_bullet,
        });
        debug!(ghost = ?id, points, by_bullet, "ghost eaten");
    }

    fn lose_life(&mut self) {
        if !self.player.alive {
            return;
        }
        self.lives = self.lives.saturating_sub(1);
        self.player.die();
        self.ghosts.hide();
        self.events.push(RuntimeEvent::PlayerDied {
            lives_left: self.lives,
        });
        if self.lives == 0 {
            self.events.push(RuntimeEvent::GameOver {
                score: self.score,
                level: self.level,
            });
            info!(score = self.score, level = self.level, "game over");
            self.pause
                .schedule(DEATH_PAUSE_SECS, PendingTransition::RestartGame);
        } else {
            info!(lives = self.lives, "life lost");
            self.pause
                .schedule(DEATH_PAUSE_SECS, PendingTransition::ResetLevel);
        }
    }

    pub(super) fn check_fruit_events(&mut self) {
        let Some(fruit) = self.fruit.as_ref() else {
            return;
        };
        if !self.player.alive || !self.player.agent.collides_with(fruit.position, fruit.radius) {
            return;
        }
        let points = fruit.points;
        self.score += points;
        self.fruit = None;
        self.events.push(RuntimeEvent::FruitEaten { points });
    }
}
