use tracing::{debug, info};

use crate::constants::START_LIVES;
use crate::error::{LevelError, LevelResult};
use crate::ghosts::GhostGroup;
use crate::maze::{builtin_levels, LevelBuild, LevelDescriptor};
use crate::nav::NavGraph;
use crate::pause::PauseScheduler;
use crate::pickups::{Fruit, PickupSet};
use crate::player::Player;
use crate::rng::Rng;
use crate::types::{Character, Direction, RuntimeEvent, Snapshot};

mod collisions;
mod transitions;

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub seed: Option<u32>,
    pub character: Character,
    pub starting_lives: u32,
    pub start_paused: bool,
    pub levels: Vec<LevelDescriptor>,
}

impl GameEngineOptions {
    pub fn builtin(character: Character) -> LevelResult<Self> {
        Ok(Self {
            seed: None,
            character,
            starting_lives: START_LIVES,
            start_paused: false,
            levels: builtin_levels()?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    templates: Vec<LevelBuild>,
    current: LevelBuild,
    level: u32,
    character: Character,
    player: Player,
    ghosts: GhostGroup,
    pickups: PickupSet,
    fruit: Option<Fruit>,
    pause: PauseScheduler,
    rng: Rng,
    input: Direction,
    score: u32,
    lives: u32,
    starting_lives: u32,
    start_paused: bool,
    level_complete: bool,
    events: Vec<RuntimeEvent>,
    tick: u64,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> LevelResult<Self> {
        let templates = options
            .levels
            .iter()
            .map(LevelDescriptor::build)
            .collect::<LevelResult<Vec<_>>>()?;
        let Some(first) = templates.first().cloned() else {
            return Err(LevelError::NoLevels);
        };
        let rng = options.seed.map(Rng::new).unwrap_or_else(Rng::from_entropy);
        let player = Player::new(first.player_start, &first.graph, options.character);
        let ghosts = GhostGroup::new(&first);
        let pickups = PickupSet::new(&first.pickups);

        let mut engine = Self {
            templates,
            current: first,
            level: 0,
            character: options.character,
            player,
            ghosts,
            pickups,
            fruit: None,
            pause: PauseScheduler::new(options.start_paused),
            rng,
            input: Direction::Stop,
            score: 0,
            lives: options.starting_lives,
            starting_lives: options.starting_lives,
            start_paused: options.start_paused,
            level_complete: false,
            events: Vec::new(),
            tick: 0,
        };
        engine.load_level(0);
        Ok(engine)
    }

    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.pickups.update(dt);

        if !self.pause.is_paused() {
            let player_position = self.player.agent.position;
            let player_direction = self.player.agent.direction;
            let recovered = self.ghosts.update(
                dt,
                &mut self.current.graph,
                player_position,
                player_direction,
                &mut self.rng,
            );
            for (ghost, event) in recovered {
                debug!(?ghost, ?event, tick = self.tick, "ghost back to normal mode");
            }

            if self.fruit.as_mut().is_some_and(|fruit| fruit.update(dt)) {
                self.fruit = None;
                self.events.push(RuntimeEvent::FruitExpired);
            }

            if self.player.alive {
                self.player
                    .update(dt, &self.current.graph, self.input, &mut self.rng);
            }

            self.check_pickup_events();
            self.check_ghost_events();
            self.check_fruit_events();
        }

        if let Some(transition) = self.pause.update(dt) {
            self.apply_transition(transition);
        }
    }

    pub fn set_input(&mut self, direction: Direction) {
        self.input = direction;
    }

    pub fn toggle_pause(&mut self) -> bool {
        if !self.player.alive {
            return false;
        }
        self.pause.toggle()
    }

    pub fn activate_ability(&mut self) -> bool {
        if self.pause.is_paused() || !self.player.alive {
            return false;
        }
        match self.player.activate_ability() {
            Some(kind) => {
                self.events.push(RuntimeEvent::AbilityActivated { kind });
                true
            }
            None => false,
        }
    }

    pub fn fire_ability(&mut self) -> bool {
        if self.pause.is_paused() || !self.player.alive {
            return false;
        }
        if !self.player.fire() {
            return false;
        }
        self.events.push(RuntimeEvent::BulletFired {
            dir: self.player.agent.direction,
        });
        true
    }

    pub fn is_level_complete(&self) -> bool {
        self.level_complete
    }

    pub fn current_score(&self) -> u32 {
        self.score
    }

    pub fn lives_remaining(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn level_name(&self) -> &str {
        &self.current.name
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn pause(&self) -> &PauseScheduler {
        &self.pause
    }

    pub fn graph(&self) -> &NavGraph {
        &self.current.graph
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn ghosts(&self) -> &GhostGroup {
        &self.ghosts
    }

    pub fn pickups(&self) -> &PickupSet {
        &self.pickups
    }

    pub fn fruit(&self) -> Option<&Fruit> {
        self.fruit.as_ref()
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let bullets = self
            .player
            .ability
            .as_ref()
            .map(|ability| ability.bullets.iter().map(|bullet| bullet.view()).collect())
            .unwrap_or_default();
        Snapshot {
            tick: self.tick,
            level: self.level,
            level_name: self.current.name.clone(),
            score: self.score,
            lives: self.lives,
            paused: self.pause.is_paused(),
            level_complete: self.level_complete,
            pickups_eaten: self.pickups.num_eaten,
            player: self.player.view(),
            ghosts: self.ghosts.iter().map(|ghost| ghost.view()).collect(),
            pickups: self.pickups.views(),
            fruit: self.fruit.as_ref().map(Fruit::view),
            bullets,
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn load_level(&mut self, level: u32) {
        let index = level as usize % self.templates.len();
        self.current = self.templates[index].clone();
        self.level = level;
        self.player = Player::new(self.current.player_start, &self.current.graph, self.character);
        self.ghosts = GhostGroup::new(&self.current);
        self.pickups = PickupSet::new(&self.current.pickups);
        self.fruit = None;
        self.level_complete = false;
        self.pause = PauseScheduler::new(self.start_paused);
        self.events.push(RuntimeEvent::LevelStarted {
            level,
            name: self.current.name.clone(),
        });
        info!(
            level,
            name = %self.current.name,
            pickups = self.pickups.len(),
            "level started"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::constants::{
        BASE_SPEED, DEATH_PAUSE_SECS, FRIGHTENED_SECS, GHOST_BASE_POINTS, TICK_MS,
    };
    use crate::engine::{GameEngine, GameEngineOptions};
    use crate::maze::test_support::small_level;
    use crate::maze::{LevelDescriptor, PickupSpawn};
    use crate::pause::PendingTransition;
    use crate::pickups::PickupSet;
    use crate::types::{AgentId, BehaviorState, Character, Direction, PickupKind, RuntimeEvent};
    use crate::vector::Vector2;

    fn engine_with(level: LevelDescriptor, character: Character, lives: u32) -> GameEngine {
        GameEngine::new(GameEngineOptions {
            seed: Some(7),
            character,
            starting_lives: lives,
            start_paused: false,
            levels: vec![level],
        })
        .expect("engine builds")
    }

    fn run_for(engine: &mut GameEngine, seconds: f32) {
        let dt = TICK_MS as f32 / 1000.0;
        let steps = (seconds / dt).ceil() as usize;
        for _ in 0..steps {
            engine.advance(dt);
        }
    }

    fn put_ghost_on_player(engine: &mut GameEngine, ghost: AgentId) {
        let position = engine.player.agent.position;
        let ghost = engine.ghosts.get_mut(ghost).expect("ghost");
        ghost.agent.position = position;
        ghost.agent.visible = true;
    }

    fn eaten_points(engine: &GameEngine) -> Vec<u32> {
        engine
            .events
            .iter()
            .filter_map(|event| match event {
                RuntimeEvent::GhostEaten { points, .. } => Some(*points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn clearing_every_pickup_completes_level_and_schedules_once() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        assert_eq!(engine.pickups.len(), 10);
        assert!(engine
            .pickups
            .iter()
            .all(|pickup| pickup.kind == PickupKind::Standard));

        let positions: Vec<Vector2> = engine.pickups.iter().map(|pickup| pickup.position).collect();
        for position in positions {
            engine.player.agent.position = position;
            engine.check_pickup_events();
        }

        assert!(engine.is_level_complete());
        assert_eq!(engine.pickups.num_eaten, 10);
        assert_eq!(engine.current_score(), 100);
        assert_eq!(engine.pause.pending(), Some(PendingTransition::NextLevel));
        let cleared = engine
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::LevelCleared { .. }))
            .count();
        assert_eq!(cleared, 1);
        assert!(!engine.player.agent.visible);

        run_for(&mut engine, 3.1);
        assert_eq!(engine.level(), 1);
        assert!(!engine.is_level_complete());
        assert_eq!(engine.pickups.len(), 10);
        assert_eq!(engine.current_score(), 100);
        assert!(engine.player.agent.visible);
    }

    #[test]
    fn eating_frightened_ghosts_doubles_within_one_window() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        engine.ghosts.frighten_all();

        put_ghost_on_player(&mut engine, AgentId::Blinky);
        engine.check_ghost_events();
        let blinky = engine.ghosts.get(AgentId::Blinky).expect("blinky");
        assert_eq!(blinky.state(), BehaviorState::Retreating);
        assert!(!blinky.agent.visible);
        assert_eq!(engine.current_score(), GHOST_BASE_POINTS);
        assert_eq!(engine.pause.pending(), Some(PendingTransition::Resume));
        assert!(engine
            .graph()
            .is_accessible(engine.current.home_key, Direction::Down, AgentId::Blinky));

        put_ghost_on_player(&mut engine, AgentId::Pinky);
        engine.check_ghost_events();
        assert_eq!(eaten_points(&engine), vec![200, 400]);
        assert_eq!(engine.current_score(), 600);

        engine.ghosts.frighten_all();
        assert!(engine.ghosts.iter().all(|ghost| ghost.points == GHOST_BASE_POINTS));
    }

    #[test]
    fn eaten_ghost_pause_restores_visibility() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        engine.ghosts.frighten_all();
        put_ghost_on_player(&mut engine, AgentId::Clyde);
        engine.check_ghost_events();
        assert!(engine.is_paused());
        assert!(!engine.player.agent.visible);

        run_for(&mut engine, 1.1);
        assert!(!engine.is_paused());
        assert!(engine.player.agent.visible);
        assert!(engine.ghosts.iter().all(|ghost| ghost.agent.visible));
    }

    #[test]
    fn retreating_ghost_is_immune_to_collision() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let ghost = engine.ghosts.get_mut(AgentId::Blinky).expect("blinky");
        ghost.frighten();
        ghost.start_retreat();
        put_ghost_on_player(&mut engine, AgentId::Blinky);
        engine.check_ghost_events();
        assert!(engine.player.alive);
        assert_eq!(engine.current_score(), 0);
        assert_eq!(engine.pause.pending(), None);
    }

    #[test]
    fn dangerous_collision_costs_a_life_then_resets() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let start = engine.player.agent.position;
        engine.player.agent.position = Vector2::new(16.0, 0.0);
        put_ghost_on_player(&mut engine, AgentId::Blinky);
        engine.check_ghost_events();

        assert_eq!(engine.lives_remaining(), 2);
        assert!(!engine.player.alive);
        assert!(engine.ghosts.iter().all(|ghost| !ghost.agent.visible));
        assert_eq!(engine.pause.pending(), Some(PendingTransition::ResetLevel));
        assert!(!engine.toggle_pause());

        run_for(&mut engine, DEATH_PAUSE_SECS + 0.1);
        assert!(engine.player.alive);
        assert_eq!(engine.pause.pending(), None);
        assert!(engine.ghosts.iter().all(|ghost| ghost.agent.visible));
        assert_ne!(engine.player.agent.position, Vector2::new(16.0, 0.0));
        assert!(engine.player.agent.position.distance_squared(start) < 400.0);
    }

    #[test]
    fn last_life_restarts_the_game() {
        let mut engine = engine_with(small_level(), Character::Classic, 1);
        engine.score = 420;
        put_ghost_on_player(&mut engine, AgentId::Pinky);
        engine.check_ghost_events();
        assert_eq!(engine.lives_remaining(), 0);
        assert!(engine
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::GameOver { score: 420, .. })));
        assert_eq!(engine.pause.pending(), Some(PendingTransition::RestartGame));

        run_for(&mut engine, DEATH_PAUSE_SECS + 0.1);
        assert_eq!(engine.lives_remaining(), 1);
        assert_eq!(engine.current_score(), 0);
        assert_eq!(engine.level(), 0);
        assert!(engine.player.alive);
    }

    #[test]
    fn invisibility_suppresses_and_shield_eats() {
        let mut engine = engine_with(small_level(), Character::Shield, 3);
        engine.player.grant_invisibility();
        put_ghost_on_player(&mut engine, AgentId::Blinky);
        engine.check_ghost_events();
        assert!(engine.player.alive);
        assert_eq!(engine.lives_remaining(), 3);

        let mut engine = engine_with(small_level(), Character::Shield, 3);
        assert!(engine.activate_ability());
        put_ghost_on_player(&mut engine, AgentId::Blinky);
        engine.check_ghost_events();
        assert!(engine.player.alive);
        assert_eq!(engine.current_score(), GHOST_BASE_POINTS);
        let blinky = engine.ghosts.get(AgentId::Blinky).expect("blinky");
        assert_eq!(blinky.state(), BehaviorState::Retreating);
    }

    #[test]
    fn bullets_eat_ghosts_without_hiding_player() {
        let mut engine = engine_with(small_level(), Character::Gunner, 3);
        assert!(engine.activate_ability());
        assert!(engine.fire_ability());
        let target = engine.player.agent.position + Vector2::new(8.0, 0.0);
        let blinky = engine.ghosts.get_mut(AgentId::Blinky).expect("blinky");
        blinky.agent.position = target;

        engine.check_ghost_events();
        let blinky = engine.ghosts.get(AgentId::Blinky).expect("blinky");
        assert_eq!(blinky.state(), BehaviorState::Retreating);
        assert!(engine.player.agent.visible);
        assert!(engine
            .player
            .ability
            .as_ref()
            .is_some_and(|gun| gun.bullets.is_empty()));
        assert_eq!(engine.current_score(), GHOST_BASE_POINTS);
    }

    #[test]
    fn magnet_absorbs_nearby_pellets_and_counts_each() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let spawn = |kind, col, row| PickupSpawn { kind, col, row };
        engine.pickups = PickupSet::new(&[
            spawn(PickupKind::Standard, 6, 8),
            spawn(PickupKind::Magnet, 7, 8),
            spawn(PickupKind::Standard, 5, 8),
            spawn(PickupKind::Standard, 8, 8),
            spawn(PickupKind::Standard, 1, 8),
            spawn(PickupKind::Standard, 10, 0),
        ]);
        engine.player.agent.position = Vector2::new(112.0, 128.0);
        engine.check_pickup_events();

        assert_eq!(engine.pickups.num_eaten, 4);
        assert_eq!(engine.current_score(), 80);
        assert_eq!(engine.pickups.len(), 2);
        assert!(!engine.is_level_complete());
    }

    #[test]
    fn eaten_count_thresholds_release_ghosts_and_spawn_fruit() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let inky_start = engine.current.ghost_start(AgentId::Inky);
        assert!(!engine
            .graph()
            .is_accessible(inky_start, Direction::Right, AgentId::Inky));

        engine.pickups.num_eaten = 29;
        let first = engine.pickups.iter().next().expect("pickup").position;
        engine.player.agent.position = first;
        engine.check_pickup_events();
        assert!(engine
            .graph()
            .is_accessible(inky_start, Direction::Right, AgentId::Inky));

        engine.pickups.num_eaten = 49;
        let next = engine.pickups.iter().next().expect("pickup").position;
        engine.player.agent.position = next;
        engine.check_pickup_events();
        let fruit = engine.fruit().expect("fruit spawned").clone();
        assert_eq!(fruit.points, 100);

        engine.player.agent.position = fruit.position;
        engine.check_fruit_events();
        assert!(engine.fruit().is_none());
        assert_eq!(engine.current_score(), 120);
    }

    #[test]
    fn teleport_lands_on_a_maze_node() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        engine.pickups = PickupSet::new(&[PickupSpawn {
            kind: PickupKind::Teleport,
            col: 7,
            row: 8,
        }]);
        engine.player.agent.position = Vector2::new(112.0, 128.0);
        engine.check_pickup_events();
        let node = engine.player.agent.node;
        assert!(!engine.graph().node(node).home);
        assert_eq!(engine.player.agent.position, engine.graph().position(node));
    }

    #[test]
    fn stopped_player_on_tunnel_end_does_not_bounce_between_portals() {
        let mut engine = GameEngine::new(GameEngineOptions {
            seed: Some(3),
            ..GameEngineOptions::builtin(Character::Classic).expect("builtin levels")
        })
        .expect("engine");
        let west = engine
            .graph()
            .lookup_by_tile(0.0, 17.0)
            .expect("west tunnel end");
        engine.player.warp_to(west, &engine.current.graph);
        engine.player.agent.direction = Direction::Up;
        engine.set_input(Direction::Stop);

        let dt = TICK_MS as f32 / 1000.0;
        for _ in 0..6 {
            engine.advance(dt);
            assert_eq!(engine.player.agent.node, west);
            assert_eq!(engine.player.agent.position, engine.graph().position(west));
        }
    }

    #[test]
    fn player_movement_lands_before_pickup_collision() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let spawn = |col, row| PickupSpawn {
            kind: PickupKind::Standard,
            col,
            row,
        };
        engine.pickups = PickupSet::new(&[spawn(6, 8), spawn(10, 0)]);
        assert_eq!(engine.player.agent.direction, Direction::Left);
        engine.player.agent.position = Vector2::new(96.0 + 9.0, 128.0);
        assert!(engine.pickups.first_colliding(&engine.player.agent).is_none());

        engine.advance(TICK_MS as f32 / 1000.0);
        assert_eq!(engine.pickups.num_eaten, 1);
        assert_eq!(engine.pickups.len(), 1);
        assert_eq!(engine.current_score(), 10);
        assert!(engine
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::PickupEaten { col: 6, row: 8, .. })));
    }

    #[test]
    fn frighten_expiry_applies_before_the_ghost_moves() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let upper = engine.graph().lookup_by_tile(0.0, 2.0).expect("upper");
        let lower = engine.graph().lookup_by_tile(0.0, 8.0).expect("lower");
        let blinky = engine.ghosts.get_mut(AgentId::Blinky).expect("blinky");
        blinky.frighten();
        assert_eq!(blinky.behavior.update(FRIGHTENED_SECS - 0.01, false), None);
        blinky.agent.node = upper;
        blinky.agent.target = lower;
        blinky.agent.direction = Direction::Down;
        blinky.agent.position = Vector2::new(0.0, 80.0);

        let dt = TICK_MS as f32 / 1000.0;
        engine.advance(dt);
        let blinky = engine.ghosts.get(AgentId::Blinky).expect("blinky");
        assert_ne!(blinky.state(), BehaviorState::Frightened);
        assert_eq!(blinky.agent.speed, BASE_SPEED);
        let travelled = blinky.agent.position.y - 80.0;
        assert!((travelled - BASE_SPEED * dt).abs() < 1e-3, "travelled {travelled}");
        assert_eq!(blinky.agent.position.x, 0.0);
    }

    #[test]
    fn paused_engine_freezes_agents() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        assert!(engine.toggle_pause());
        let before = engine.build_snapshot(false);
        run_for(&mut engine, 1.0);
        let after = engine.build_snapshot(false);
        assert_eq!(before.player.x, after.player.x);
        for (a, b) in before.ghosts.iter().zip(after.ghosts.iter()) {
            assert_eq!((a.x, a.y), (b.x, b.y));
        }
        assert!(!engine.activate_ability());
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = engine_with(small_level(), Character::Classic, 3);
        let first = engine.build_snapshot(true);
        let second = engine.build_snapshot(true);
        assert!(first
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::LevelStarted { .. })));
        assert!(second.events.is_empty());
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let options = GameEngineOptions {
            seed: Some(424_242),
            ..GameEngineOptions::builtin(Character::Gunner).expect("builtin levels")
        };
        let mut a = GameEngine::new(options.clone()).expect("engine a");
        let mut b = GameEngine::new(options).expect("engine b");
        let dt = TICK_MS as f32 / 1000.0;
        let moves = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];

        for tick in 0..900 {
            let dir = moves[(tick / 45) % moves.len()];
            a.set_input(dir);
            b.set_input(dir);
            a.advance(dt);
            b.advance(dt);
            let sa = a.build_snapshot(false);
            let sb = b.build_snapshot(false);
            assert_eq!(sa.player.x.to_bits(), sb.player.x.to_bits());
            assert_eq!(sa.player.y.to_bits(), sb.player.y.to_bits());
            assert_eq!(sa.score, sb.score);
            assert_eq!(sa.lives, sb.lives);
            for (ga, gb) in sa.ghosts.iter().zip(sb.ghosts.iter()) {
                assert_eq!(ga.x.to_bits(), gb.x.to_bits());
                assert_eq!(ga.y.to_bits(), gb.y.to_bits());
                assert_eq!(ga.state, gb.state);
            }
        }
    }

    #[test]
    fn agents_stay_on_graph_segments() {
        let mut engine = GameEngine::new(GameEngineOptions {
            seed: Some(99),
            ..GameEngineOptions::builtin(Character::Classic).expect("builtin levels")
        })
        .expect("engine");
        let dt = TICK_MS as f32 / 1000.0;
        for tick in 0..1800u32 {
            if tick % 20 == 0 {
                let dir = Direction::CARDINAL[(tick / 20 % 4) as usize];
                engine.set_input(dir);
            }
            engine.advance(dt);
            assert!(engine.player.agent.on_segment(engine.graph(), 0.01));
            for ghost in engine.ghosts.iter() {
                assert!(ghost.agent.on_segment(engine.graph(), 0.01));
            }
        }
    }
}
