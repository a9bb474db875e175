use crate::agent::{Agent, Steering};
use crate::behavior::{BehaviorEvent, BehaviorMachine};
use crate::constants::{
    BASE_SPEED, CHASE_AHEAD_TILES, FLANK_AHEAD_TILES, FRIGHTENED_SPEED, GHOST_BASE_POINTS,
    RETREAT_SPEED, SHY_DISTANCE_TILES, TILE_WIDTH,
};
use crate::maze::LevelBuild;
use crate::nav::{NavGraph, NodeId};
use crate::rng::Rng;
use crate::types::{AgentId, BehaviorState, Direction, GhostView};
use crate::vector::Vector2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Self::Blinky, Self::Pinky, Self::Inky, Self::Clyde];

    pub fn agent_id(self) -> AgentId {
        match self {
            Self::Blinky => AgentId::Blinky,
            Self::Pinky => AgentId::Pinky,
            Self::Inky => AgentId::Inky,
            Self::Clyde => AgentId::Clyde,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuitContext {
    pub player_position: Vector2,
    pub player_direction: Direction,
    pub ally_position: Vector2,
    pub bounds: Vector2,
}

pub fn patrol_goal(variant: Variant, bounds: Vector2) -> Vector2 {
    match variant {
        Variant::Blinky => Vector2::ZERO,
        Variant::Pinky => Vector2::new(bounds.x, 0.0),
        Variant::Inky => bounds,
        Variant::Clyde => Vector2::new(0.0, bounds.y),
    }
}

fn ahead_of_player(ctx: &PursuitContext, tiles: f32) -> Vector2 {
    ctx.player_position + ctx.player_direction.unit() * TILE_WIDTH * tiles
}

pub fn pursue_goal(variant: Variant, own_position: Vector2, ctx: &PursuitContext) -> Vector2 {
    match variant {
        Variant::Blinky => ctx.player_position,
        Variant::Pinky => ahead_of_player(ctx, CHASE_AHEAD_TILES),
        Variant::Inky => {
            let pivot = ahead_of_player(ctx, FLANK_AHEAD_TILES);
            ctx.ally_position + (pivot - ctx.ally_position) * 2.0
        }
        Variant::Clyde => {
            let shy = SHY_DISTANCE_TILES * TILE_WIDTH;
            if own_position.distance_squared(ctx.player_position) <= shy * shy {
                patrol_goal(variant, ctx.bounds)
            } else {
                ahead_of_player(ctx, CHASE_AHEAD_TILES)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub variant: Variant,
    pub agent: Agent,
    pub behavior: BehaviorMachine,
    pub spawn_node: NodeId,
    pub points: u32,
    pub goal: Vector2,
}

impl Ghost {
    pub fn new(variant: Variant, start: NodeId, spawn_node: NodeId, graph: &NavGraph) -> Self {
        Self {
            variant,
            agent: Agent::new(variant.agent_id(), start, graph),
            behavior: BehaviorMachine::new(),
            spawn_node,
            points: GHOST_BASE_POINTS,
            goal: Vector2::ZERO,
        }
    }

    pub fn id(&self) -> AgentId {
        self.agent.id
    }

    pub fn state(&self) -> BehaviorState {
        self.behavior.current()
    }

    pub fn update(
        &mut self,
        dt: f32,
        graph: &mut NavGraph,
        ctx: &PursuitContext,
        rng: &mut Rng,
    ) -> Option<BehaviorEvent> {
        let event = self.behavior.update(dt, self.agent.node == self.spawn_node);
        if event.is_some() {
            self.normal_mode(graph);
        }

        let steering = match self.behavior.current() {
            BehaviorState::Patrol => {
                self.goal = patrol_goal(self.variant, ctx.bounds);
                Steering::TowardGoal(self.goal)
            }
            BehaviorState::Pursue => {
                self.goal = pursue_goal(self.variant, self.agent.position, ctx);
                Steering::TowardGoal(self.goal)
            }
            BehaviorState::Retreating => {
                self.goal = graph.position(self.spawn_node);
                Steering::TowardGoal(self.goal)
            }
            BehaviorState::Frightened => Steering::Random,
        };
        self.agent.update(dt, graph, steering, rng);
        event
    }

    pub fn frighten(&mut self) {
        if self.behavior.frighten() {
            self.agent.set_speed(FRIGHTENED_SPEED);
        }
    }

    pub fn start_retreat(&mut self) {
        if self.behavior.retreat() {
            self.agent.set_speed(RETREAT_SPEED);
        }
    }

    pub fn normal_mode(&mut self, graph: &mut NavGraph) {
        self.agent.set_speed(BASE_SPEED);
        graph.deny_home_access(self.agent.id);
    }

    pub fn reset(&mut self, graph: &mut NavGraph) {
        self.agent.reset(graph);
        self.behavior = BehaviorMachine::new();
        self.points = GHOST_BASE_POINTS;
        graph.deny_home_access(self.agent.id);
    }

    pub fn view(&self) -> GhostView {
        GhostView {
            id: self.agent.id,
            x: self.agent.position.x,
            y: self.agent.position.y,
            dir: self.agent.direction,
            state: self.state(),
            visible: self.agent.visible,
            points: self.points,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GhostGroup {
    pub ghosts: Vec<Ghost>,
}

impl GhostGroup {
    pub fn new(build: &LevelBuild) -> Self {
        let ghosts = Variant::ALL
            .into_iter()
            .map(|variant| {
                Ghost::new(
                    variant,
                    build.ghost_start(variant.agent_id()),
                    build.spawn_node,
                    &build.graph,
                )
            })
            .collect();
        Self { ghosts }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ghost> {
        self.ghosts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ghost> {
        self.ghosts.iter_mut()
    }

    pub fn get(&self, id: AgentId) -> Option<&Ghost> {
        self.ghosts.iter().find(|ghost| ghost.agent.id == id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Ghost> {
        self.ghosts.iter_mut().find(|ghost| ghost.agent.id == id)
    }

    pub fn update(
        &mut self,
        dt: f32,
        graph: &mut NavGraph,
        player_position: Vector2,
        player_direction: Direction,
        rng: &mut Rng,
    ) -> Vec<(AgentId, BehaviorEvent)> {
        let bounds = Vector2::new(graph.width_px(), graph.height_px());
        let mut events = Vec::new();
        for idx in 0..self.ghosts.len() {
            let ally_position = self
                .get(AgentId::Blinky)
                .map(|blinky| blinky.agent.position)
                .unwrap_or(player_position);
            let ctx = PursuitContext {
                player_position,
                player_direction,
                ally_position,
                bounds,
            };
            let ghost = &mut self.ghosts[idx];
            if let Some(event) = ghost.update(dt, graph, &ctx, rng) {
                events.push((ghost.agent.id, event));
            }
        }
        events
    }

    pub fn frighten_all(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.frighten();
        }
        self.reset_points();
    }

    pub fn double_points(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.points = ghost.points.saturating_mul(2);
        }
    }

    pub fn reset_points(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.points = GHOST_BASE_POINTS;
        }
    }

    pub fn hide(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.agent.visible = false;
        }
    }

    pub fn show(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.agent.visible = true;
        }
    }

    pub fn reset(&mut self, graph: &mut NavGraph) {
        for ghost in &mut self.ghosts {
            ghost.reset(graph);
        }
    }
}
