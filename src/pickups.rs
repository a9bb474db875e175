use crate::agent::Agent;
use crate::constants::{
    fruit_points, AGENT_COLLIDE_RADIUS, FRUIT_LIFESPAN_SECS, PICKUP_COLLIDE_RADIUS,
    POWER_BLINK_SECS, POWER_POINTS, SPECIAL_POINTS, STANDARD_POINTS, TILE_HEIGHT, TILE_WIDTH,
};
use crate::maze::PickupSpawn;
use crate::nav::{NavGraph, NodeId};
use crate::types::{Direction, FruitView, PickupKind, PickupView};
use crate::vector::Vector2;

pub fn points_for(kind: PickupKind) -> u32 {
    match kind {
        PickupKind::Standard => STANDARD_POINTS,
        PickupKind::Power => POWER_POINTS,
        _ => SPECIAL_POINTS,
    }
}

#[derive(Clone, Debug)]
pub struct Pickup {
    pub kind: PickupKind,
    pub col: i32,
    pub row: i32,
    pub position: Vector2,
    pub points: u32,
    pub radius: f32,
    pub visible: bool,
    blink_timer: f32,
}

impl Pickup {
    pub fn new(spawn: PickupSpawn) -> Self {
        Self {
            kind: spawn.kind,
            col: spawn.col,
            row: spawn.row,
            position: Vector2::new(spawn.col as f32 * TILE_WIDTH, spawn.row as f32 * TILE_HEIGHT),
            points: points_for(spawn.kind),
            radius: PICKUP_COLLIDE_RADIUS,
            visible: true,
            blink_timer: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        if self.kind != PickupKind::Power {
            return;
        }
        self.blink_timer += dt;
        if self.blink_timer >= POWER_BLINK_SECS {
            self.visible = !self.visible;
            self.blink_timer = 0.0;
        }
    }

    pub fn view(&self) -> PickupView {
        PickupView {
            kind: self.kind,
            col: self.col,
            row: self.row,
            visible: self.visible,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PickupSet {
    pickups: Vec<Pickup>,
    pub num_eaten: u32,
}

impl PickupSet {
    pub fn new(spawns: &[PickupSpawn]) -> Self {
        Self {
            pickups: spawns.iter().copied().map(Pickup::new).collect(),
            num_eaten: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pickup> {
        self.pickups.iter()
    }

    pub fn update(&mut self, dt: f32) {
        for pickup in &mut self.pickups {
            pickup.update(dt);
        }
    }

    pub fn first_colliding(&self, agent: &Agent) -> Option<usize> {
        self.pickups
            .iter()
            .position(|pickup| agent.collides_with(pickup.position, pickup.radius))
    }

    pub fn consume(&mut self, index: usize) -> Option<Pickup> {
        if index >= self.pickups.len() {
            return None;
        }
        self.num_eaten += 1;
        Some(self.pickups.remove(index))
    }

    /// Removes every standard or power pickup within `radius` of `center`, counting each as eaten.
    pub fn absorb_within(&mut self, center: Vector2, radius: f32) -> Vec<Pickup> {
        let limit = radius * radius;
        let mut absorbed = Vec::new();
        let mut kept = Vec::with_capacity(self.pickups.len());
        for pickup in self.pickups.drain(..) {
            let absorbable = matches!(pickup.kind, PickupKind::Standard | PickupKind::Power);
            if absorbable && pickup.position.distance_squared(center) <= limit {
                absorbed.push(pickup);
            } else {
                kept.push(pickup);
            }
        }
        self.pickups = kept;
        self.num_eaten += absorbed.len() as u32;
        absorbed
    }

    pub fn views(&self) -> Vec<PickupView> {
        self.pickups.iter().map(Pickup::view).collect()
    }
}

#[derive(Clone, Debug)]
pub struct Fruit {
    pub node: NodeId,
    pub position: Vector2,
    pub points: u32,
    pub radius: f32,
    remaining: f32,
}

impl Fruit {
    pub fn new(node: NodeId, graph: &NavGraph, level: u32) -> Self {
        let origin = graph.position(node);
        let position = match graph.neighbor(node, Direction::Right) {
            Some(next) => (origin + graph.position(next)) / 2.0,
            None => origin,
        };
        Self {
            node,
            position,
            points: fruit_points(level),
            radius: AGENT_COLLIDE_RADIUS,
            remaining: FRUIT_LIFESPAN_SECS,
        }
    }

    pub fn update(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }

    pub fn view(&self) -> FruitView {
        FruitView {
            x: self.position.x,
            y: self.position.y,
            points: self.points,
            time_left: self.remaining.max(0.0),
        }
    }
}
