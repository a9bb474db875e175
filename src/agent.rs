use crate::constants::{AGENT_COLLIDE_RADIUS, BASE_SPEED, TILE_WIDTH};
use crate::nav::{NavGraph, NodeId};
use crate::rng::Rng;
use crate::types::{AgentId, Direction};
use crate::vector::Vector2;

/// How an agent picks its next direction when it reaches a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Steering {
    Random,
    TowardGoal(Vector2),
    Input(Direction),
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub node: NodeId,
    pub start_node: NodeId,
    pub target: NodeId,
    pub position: Vector2,
    pub direction: Direction,
    pub speed: f32,
    pub collide_radius: f32,
    pub visible: bool,
}

impl Agent {
    pub fn new(id: AgentId, start: NodeId, graph: &NavGraph) -> Self {
        let mut agent = Self {
            id,
            node: start,
            start_node: start,
            target: start,
            position: graph.position(start),
            direction: Direction::Stop,
            speed: 0.0,
            collide_radius: AGENT_COLLIDE_RADIUS,
            visible: true,
        };
        agent.set_speed(BASE_SPEED);
        agent
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed * TILE_WIDTH / 16.0;
    }

    pub fn set_start_node(&mut self, node: NodeId, graph: &NavGraph) {
        self.node = node;
        self.start_node = node;
        self.target = node;
        self.position = graph.position(node);
    }

    pub fn set_between_nodes(&mut self, dir: Direction, graph: &NavGraph) {
        if let Some(next) = graph.neighbor(self.node, dir) {
            self.target = next;
            self.position = (graph.position(self.node) + graph.position(next)) / 2.0;
        }
    }

    pub fn reset(&mut self, graph: &NavGraph) {
        self.set_start_node(self.start_node, graph);
        self.direction = Direction::Stop;
        self.set_speed(BASE_SPEED);
        self.visible = true;
    }

    pub fn update(&mut self, dt: f32, graph: &NavGraph, steering: Steering, rng: &mut Rng) {
        self.position += self.direction.unit() * self.speed * dt;

        if self.overshot_target(graph) {
            self.arrive(graph, steering, rng);
            return;
        }

        if let Steering::Input(requested) = steering {
            if self.is_opposite(requested) {
                self.reverse_direction();
            }
        }
    }

    fn arrive(&mut self, graph: &NavGraph, steering: Steering, rng: &mut Rng) {
        let travelled = self.node != self.target;
        self.node = self.target;
        if travelled {
            if let Some(exit) = graph.portal(self.node) {
                self.node = exit;
            }
        }

        let chosen = match steering {
            Steering::Input(requested) => requested,
            Steering::Random => rng
                .pick(&self.valid_directions(graph))
                .unwrap_or(Direction::Stop),
            Steering::TowardGoal(goal) => {
                self.goal_direction(graph, &self.valid_directions(graph), goal)
            }
        };

        if let Some(next) = self.new_target(graph, chosen) {
            self.direction = chosen;
            self.target = next;
        } else if let Some(next) = self.new_target(graph, self.direction) {
            self.target = next;
        } else {
            self.direction = Direction::Stop;
            self.target = self.node;
        }
        self.position = graph.position(self.node);
    }

    pub fn valid_direction(&self, graph: &NavGraph, dir: Direction) -> bool {
        dir != Direction::Stop && graph.is_accessible(self.node, dir, self.id)
    }

    fn new_target(&self, graph: &NavGraph, dir: Direction) -> Option<NodeId> {
        if self.valid_direction(graph, dir) {
            graph.neighbor(self.node, dir)
        } else {
            None
        }
    }

    /// Candidates exclude the reverse of the current heading unless nothing else is open.
    pub fn valid_directions(&self, graph: &NavGraph) -> Vec<Direction> {
        let reverse = self.direction.opposite();
        let mut directions: Vec<Direction> = Direction::CARDINAL
            .into_iter()
            .filter(|dir| *dir != reverse && self.valid_direction(graph, *dir))
            .collect();
        if directions.is_empty() && self.valid_direction(graph, reverse) {
            directions.push(reverse);
        }
        directions
    }

    pub fn goal_direction(
        &self,
        graph: &NavGraph,
        candidates: &[Direction],
        goal: Vector2,
    ) -> Direction {
        let origin = graph.position(self.node);
        let mut best = Direction::Stop;
        let mut best_distance = f32::INFINITY;
        for dir in candidates {
            let probe = origin + dir.unit() * TILE_WIDTH - goal;
            let distance = probe.magnitude_squared();
            if distance < best_distance {
                best_distance = distance;
                best = *dir;
            }
        }
        best
    }

    pub fn overshot_target(&self, graph: &NavGraph) -> bool {
        let origin = graph.position(self.node);
        let to_target = graph.position(self.target) - origin;
        let to_self = self.position - origin;
        to_self.magnitude_squared() >= to_target.magnitude_squared()
    }

    pub fn is_opposite(&self, dir: Direction) -> bool {
        dir != Direction::Stop && dir == self.direction.opposite()
    }

    pub fn reverse_direction(&mut self) {
        self.direction = self.direction.opposite();
        std::mem::swap(&mut self.node, &mut self.target);
    }

    pub fn collides_with(&self, position: Vector2, radius: f32) -> bool {
        let reach = self.collide_radius + radius;
        self.position.distance_squared(position) <= reach * reach
    }

    pub fn on_segment(&self, graph: &NavGraph, tolerance: f32) -> bool {
        let a = graph.position(self.node);
        let b = graph.position(self.target);
        let along = b - a;
        let length_squared = along.magnitude_squared();
        if length_squared == 0.0 {
            return self.position.distance_squared(a) <= tolerance * tolerance;
        }
        let offset = self.position - a;
        let t = (offset.x * along.x + offset.y * along.y) / length_squared;
        let clamped = t.clamp(0.0, 1.0);
        let closest = a + along * clamped;
        self.position.distance_squared(closest) <= tolerance * tolerance
    }
}
