use std::collections::HashMap;

use crate::constants::{TILE_HEIGHT, TILE_WIDTH};
use crate::types::{AgentId, Direction};
use crate::vector::Vector2;

const HOME_TEMPLATE: [&str; 5] = ["XX+XX", "XX.XX", "+X.X+", "+.+.+", "+XXX+"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessSet(u8);

impl AccessSet {
    pub fn everyone() -> Self {
        Self(AgentId::ALL.iter().fold(0, |bits, agent| bits | agent.bit()))
    }

    pub fn contains(self, agent: AgentId) -> bool {
        self.0 & agent.bit() != 0
    }

    fn insert(&mut self, agent: AgentId) {
        self.0 |= agent.bit();
    }

    fn remove(&mut self, agent: AgentId) {
        self.0 &= !agent.bit();
    }
}

impl Default for AccessSet {
    fn default() -> Self {
        Self::everyone()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Path,
    Node,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub position: Vector2,
    pub col: f32,
    pub row: f32,
    pub home: bool,
    neighbors: [Option<NodeId>; 4],
    portal: Option<NodeId>,
    access: [AccessSet; 4],
}

#[derive(Clone, Debug, Default)]
pub struct NavGraph {
    nodes: Vec<Node>,
    lookup: HashMap<(i32, i32), NodeId>,
    home_key: Option<NodeId>,
    cols: usize,
    rows: usize,
}

fn half_tile_key(col: f32, row: f32) -> (i32, i32) {
    ((col * 2.0).round() as i32, (row * 2.0).round() as i32)
}

impl NavGraph {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            ..Self::default()
        }
    }

    pub fn from_grid(grid: &[Vec<Cell>]) -> Self {
        let rows = grid.len();
        let cols = grid.iter().map(Vec::len).max().unwrap_or(0);
        let mut graph = Self::new(cols, rows);
        graph.add_grid(grid, 0.0, 0.0, false);
        graph
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width_px(&self) -> f32 {
        self.cols as f32 * TILE_WIDTH
    }

    pub fn height_px(&self) -> f32 {
        self.rows as f32 * TILE_HEIGHT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn position(&self, id: NodeId) -> Vector2 {
        self.nodes[id.0].position
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn non_home_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|id| !self.nodes[id.0].home)
            .collect()
    }

    pub fn home_key(&self) -> Option<NodeId> {
        self.home_key
    }

    pub fn add_node(&mut self, col: f32, row: f32, home: bool) -> NodeId {
        let key = half_tile_key(col, row);
        if let Some(existing) = self.lookup.get(&key) {
            return *existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            position: Vector2::new(col * TILE_WIDTH, row * TILE_HEIGHT),
            col,
            row,
            home,
            neighbors: [None; 4],
            portal: None,
            access: [AccessSet::everyone(); 4],
        });
        self.lookup.insert(key, id);
        id
    }

    pub fn lookup_by_tile(&self, col: f32, row: f32) -> Option<NodeId> {
        self.lookup.get(&half_tile_key(col, row)).copied()
    }

    pub fn neighbor(&self, id: NodeId, dir: Direction) -> Option<NodeId> {
        dir.slot().and_then(|slot| self.nodes[id.0].neighbors[slot])
    }

    pub fn portal(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].portal
    }

    pub fn connect(&mut self, from: NodeId, dir: Direction, to: NodeId) {
        if let Some(slot) = dir.slot() {
            self.nodes[from.0].neighbors[slot] = Some(to);
        }
    }

    pub fn link(&mut self, a: NodeId, dir: Direction, b: NodeId) {
        self.connect(a, dir, b);
        self.connect(b, dir.opposite(), a);
    }

    pub fn set_portal_pair(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a.0].portal = Some(b);
        self.nodes[b.0].portal = Some(a);
    }

    pub fn portals_symmetric(&self) -> bool {
        self.node_ids().all(|id| match self.portal(id) {
            Some(other) => self.portal(other) == Some(id),
            None => true,
        })
    }

    pub fn is_accessible(&self, id: NodeId, dir: Direction, agent: AgentId) -> bool {
        let Some(slot) = dir.slot() else {
            return false;
        };
        let node = &self.nodes[id.0];
        node.neighbors[slot].is_some() && node.access[slot].contains(agent)
    }

    pub fn deny_access(&mut self, id: NodeId, dir: Direction, agent: AgentId) {
        if let Some(slot) = dir.slot() {
            self.nodes[id.0].access[slot].remove(agent);
        }
    }

    pub fn allow_access(&mut self, id: NodeId, dir: Direction, agent: AgentId) {
        if let Some(slot) = dir.slot() {
            self.nodes[id.0].access[slot].insert(agent);
        }
    }

    pub fn deny_access_list(&mut self, id: NodeId, dir: Direction, agents: &[AgentId]) {
        for agent in agents {
            self.deny_access(id, dir, *agent);
        }
    }

    pub fn allow_access_list(&mut self, id: NodeId, dir: Direction, agents: &[AgentId]) {
        for agent in agents {
            self.allow_access(id, dir, *agent);
        }
    }

    pub fn deny_home_access(&mut self, agent: AgentId) {
        if let Some(key) = self.home_key {
            self.deny_access(key, Direction::Down, agent);
        }
    }

    pub fn allow_home_access(&mut self, agent: AgentId) {
        if let Some(key) = self.home_key {
            self.allow_access(key, Direction::Down, agent);
        }
    }

    pub fn deny_home_access_list(&mut self, agents: &[AgentId]) {
        for agent in agents {
            self.deny_home_access(*agent);
        }
    }

    pub fn create_home_nodes(&mut self, col_offset: f32, row_offset: f32) -> NodeId {
        let grid: Vec<Vec<Cell>> = HOME_TEMPLATE
            .iter()
            .map(|line| {
                line.chars()
                    .map(|symbol| match symbol {
                        '+' => Cell::Node,
                        '.' => Cell::Path,
                        _ => Cell::Wall,
                    })
                    .collect()
            })
            .collect();
        self.add_grid(&grid, col_offset, row_offset, true);
        let key = self.add_node(col_offset + 2.0, row_offset, true);
        self.home_key = Some(key);
        key
    }

    pub fn connect_home_nodes(&mut self, home_key: NodeId, other: NodeId, dir: Direction) {
        self.link(home_key, dir, other);
    }

    fn add_grid(&mut self, grid: &[Vec<Cell>], col_offset: f32, row_offset: f32, home: bool) {
        let mut ids: Vec<Vec<Option<NodeId>>> = Vec::with_capacity(grid.len());
        for (row, cells) in grid.iter().enumerate() {
            let mut row_ids = Vec::with_capacity(cells.len());
            for (col, cell) in cells.iter().enumerate() {
                let id = (*cell == Cell::Node).then(|| {
                    self.add_node(col as f32 + col_offset, row as f32 + row_offset, home)
                });
                row_ids.push(id);
            }
            ids.push(row_ids);
        }

        for (row, cells) in grid.iter().enumerate() {
            let mut previous: Option<NodeId> = None;
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    Cell::Node => {
                        let current = ids[row][col];
                        if let (Some(left), Some(right)) = (previous, current) {
                            self.link(left, Direction::Right, right);
                        }
                        previous = current;
                    }
                    Cell::Path => {}
                    Cell::Wall => previous = None,
                }
            }
        }

        let cols = grid.iter().map(Vec::len).max().unwrap_or(0);
        for col in 0..cols {
            let mut previous: Option<NodeId> = None;
            for (row, cells) in grid.iter().enumerate() {
                match cells.get(col).copied().unwrap_or(Cell::Wall) {
                    Cell::Node => {
                        let current = ids[row][col];
                        if let (Some(up), Some(down)) = (previous, current) {
                            self.link(up, Direction::Down, down);
                        }
                        previous = current;
                    }
                    Cell::Path => {}
                    Cell::Wall => previous = None,
                }
            }
        }
    }
}
