use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{LevelError, LevelResult};
use crate::nav::{Cell, NavGraph, NodeId};
use crate::types::{AgentId, Direction, PickupKind};

const CLASSIC_LEVEL: &str = include_str!("../levels/classic.json");
const TWIN_TUNNELS_LEVEL: &str = include_str!("../levels/twin_tunnels.json");

#[derive(Clone, Debug, Deserialize)]
pub struct LevelDescriptor {
    pub name: String,
    pub layout: Vec<String>,
    #[serde(rename = "portalPairs", default)]
    pub portal_pairs: Vec<[[f32; 2]; 2]>,
    #[serde(rename = "homeOffset")]
    pub home_offset: [f32; 2],
    #[serde(rename = "homeConnectLeft")]
    pub home_connect_left: [f32; 2],
    #[serde(rename = "homeConnectRight")]
    pub home_connect_right: [f32; 2],
    #[serde(rename = "playerStart")]
    pub player_start: [f32; 2],
    #[serde(rename = "fruitStart")]
    pub fruit_start: [f32; 2],
    #[serde(rename = "ghostDenyUp", default)]
    pub ghost_deny_up: Vec<[f32; 2]>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelFile {
    Many(Vec<LevelDescriptor>),
    One(LevelDescriptor),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickupSpawn {
    pub kind: PickupKind,
    pub col: i32,
    pub row: i32,
}

#[derive(Clone, Debug)]
pub struct LevelBuild {
    pub name: String,
    pub graph: NavGraph,
    pub player_start: NodeId,
    pub ghost_starts: [NodeId; 4],
    pub spawn_node: NodeId,
    pub home_key: NodeId,
    pub fruit_start: NodeId,
    pub pickups: Vec<PickupSpawn>,
}

impl LevelBuild {
    pub fn ghost_start(&self, ghost: AgentId) -> NodeId {
        match ghost {
            AgentId::Pinky => self.ghost_starts[1],
            AgentId::Inky => self.ghost_starts[2],
            AgentId::Clyde => self.ghost_starts[3],
            _ => self.ghost_starts[0],
        }
    }
}

fn classify(symbol: char) -> Option<(Cell, Option<PickupKind>)> {
    let parsed = match symbol {
        '+' => (Cell::Node, Some(PickupKind::Standard)),
        'P' => (Cell::Node, Some(PickupKind::Power)),
        'n' => (Cell::Node, None),
        '.' => (Cell::Path, Some(PickupKind::Standard)),
        'p' => (Cell::Path, Some(PickupKind::Power)),
        '-' | '|' => (Cell::Path, None),
        'T' => (Cell::Path, Some(PickupKind::Teleport)),
        'I' => (Cell::Path, Some(PickupKind::Invisibility)),
        'S' => (Cell::Path, Some(PickupKind::Speed)),
        'M' => (Cell::Path, Some(PickupKind::Magnet)),
        'X' | '=' | '0'..='9' => (Cell::Wall, None),
        _ => return None,
    };
    Some(parsed)
}

impl LevelDescriptor {
    pub fn from_json(text: &str, origin: &str) -> LevelResult<Vec<Self>> {
        let parsed: LevelFile = serde_json::from_str(text).map_err(|source| LevelError::Json {
            origin: origin.to_string(),
            source,
        })?;
        let levels = match parsed {
            LevelFile::Many(levels) => levels,
            LevelFile::One(level) => vec![level],
        };
        if levels.is_empty() {
            return Err(LevelError::NoLevels);
        }
        Ok(levels)
    }

    pub fn build(&self) -> LevelResult<LevelBuild> {
        let (grid, pickups) = self.parse_layout()?;
        let mut graph = NavGraph::from_grid(&grid);

        let home_key = graph.create_home_nodes(self.home_offset[0], self.home_offset[1]);
        let left = self.node_at(&graph, self.home_connect_left)?;
        let right = self.node_at(&graph, self.home_connect_right)?;
        graph.connect_home_nodes(home_key, left, Direction::Left);
        graph.connect_home_nodes(home_key, right, Direction::Right);

        for [a, b] in &self.portal_pairs {
            let from = self.node_at(&graph, *a)?;
            let to = self.node_at(&graph, *b)?;
            if graph.portal(from).is_some_and(|existing| existing != to)
                || graph.portal(to).is_some_and(|existing| existing != from)
                || from == to
            {
                return Err(LevelError::AsymmetricPortal {
                    name: self.name.clone(),
                    a_col: a[0],
                    a_row: a[1],
                    b_col: b[0],
                    b_row: b[1],
                });
            }
            graph.set_portal_pair(from, to);
        }

        let [hx, hy] = self.home_offset;
        let ghost_starts = [
            self.node_at(&graph, [hx + 2.0, hy])?,
            self.node_at(&graph, [hx + 2.0, hy + 3.0])?,
            self.node_at(&graph, [hx, hy + 3.0])?,
            self.node_at(&graph, [hx + 4.0, hy + 3.0])?,
        ];
        let spawn_node = ghost_starts[1];
        let player_start = self.node_at(&graph, self.player_start)?;
        let fruit_start = self.node_at(&graph, self.fruit_start)?;

        graph.deny_home_access(AgentId::Player);
        graph.deny_home_access_list(&AgentId::GHOSTS);
        graph.deny_access(ghost_starts[2], Direction::Right, AgentId::Inky);
        graph.deny_access(ghost_starts[3], Direction::Left, AgentId::Clyde);
        graph.deny_access_list(spawn_node, Direction::Left, &AgentId::GHOSTS);
        graph.deny_access_list(spawn_node, Direction::Right, &AgentId::GHOSTS);
        for tile in &self.ghost_deny_up {
            let node = self.node_at(&graph, *tile)?;
            graph.deny_access_list(node, Direction::Up, &AgentId::GHOSTS);
        }

        debug!(
            level = %self.name,
            nodes = graph.len(),
            pickups = pickups.len(),
            "level graph built"
        );

        Ok(LevelBuild {
            name: self.name.clone(),
            graph,
            player_start,
            ghost_starts,
            spawn_node,
            home_key,
            fruit_start,
            pickups,
        })
    }

    fn parse_layout(&self) -> LevelResult<(Vec<Vec<Cell>>, Vec<PickupSpawn>)> {
        let Some(first) = self.layout.first() else {
            return Err(LevelError::EmptyLayout {
                name: self.name.clone(),
            });
        };
        let expected = first.chars().count();
        if expected == 0 {
            return Err(LevelError::EmptyLayout {
                name: self.name.clone(),
            });
        }

        let mut grid = Vec::with_capacity(self.layout.len());
        let mut pickups = Vec::new();
        for (row, line) in self.layout.iter().enumerate() {
            let width = line.chars().count();
            if width != expected {
                return Err(LevelError::RaggedRow {
                    name: self.name.clone(),
                    row,
                    width,
                    expected,
                });
            }
            let mut cells = Vec::with_capacity(width);
            for (col, symbol) in line.chars().enumerate() {
                let Some((cell, pickup)) = classify(symbol) else {
                    return Err(LevelError::UnknownSymbol {
                        name: self.name.clone(),
                        symbol,
                        col,
                        row,
                    });
                };
                if let Some(kind) = pickup {
                    pickups.push(PickupSpawn {
                        kind,
                        col: col as i32,
                        row: row as i32,
                    });
                }
                cells.push(cell);
            }
            grid.push(cells);
        }
        Ok((grid, pickups))
    }

    fn node_at(&self, graph: &NavGraph, tile: [f32; 2]) -> LevelResult<NodeId> {
        graph
            .lookup_by_tile(tile[0], tile[1])
            .ok_or_else(|| LevelError::MissingNode {
                name: self.name.clone(),
                col: tile[0],
                row: tile[1],
            })
    }
}

pub fn builtin_levels() -> LevelResult<Vec<LevelDescriptor>> {
    let mut levels = LevelDescriptor::from_json(CLASSIC_LEVEL, "levels/classic.json")?;
    levels.extend(LevelDescriptor::from_json(
        TWIN_TUNNELS_LEVEL,
        "levels/twin_tunnels.json",
    )?);
    Ok(levels)
}

pub fn load_levels(path: &Path) -> LevelResult<Vec<LevelDescriptor>> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    LevelDescriptor::from_json(&text, &path.to_string_lossy())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::LevelDescriptor;

    pub(crate) fn small_level() -> LevelDescriptor {
        LevelDescriptor {
            name: "small".to_string(),
            layout: [
                "n-+.+.+.+-n",
                "|XXXXXXXXX|",
                "n--nXXXn--n",
                "|XXXXXXXXX|",
                "|XXXXXXXXX|",
                "|XXXXXXXXX|",
                "|XXXXXXXXX|",
                "|XXXXXXXXX|",
                "n-+.+-----n",
            ]
            .iter()
            .map(|row| row.to_string())
            .collect(),
            portal_pairs: Vec::new(),
            home_offset: [3.0, 2.0],
            home_connect_left: [3.0, 2.0],
            home_connect_right: [7.0, 2.0],
            player_start: [10.0, 8.0],
            fruit_start: [6.0, 0.0],
            ghost_deny_up: Vec::new(),
        }
    }
}
