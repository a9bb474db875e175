use serde::Serialize;

use crate::vector::Vector2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Stop,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "stop" | "none" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Stop => Self::Stop,
        }
    }

    pub fn unit(self) -> Vector2 {
        match self {
            Self::Up => Vector2::new(0.0, -1.0),
            Self::Down => Vector2::new(0.0, 1.0),
            Self::Left => Vector2::new(-1.0, 0.0),
            Self::Right => Vector2::new(1.0, 0.0),
            Self::Stop => Vector2::ZERO,
        }
    }

    pub fn slot(self) -> Option<usize> {
        match self {
            Self::Up => Some(0),
            Self::Down => Some(1),
            Self::Left => Some(2),
            Self::Right => Some(3),
            Self::Stop => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Player,
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl AgentId {
    pub const ALL: [AgentId; 5] = [
        Self::Player,
        Self::Blinky,
        Self::Pinky,
        Self::Inky,
        Self::Clyde,
    ];
    pub const GHOSTS: [AgentId; 4] = [Self::Blinky, Self::Pinky, Self::Inky, Self::Clyde];

    pub fn bit(self) -> u8 {
        match self {
            Self::Player => 1 << 0,
            Self::Blinky => 1 << 1,
            Self::Pinky => 1 << 2,
            Self::Inky => 1 << 3,
            Self::Clyde => 1 << 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    Patrol,
    Pursue,
    Frightened,
    Retreating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Standard,
    Power,
    Teleport,
    Invisibility,
    Speed,
    Magnet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Classic,
    Gunner,
    Shield,
}

impl Character {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "classic" | "pacman" => Some(Self::Classic),
            "gunner" | "gun" => Some(Self::Gunner),
            "shield" => Some(Self::Shield),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Gunner => "gunner",
            Self::Shield => "shield",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    Gun,
    Shield,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityPhase {
    Ready,
    Active,
    Cooldown,
}

#[derive(Clone, Debug, Serialize)]
pub struct AbilityView {
    pub kind: AbilityKind,
    pub phase: AbilityPhase,
    #[serde(rename = "timeLeft")]
    pub time_left: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub alive: bool,
    pub visible: bool,
    pub character: Character,
    pub invisible: bool,
    #[serde(rename = "speedBoosted")]
    pub speed_boosted: bool,
    pub ability: Option<AbilityView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub state: BehaviorState,
    pub visible: bool,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PickupView {
    pub kind: PickupKind,
    pub col: i32,
    pub row: i32,
    pub visible: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct FruitView {
    pub x: f32,
    pub y: f32,
    pub points: u32,
    #[serde(rename = "timeLeft")]
    pub time_left: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct BulletView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    LevelStarted {
        level: u32,
        name: String,
    },
    PickupEaten {
        kind: PickupKind,
        col: i32,
        row: i32,
        points: u32,
    },
    GhostReleased {
        ghost: AgentId,
    },
    GhostEaten {
        ghost: AgentId,
        points: u32,
        #[serde(rename = "byBullet")]
        by_bullet: bool,
    },
    Frightened,
    Teleported {
        x: f32,
        y: f32,
    },
    FruitSpawned {
        points: u32,
    },
    FruitEaten {
        points: u32,
    },
    FruitExpired,
    AbilityActivated {
        kind: AbilityKind,
    },
    BulletFired {
        dir: Direction,
    },
    PlayerDied {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    LevelCleared {
        level: u32,
    },
    GameOver {
        score: u32,
        level: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub level: u32,
    #[serde(rename = "levelName")]
    pub level_name: String,
    pub score: u32,
    pub lives: u32,
    pub paused: bool,
    #[serde(rename = "levelComplete")]
    pub level_complete: bool,
    #[serde(rename = "pickupsEaten")]
    pub pickups_eaten: u32,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub pickups: Vec<PickupView>,
    pub fruit: Option<FruitView>,
    pub bullets: Vec<BulletView>,
    pub events: Vec<RuntimeEvent>,
}
