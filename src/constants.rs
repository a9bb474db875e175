use crate::types::AgentId;

pub const TICK_RATE: u32 = 30;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const TILE_WIDTH: f32 = 16.0;
pub const TILE_HEIGHT: f32 = 16.0;

pub const BASE_SPEED: f32 = 100.0;
pub const FRIGHTENED_SPEED: f32 = 50.0;
pub const RETREAT_SPEED: f32 = 150.0;
pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;

pub const AGENT_COLLIDE_RADIUS: f32 = 5.0;
pub const PICKUP_COLLIDE_RADIUS: f32 = 2.0 * TILE_WIDTH / 16.0;

pub const PATROL_SECS: f32 = 7.0;
pub const PURSUE_SECS: f32 = 20.0;
pub const FRIGHTENED_SECS: f32 = 7.0;

pub const GHOST_BASE_POINTS: u32 = 200;
pub const STANDARD_POINTS: u32 = 10;
pub const POWER_POINTS: u32 = 50;
pub const SPECIAL_POINTS: u32 = 50;
pub const POWER_BLINK_SECS: f32 = 0.2;

pub const START_LIVES: u32 = 5;
pub const LEVEL_CLEAR_PAUSE_SECS: f32 = 3.0;
pub const DEATH_PAUSE_SECS: f32 = 3.0;
pub const GHOST_EATEN_PAUSE_SECS: f32 = 1.0;

pub const FRUIT_SPAWN_THRESHOLDS: [u32; 2] = [50, 140];
pub const FRUIT_LIFESPAN_SECS: f32 = 5.0;

pub const ABILITY_ACTIVE_SECS: f32 = 5.0;
pub const ABILITY_COOLDOWN_SECS: f32 = 10.0;
pub const SHOT_INTERVAL_SECS: f32 = 0.15;
pub const BULLET_SPEED: f32 = 400.0;

pub const INVISIBILITY_SECS: f32 = 5.0;
pub const SPEED_BOOST_SECS: f32 = 5.0;
pub const MAGNET_RADIUS: f32 = 4.0 * TILE_WIDTH;

pub const CHASE_AHEAD_TILES: f32 = 4.0;
pub const FLANK_AHEAD_TILES: f32 = 2.0;
pub const SHY_DISTANCE_TILES: f32 = 8.0;

pub fn fruit_points(level: u32) -> u32 {
    100 + level * 20
}

pub fn release_threshold(agent: AgentId) -> Option<u32> {
    match agent {
        AgentId::Inky => Some(30),
        AgentId::Clyde => Some(70),
        _ => None,
    }
}
