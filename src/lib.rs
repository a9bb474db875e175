pub mod abilities;
pub mod agent;
pub mod behavior;
pub mod constants;
pub mod engine;
pub mod error;
pub mod ghosts;
pub mod high_scores;
pub mod maze;
pub mod nav;
pub mod pause;
pub mod pickups;
pub mod player;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
pub mod vector;
