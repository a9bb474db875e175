use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level `{name}` has an empty layout")]
    EmptyLayout { name: String },

    #[error("level `{name}` row {row} has width {width}, expected {expected}")]
    RaggedRow {
        name: String,
        row: usize,
        width: usize,
        expected: usize,
    },

    #[error("level `{name}` has unknown symbol {symbol:?} at ({col}, {row})")]
    UnknownSymbol {
        name: String,
        symbol: char,
        col: usize,
        row: usize,
    },

    #[error("level `{name}` references ({col}, {row}) as a node but no node exists there")]
    MissingNode { name: String, col: f32, row: f32 },

    #[error("level `{name}` portal pair ({a_col}, {a_row}) <-> ({b_col}, {b_row}) is not symmetric")]
    AsymmetricPortal {
        name: String,
        a_col: f32,
        a_row: f32,
        b_col: f32,
        b_row: f32,
    },

    #[error("failed to read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode level data from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no levels configured")]
    NoLevels,
}

pub type LevelResult<T> = Result<T, LevelError>;
