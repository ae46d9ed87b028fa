//! Error types for every component of the crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure converting between board points and GTP vertices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordError {
    #[error("board size {0} is not supported (must be 1-25)")]
    UnsupportedSize(usize),

    #[error("point ({x}, {y}) is outside a {size}x{size} board")]
    OutOfRange { x: usize, y: usize, size: usize },

    #[error("malformed vertex '{0}'")]
    Malformed(String),

    #[error("vertex '{vertex}' is outside a {size}x{size} board")]
    VertexOutOfRange { vertex: String, size: usize },
}

/// Failure talking to the engine over GTP.
#[derive(Error, Debug)]
pub enum GtpError {
    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine closed the connection")]
    Disconnected,

    #[error("engine rejected '{command}': {message}")]
    Engine { command: String, message: String },

    #[error("malformed engine response to '{command}': {response}")]
    Malformed { command: String, response: String },

    #[error("response id {got} does not match request id {expected}")]
    IdMismatch { expected: u32, got: u32 },
}

/// Failure of an engine session operation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    #[error("engine is not connected")]
    NotConnected,

    #[error("not your turn")]
    NotYourTurn,

    #[error("game is over")]
    GameOver,

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("cannot undo: only {played} moves played")]
    InsufficientHistory { played: usize },

    #[error("failed to start engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot rebuild resumed game from {path}: {message}")]
    BaseUnavailable { path: PathBuf, message: String },

    #[error(transparent)]
    Protocol(#[from] GtpError),

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Failure reading an SGF document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("bad value '{value}' for property {property}")]
    BadProperty { property: String, value: String },

    #[error("coordinate '{coord}' is outside a {size}x{size} board")]
    OutOfRange { coord: String, size: usize },
}

/// Failure maintaining an SGF game record on disk.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("failed to create history directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record is closed")]
    Closed,

    #[error("point ({x}, {y}) is outside a {size}x{size} board")]
    OutOfRange { x: usize, y: usize, size: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure loading or saving the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Failure in planning mode.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("point ({x}, {y}) is outside a {size}x{size} board")]
    OutOfRange { x: usize, y: usize, size: usize },

    #[error("point ({x}, {y}) is occupied")]
    Occupied { x: usize, y: usize },

    #[error("playing at ({x}, {y}) would be suicide")]
    Suicide { x: usize, y: usize },

    #[error("failed to commit plan to the game: {0}")]
    Session(#[from] SessionError),

    #[error("plan committed but not recorded: {0}")]
    Record(#[from] RecordError),
}
