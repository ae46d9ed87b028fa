//! baduk-rust: play Go against an external GTP engine.
//!
//! The crate drives an engine such as GNU Go over the Go Text Protocol,
//! records every game as an SGF file that is valid after each move, and
//! reads those records back for listing, replay and resuming.
//!
//! ## Modules
//!
//! - [`coords`] - Board points to GTP vertices and back
//! - [`gtp`] - GTP client and engine transports
//! - [`session`] - Turn-taking state machine around one engine process
//! - [`state`] - Board snapshots handed to the UI
//! - [`board`] - Stones, moves and capture resolution
//! - [`sgf`] - SGF coordinates, move nodes and result tokens
//! - [`record`] - Crash-safe SGF writer
//! - [`reader`] - SGF reader, replay and history listing
//! - [`tree`] - Variation tree for planning mode
//! - [`planning`] - Local what-if play committed back to the game
//! - [`config`] - User configuration and per-game settings
//! - [`constants`] - Limits, defaults and record formatting
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```no_run
//! use baduk_rust::config::GameConfig;
//! use baduk_rust::session::EngineSession;
//!
//! let session = EngineSession::new(GameConfig::default());
//! session.on_move(|event| println!("{} played {:?}", event.color, event.mv));
//! session.connect()?;
//!
//! // Human plays first as Black; the engine answers in the background.
//! session.play_move(3, 3)?;
//! session.wait_for_engine();
//! println!("{}", session.board_state().board);
//! session.close();
//! # Ok::<(), baduk_rust::error::SessionError>(())
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod coords;
pub mod error;
pub mod gtp;
pub mod planning;
pub mod reader;
pub mod record;
pub mod session;
pub mod sgf;
pub mod state;
pub mod tree;
