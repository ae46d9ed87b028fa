//! Constants for board geometry, engine defaults and record formatting.

// =============================================================================
// Board Geometry
// =============================================================================

/// Smallest supported board.
pub const MIN_BOARD_SIZE: usize = 1;

/// Largest supported board. GTP column letters run A-Z without I.
pub const MAX_BOARD_SIZE: usize = 25;

/// Board size assumed when a record carries no `SZ` property.
pub const SGF_DEFAULT_SIZE: usize = 19;

/// Column letters used by GTP vertices (no `I`).
pub const GTP_COLUMNS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

// =============================================================================
// Engine Defaults
// =============================================================================

/// Engine binary launched when nothing else is configured.
pub const DEFAULT_ENGINE_PATH: &str = "gnugo";

/// Default board size for new games.
pub const DEFAULT_BOARD_SIZE: usize = 19;

/// Default komi for new games.
pub const DEFAULT_KOMI: f64 = 6.5;

/// Default engine strength.
pub const DEFAULT_LEVEL: u8 = 5;

/// Accepted engine strength range.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

/// Consecutive passes that end the game.
pub const PASSES_TO_END: u32 = 2;

/// Plies taken back by one undo (engine reply + human move).
pub const UNDO_PLIES: usize = 2;

// =============================================================================
// Record Formatting
// =============================================================================

/// Application tag written into `AP[]`.
pub const APP_NAME: &str = "baduk-rust";

/// Name recorded for the human player.
pub const HUMAN_NAME: &str = "Player";

/// Prefix of the name recorded for the engine, followed by its level.
pub const ENGINE_NAME_PREFIX: &str = "GnuGo Level ";

/// Result token for an unknown or unparseable outcome.
pub const UNKNOWN_RESULT: &str = "?";

/// Extension of record files in the history directory.
pub const RECORD_EXTENSION: &str = "sgf";

/// Timestamp layout used in record file names.
pub const RECORD_NAME_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Date layout used in the `DT[]` property.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";
