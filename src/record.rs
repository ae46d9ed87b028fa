//! Incremental, crash-safe SGF game record.
//!
//! The record keeps the whole game in memory and rewrites its file after
//! every mutation. The full document goes to a hidden `.<name>.tmp` sibling,
//! is synced with `sync_all`, and then renamed over the record. The file on
//! disk is therefore a complete SGF document after every successful call,
//! and a crash loses at most the call in flight.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::board::{Board, Color, Move, PlayedMove, Point};
use crate::constants::{
    APP_NAME, ENGINE_NAME_PREFIX, HUMAN_NAME, RECORD_DATE_FORMAT, RECORD_EXTENSION,
    RECORD_NAME_FORMAT,
};
use crate::error::RecordError;
use crate::reader::GameDocument;
use crate::sgf::{encode_move, escape_text, normalize_result, point_to_sgf};

/// Moves written per line of the document.
const MOVES_PER_LINE: usize = 10;

/// Attempts at finding a free file name within one second.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Setup { black: Vec<Point>, white: Vec<Point> },
    Move(PlayedMove),
}

/// An SGF file being written while a game is played.
#[derive(Debug)]
pub struct GameRecord {
    path: PathBuf,
    open: bool,
    board_size: usize,
    komi: f64,
    player_black: String,
    player_white: String,
    date: String,
    result: String,
    entries: Vec<Entry>,
}

impl GameRecord {
    /// Start a new record in `dir`, named after the current local time.
    ///
    /// The directory is created if needed. The header is written before
    /// this returns.
    pub fn create(
        dir: &Path,
        board_size: usize,
        komi: f64,
        human_color: Color,
        engine_level: u8,
    ) -> Result<Self, RecordError> {
        fs::create_dir_all(dir).map_err(|source| RecordError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let now = Local::now();
        let stem = format!("{}_{board_size}x{board_size}", now.format(RECORD_NAME_FORMAT));
        let path = create_unique(dir, &stem)?;

        let engine_name = format!("{ENGINE_NAME_PREFIX}{engine_level}");
        let (player_black, player_white) = match human_color {
            Color::Black => (HUMAN_NAME.to_string(), engine_name),
            Color::White => (engine_name, HUMAN_NAME.to_string()),
        };

        let record = Self {
            path,
            open: true,
            board_size,
            komi,
            player_black,
            player_white,
            date: now.format(RECORD_DATE_FORMAT).to_string(),
            result: String::new(),
            entries: Vec::new(),
        };
        record.flush()?;
        info!(path = %record.path.display(), "created game record");
        Ok(record)
    }

    /// Continue recording into an existing file.
    ///
    /// The document is re-rendered in this module's layout on the next
    /// mutation: setup stones come first, variations and unknown properties
    /// are dropped.
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        let content = fs::read_to_string(path).map_err(|source| RecordError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source,
        })?;
        let doc = GameDocument::parse(&content)?;
        let header = doc.info(path)?;
        let setup = doc.setup()?;

        let mut entries = Vec::new();
        if !setup.black.is_empty() || !setup.white.is_empty() {
            entries.push(Entry::Setup {
                black: setup.black,
                white: setup.white,
            });
        }
        entries.extend(doc.moves()?.into_iter().map(Entry::Move));

        OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| RecordError::Io {
                operation: "open",
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), entries = entries.len(), "reopened game record");
        Ok(Self {
            path: path.to_path_buf(),
            open: true,
            board_size: header.board_size,
            komi: header.komi,
            player_black: header.player_black,
            player_white: header.player_white,
            date: header.date,
            result: header.result,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_closed(&self) -> bool {
        !self.open
    }

    /// Moves recorded so far, in order.
    pub fn moves(&self) -> Vec<PlayedMove> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Move(m) => Some(*m),
                Entry::Setup { .. } => None,
            })
            .collect()
    }

    pub fn add_move(&mut self, mv: Move, color: Color) -> Result<(), RecordError> {
        self.ensure_open()?;
        if let Move::Place(p) = mv {
            self.check_point(p)?;
        }
        self.entries.push(Entry::Move(PlayedMove::new(color, mv)));
        self.flush()
    }

    /// Record every stone of `board` as a setup node. An empty board adds
    /// nothing.
    pub fn add_setup_position(&mut self, board: &Board) -> Result<(), RecordError> {
        self.ensure_open()?;
        let mut black = Vec::new();
        let mut white = Vec::new();
        for (p, color) in board.stones() {
            self.check_point(p)?;
            match color {
                Color::Black => black.push(p),
                Color::White => white.push(p),
            }
        }
        if black.is_empty() && white.is_empty() {
            return Ok(());
        }
        self.entries.push(Entry::Setup { black, white });
        self.flush()
    }

    /// Store the game result, normalised to an `RE[]` token.
    pub fn set_result(&mut self, outcome: &str) -> Result<(), RecordError> {
        self.ensure_open()?;
        self.result = normalize_result(outcome);
        self.flush()
    }

    /// Drop the last `n` moves; asking for more than were played drops all.
    pub fn undo_moves(&mut self, n: usize) -> Result<(), RecordError> {
        self.ensure_open()?;
        let mut remaining = n;
        while remaining > 0 {
            let Some(idx) = self
                .entries
                .iter()
                .rposition(|e| matches!(e, Entry::Move(_)))
            else {
                break;
            };
            self.entries.remove(idx);
            remaining -= 1;
        }
        self.flush()
    }

    /// Stop recording. Safe to call more than once.
    pub fn close(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            debug!(path = %self.path.display(), "closed game record");
        }
    }

    fn ensure_open(&self) -> Result<(), RecordError> {
        if !self.open {
            return Err(RecordError::Closed);
        }
        Ok(())
    }

    fn check_point(&self, (x, y): Point) -> Result<(), RecordError> {
        if x >= self.board_size || y >= self.board_size {
            return Err(RecordError::OutOfRange {
                x,
                y,
                size: self.board_size,
            });
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = format!(
            "(;GM[1]FF[4]CA[UTF-8]AP[{APP_NAME}:{}]SZ[{}]KM[{}]PB[{}]PW[{}]DT[{}]",
            env!("CARGO_PKG_VERSION"),
            self.board_size,
            self.komi,
            escape_text(&self.player_black),
            escape_text(&self.player_white),
            escape_text(&self.date),
        );
        if !self.result.is_empty() {
            out.push_str(&format!("RE[{}]", escape_text(&self.result)));
        }
        out.push('\n');

        let mut on_line = 0;
        for entry in &self.entries {
            match entry {
                Entry::Setup { black, white } => {
                    if on_line > 0 {
                        out.push('\n');
                    }
                    out.push(';');
                    push_point_list(&mut out, "AB", black);
                    push_point_list(&mut out, "AW", white);
                    out.push('\n');
                    on_line = 0;
                }
                Entry::Move(m) => {
                    out.push(';');
                    out.push_str(&encode_move(*m));
                    on_line += 1;
                    if on_line == MOVES_PER_LINE {
                        out.push('\n');
                        on_line = 0;
                    }
                }
            }
        }
        if on_line > 0 {
            out.push('\n');
        }
        out.push_str(")\n");
        out
    }

    fn flush(&self) -> Result<(), RecordError> {
        self.ensure_open()?;
        let content = self.render();
        let path = &self.path;
        let tmp = temp_path(path);
        let io_err = |operation: &'static str, at: &Path| {
            let at = at.to_path_buf();
            move |source: io::Error| RecordError::Io {
                operation,
                path: at,
                source,
            }
        };

        let mut file = File::create(&tmp).map_err(io_err("create", &tmp))?;
        file.write_all(content.as_bytes()).map_err(io_err("write", &tmp))?;
        file.sync_all().map_err(io_err("sync", &tmp))?;
        drop(file);
        fs::rename(&tmp, path).map_err(io_err("replace", path))?;
        debug!(path = %path.display(), bytes = content.len(), "flushed game record");
        Ok(())
    }
}

fn push_point_list(out: &mut String, ident: &str, points: &[Point]) {
    if points.is_empty() {
        return;
    }
    out.push_str(ident);
    for &p in points {
        out.push('[');
        out.push_str(&point_to_sgf(p));
        out.push(']');
    }
}

/// Hidden sibling a document is written to before it replaces `path`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Claim `<stem>.sgf`, or `<stem>-2.sgf`, `<stem>-3.sgf`, ... if taken.
fn create_unique(dir: &Path, stem: &str) -> Result<PathBuf, RecordError> {
    let mut attempt = 1;
    loop {
        let name = if attempt == 1 {
            format!("{stem}.{RECORD_EXTENSION}")
        } else {
            format!("{stem}-{attempt}.{RECORD_EXTENSION}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(source) => {
                return Err(RecordError::Io {
                    operation: "create",
                    path,
                    source,
                });
            }
        }
    }
}
