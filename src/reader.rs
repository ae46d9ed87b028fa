//! SGF game record reader.
//!
//! Two entry points with different costs:
//!
//! - [`parse_header`] reads the root metadata and counts move nodes; enough
//!   for listing and sorting many records.
//! - [`replay_to_end`] also applies every setup stone and move, resolving
//!   captures, to produce the final position.
//!
//! Only the main line is used: the first variation at every branch point.
//! Other variations are parsed for syntax and then ignored. Moves are
//! replayed as written; a record is never re-judged for legality.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::board::{Board, Color, Move, PlayedMove, Point};
use crate::constants::{RECORD_EXTENSION, SGF_DEFAULT_SIZE};
use crate::error::ParseError;
use crate::sgf::{SGF_MAX_SIZE, sgf_to_point};

/// A property identifier with its unescaped values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub ident: String,
    pub values: Vec<String>,
}

pub type Node = Vec<Property>;

/// Metadata from a record's root node.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub board_size: usize,
    pub komi: f64,
    pub player_black: String,
    pub player_white: String,
    pub date: String,
    pub result: String,
    /// Number of move nodes on the main line, passes included.
    pub move_count: usize,
}

/// Setup stones (`AB`/`AW`) found anywhere on the main line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Setup {
    pub black: Vec<Point>,
    pub white: Vec<Point>,
}

/// Final position of a replayed record.
#[derive(Debug, Clone)]
pub struct Replay {
    pub info: GameInfo,
    pub board: Board,
    pub move_count: usize,
    pub last_move: Option<Point>,
    /// Colour to play after the last move.
    pub next_color: Color,
}

// =============================================================================
// Tokenizer
// =============================================================================

/// A game tree the parser has entered but not yet closed.
struct Branch {
    main: bool,
    has_child: bool,
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            src: content.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::Syntax {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Parse the first game tree of a collection and return its main line.
    fn main_line(&mut self) -> Result<Vec<Node>, ParseError> {
        // Anything before the first '(' is ignored, as viewers do.
        while self.peek().is_some_and(|b| b != b'(') {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("no game tree found"));
        }
        let mut nodes = Vec::new();
        self.game_tree(&mut nodes)?;
        if nodes.is_empty() {
            return Err(self.error("game tree has no nodes"));
        }
        Ok(nodes)
    }

    /// `( sequence { game_tree } )`, walked with an explicit stack of open
    /// trees. Nodes go into `out` while on the main line: the first sub-tree
    /// of a main-line tree continues it, later ones are only checked.
    fn game_tree(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        let mut open: Vec<Branch> = Vec::new();
        let mut main = true;
        loop {
            self.pos += 1; // '('
            self.skip_ws();
            if self.peek() != Some(b';') {
                return Err(self.error("expected ';' to start a node"));
            }
            while self.peek() == Some(b';') {
                let node = self.node()?;
                if main {
                    out.push(node);
                }
                self.skip_ws();
            }
            open.push(Branch {
                main,
                has_child: false,
            });

            // Close finished trees until the next one opens.
            loop {
                match self.peek() {
                    Some(b'(') => {
                        if let Some(parent) = open.last_mut() {
                            main = parent.main && !parent.has_child;
                            parent.has_child = true;
                        }
                        break;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        open.pop();
                        if open.is_empty() {
                            return Ok(());
                        }
                        self.skip_ws();
                    }
                    Some(_) => return Err(self.error("unexpected character in game tree")),
                    None => return Err(self.error("unterminated game tree")),
                }
            }
        }
    }

    fn node(&mut self) -> Result<Node, ParseError> {
        self.pos += 1; // ';'
        let mut props = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b) if b.is_ascii_alphabetic() => props.push(self.property()?),
                _ => return Ok(props),
            }
        }
    }

    fn property(&mut self) -> Result<Property, ParseError> {
        // Old FF[3] files spell identifiers like "AddBlack"; only the
        // upper-case letters count.
        let mut ident = String::new();
        while let Some(b) = self.peek().filter(u8::is_ascii_alphabetic) {
            if b.is_ascii_uppercase() {
                ident.push(b as char);
            }
            self.pos += 1;
        }
        if ident.is_empty() {
            return Err(self.error("property identifier has no upper-case letters"));
        }

        let mut values = Vec::new();
        self.skip_ws();
        while self.peek() == Some(b'[') {
            values.push(self.value()?);
            self.skip_ws();
        }
        if values.is_empty() {
            return Err(self.error("property without a value"));
        }
        Ok(Property { ident, values })
    }

    fn value(&mut self) -> Result<String, ParseError> {
        self.pos += 1; // '['
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated property value")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(self.error("unterminated property value")),
                        // Escaped line break is a soft break and disappears.
                        Some(b'\n') => {
                            self.pos += 1;
                            if self.peek() == Some(b'\r') {
                                self.pos += 1;
                            }
                        }
                        Some(b'\r') => {
                            self.pos += 1;
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        Some(b) => {
                            bytes.push(b);
                            self.pos += 1;
                        }
                    }
                }
                Some(b) => {
                    bytes.push(b);
                    self.pos += 1;
                }
            }
        }
    }
}

// =============================================================================
// Parsed document
// =============================================================================

/// Main line of a parsed record.
#[derive(Debug, Clone)]
pub struct GameDocument {
    nodes: Vec<Node>,
    board_size: usize,
}

fn find<'n>(node: &'n Node, ident: &str) -> Option<&'n Property> {
    node.iter().find(|p| p.ident == ident)
}

fn text(node: &Node, ident: &str) -> String {
    find(node, ident)
        .and_then(|p| p.values.first())
        .cloned()
        .unwrap_or_default()
}

fn bad_property(ident: &str, value: &str) -> ParseError {
    ParseError::BadProperty {
        property: ident.to_string(),
        value: value.to_string(),
    }
}

fn parse_size(value: &str) -> Result<usize, ParseError> {
    let v = value.trim();
    let size = match v.split_once(':') {
        Some((cols, rows)) if cols.trim() == rows.trim() => cols.trim().parse::<usize>(),
        Some(_) => return Err(bad_property("SZ", value)),
        None => v.parse::<usize>(),
    }
    .map_err(|_| bad_property("SZ", value))?;
    if size == 0 || size > SGF_MAX_SIZE {
        return Err(bad_property("SZ", value));
    }
    Ok(size)
}

impl GameDocument {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let nodes = Parser::new(content).main_line()?;
        let root = &nodes[0];

        if let Some(gm) = find(root, "GM").and_then(|p| p.values.first()) {
            if gm.trim() != "1" {
                return Err(bad_property("GM", gm));
            }
        }
        let board_size = match find(root, "SZ").and_then(|p| p.values.first()) {
            Some(v) => parse_size(v)?,
            None => SGF_DEFAULT_SIZE,
        };

        Ok(Self { nodes, board_size })
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Root metadata. `path` is only recorded, not read.
    pub fn info(&self, path: &Path) -> Result<GameInfo, ParseError> {
        let root = self.root();
        let komi = match find(root, "KM").and_then(|p| p.values.first()) {
            Some(v) if !v.trim().is_empty() => v
                .trim()
                .parse::<f64>()
                .map_err(|_| bad_property("KM", v))?,
            _ => 0.0,
        };
        let move_count = self
            .nodes
            .iter()
            .filter(|n| find(n, "B").is_some() || find(n, "W").is_some())
            .count();

        Ok(GameInfo {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            board_size: self.board_size,
            komi,
            player_black: text(root, "PB"),
            player_white: text(root, "PW"),
            date: text(root, "DT"),
            result: text(root, "RE"),
            move_count,
        })
    }

    /// Every move on the main line, in order.
    pub fn moves(&self) -> Result<Vec<PlayedMove>, ParseError> {
        let mut moves = Vec::new();
        for node in &self.nodes {
            if let Some(m) = self.node_move(node)? {
                moves.push(m);
            }
        }
        Ok(moves)
    }

    fn node_move(&self, node: &Node) -> Result<Option<PlayedMove>, ParseError> {
        for (ident, color) in [("B", Color::Black), ("W", Color::White)] {
            if let Some(prop) = find(node, ident) {
                let value = prop.values.first().map(String::as_str).unwrap_or("");
                let mv = match sgf_to_point(value.trim(), self.board_size)? {
                    Some(p) => Move::Place(p),
                    None => Move::Pass,
                };
                return Ok(Some(PlayedMove::new(color, mv)));
            }
        }
        Ok(None)
    }

    /// Points listed by a setup property, expanding `aa:cc` rectangles.
    fn setup_points(&self, prop: &Property) -> Result<Vec<Point>, ParseError> {
        let mut points = Vec::new();
        for value in &prop.values {
            let value = value.trim();
            if let Some((from, to)) = value.split_once(':') {
                let (Some(a), Some(b)) = (
                    sgf_to_point(from, self.board_size)?,
                    sgf_to_point(to, self.board_size)?,
                ) else {
                    continue;
                };
                for y in a.1.min(b.1)..=a.1.max(b.1) {
                    for x in a.0.min(b.0)..=a.0.max(b.0) {
                        points.push((x, y));
                    }
                }
            } else if let Some(p) = sgf_to_point(value, self.board_size)? {
                points.push(p);
            }
        }
        Ok(points)
    }

    /// All `AB`/`AW` stones on the main line.
    pub fn setup(&self) -> Result<Setup, ParseError> {
        let mut setup = Setup::default();
        for node in &self.nodes {
            if let Some(p) = find(node, "AB") {
                setup.black.extend(self.setup_points(p)?);
            }
            if let Some(p) = find(node, "AW") {
                setup.white.extend(self.setup_points(p)?);
            }
        }
        Ok(setup)
    }

    /// Apply setup and moves in order, resolving captures after each move.
    pub fn replay(&self, path: &Path) -> Result<Replay, ParseError> {
        let info = self.info(path)?;
        let mut board = Board::new(self.board_size);
        let mut move_count = 0;
        let mut last_move = None;
        let mut next_color = Color::Black;

        for node in &self.nodes {
            for prop in node {
                let stone = match prop.ident.as_str() {
                    "AB" => Some(Color::Black),
                    "AW" => Some(Color::White),
                    "AE" => None,
                    _ => continue,
                };
                for (x, y) in self.setup_points(prop)? {
                    board.set(x, y, stone);
                }
            }

            if let Some(played) = self.node_move(node)? {
                move_count += 1;
                next_color = played.color.opponent();
                last_move = played.mv.point();
                if let Move::Place((x, y)) = played.mv {
                    board.place(x, y, played.color);
                }
            }
        }

        Ok(Replay {
            info,
            board,
            move_count,
            last_move,
            next_color,
        })
    }
}

// =============================================================================
// File entry points
// =============================================================================

fn read(path: &Path) -> Result<GameDocument, ParseError> {
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    GameDocument::parse(&content)
}

/// Read only the root metadata of a record.
pub fn parse_header(path: &Path) -> Result<GameInfo, ParseError> {
    read(path)?.info(path)
}

/// Replay a record to its final position.
pub fn replay_to_end(path: &Path) -> Result<Replay, ParseError> {
    read(path)?.replay(path)
}

/// Main-line moves of a record.
pub fn parse_moves(path: &Path) -> Result<Vec<PlayedMove>, ParseError> {
    read(path)?.moves()
}

/// Setup stones of a record.
pub fn parse_setup(path: &Path) -> Result<Setup, ParseError> {
    read(path)?.setup()
}

/// Headers of every record in `dir`, newest first.
///
/// Record names start with a timestamp, so newest first is file name
/// descending. Unreadable or malformed files are skipped. A missing
/// directory is an empty history.
pub fn list_games(dir: &Path) -> Result<Vec<GameInfo>, ParseError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ParseError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION))
        })
        .collect();
    paths.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut games = Vec::with_capacity(paths.len());
    for path in paths {
        match parse_header(&path) {
            Ok(info) => games.push(info),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record"),
        }
    }
    debug!(dir = %dir.display(), count = games.len(), "listed records");
    Ok(games)
}
