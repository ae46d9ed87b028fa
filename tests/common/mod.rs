//! Shared helpers for integration tests: an in-process GTP engine.
//!
//! `FakeEngine` answers the commands the session sends, keeping its own
//! board with capture resolution. Its `genmove` replies come from a script
//! the test fills in; an empty script makes the engine pass.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use baduk_rust::board::{Board, Color, Move, PlayedMove};
use baduk_rust::config::GameConfig;
use baduk_rust::coords::{Vertex, from_vertex, to_vertex};
use baduk_rust::gtp::Transport;
use baduk_rust::reader;
use baduk_rust::session::EngineSession;

// =============================================================================
// Script shared between the test and the engine
// =============================================================================

#[derive(Default)]
pub struct ScriptState {
    /// Replies for successive `genmove` commands.
    pub genmoves: VecDeque<String>,
    /// Body of the `final_score` reply; `None` fails the command.
    pub final_score: Option<String>,
    /// Every command received, without its id.
    pub commands: Vec<String>,
    /// Reject the next command with this name.
    pub fail_next: Option<String>,
}

#[derive(Clone, Default)]
pub struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.0.lock().unwrap()
    }

    pub fn push_genmove(&self, reply: &str) {
        self.state().genmoves.push_back(reply.to_string());
    }

    pub fn set_final_score(&self, score: &str) {
        self.state().final_score = Some(score.to_string());
    }

    pub fn fail_next(&self, command: &str) {
        self.state().fail_next = Some(command.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// How many received commands start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct FakeEngine {
    board: Board,
    history: Vec<PlayedMove>,
    /// Board before each move, for `undo`.
    previous: Vec<Board>,
    script: Script,
    output: VecDeque<String>,
    quit: bool,
}

impl FakeEngine {
    pub fn new(script: Script) -> Self {
        Self {
            board: Board::new(19),
            history: Vec::new(),
            previous: Vec::new(),
            script,
            output: VecDeque::new(),
            quit: false,
        }
    }

    fn reset(&mut self, size: usize) {
        self.board = Board::new(size);
        self.history.clear();
        self.previous.clear();
    }

    fn play(&mut self, color: Color, vertex: &str) -> Result<(), String> {
        let mv = match from_vertex(vertex, self.board.size()) {
            Ok(Vertex::Point(x, y)) => {
                if self.board.get(x, y).is_some() {
                    return Err("illegal move".to_string());
                }
                Move::Place((x, y))
            }
            Ok(Vertex::Pass) => Move::Pass,
            _ => return Err("invalid coordinate".to_string()),
        };
        self.previous.push(self.board.clone());
        if let Move::Place((x, y)) = mv {
            self.board.place(x, y, color);
        }
        self.history.push(PlayedMove::new(color, mv));
        Ok(())
    }

    /// Setup stones plus the first `moves` moves of a record.
    fn load_until(&mut self, path: &Path, moves: usize) -> (bool, String) {
        let (Ok(setup), Ok(record)) = (reader::parse_setup(path), reader::parse_moves(path)) else {
            return (false, "cannot open or parse".to_string());
        };
        let size = self.board.size();
        self.reset(size);
        for (x, y) in setup.black {
            self.board.set(x, y, Some(Color::Black));
        }
        for (x, y) in setup.white {
            self.board.set(x, y, Some(Color::White));
        }
        let mut next = Color::Black;
        for m in record.into_iter().take(moves) {
            if let Move::Place((x, y)) = m.mv {
                self.board.place(x, y, m.color);
            }
            self.history.push(m);
            next = m.color.opponent();
        }
        (true, next.gtp_name().to_string())
    }

    fn stones(&self, color: Color) -> String {
        self.board
            .stones()
            .filter(|(_, c)| *c == color)
            .filter_map(|((x, y), _)| to_vertex(x, y, self.board.size()).ok())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "quit" => {
                self.quit = true;
                (true, String::new())
            }

            "boardsize" => match args.first().and_then(|a| a.parse::<usize>().ok()) {
                Some(size) => {
                    self.reset(size);
                    (true, String::new())
                }
                None => (false, "unacceptable size".to_string()),
            },

            "clear_board" => {
                let size = self.board.size();
                self.reset(size);
                (true, String::new())
            }

            "komi" => match args.first().and_then(|a| a.parse::<f64>().ok()) {
                Some(_) => (true, String::new()),
                None => (false, "syntax error".to_string()),
            },

            "play" => {
                let (Some(color), Some(vertex)) =
                    (args.first().and_then(|c| Color::from_gtp(c)), args.get(1))
                else {
                    return (false, "syntax error".to_string());
                };
                match self.play(color, vertex) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e),
                }
            }

            "genmove" => {
                let Some(color) = args.first().and_then(|c| Color::from_gtp(c)) else {
                    return (false, "syntax error".to_string());
                };
                let reply = self
                    .script
                    .state()
                    .genmoves
                    .pop_front()
                    .unwrap_or_else(|| "pass".to_string());
                if reply.eq_ignore_ascii_case("resign") {
                    return (true, reply);
                }
                // Malformed scripted replies are passed through untouched.
                if self.play(color, &reply).is_err()
                    && from_vertex(&reply, self.board.size()).is_ok()
                {
                    return (false, "scripted move is illegal".to_string());
                }
                (true, reply)
            }

            "list_stones" => match args.first().and_then(|c| Color::from_gtp(c)) {
                Some(color) => (true, self.stones(color)),
                None => (false, "syntax error".to_string()),
            },

            "undo" => match self.previous.pop() {
                Some(board) => {
                    self.board = board;
                    self.history.pop();
                    (true, String::new())
                }
                None => (false, "cannot undo".to_string()),
            },

            "last_move" => match self.history.last() {
                Some(m) => {
                    let vertex = match m.mv {
                        Move::Place((x, y)) => {
                            to_vertex(x, y, self.board.size()).unwrap_or_default()
                        }
                        Move::Pass => "pass".to_string(),
                    };
                    (true, format!("{} {vertex}", m.color.gtp_name()))
                }
                None => (false, "no previous move known".to_string()),
            },

            "final_score" => match self.script.state().final_score.clone() {
                Some(score) => (true, score),
                None => (false, "cannot score".to_string()),
            },

            "loadsgf" => {
                let Some(path) = args.first().map(Path::new) else {
                    return (false, "missing filename".to_string());
                };
                match args.get(1) {
                    None => match reader::replay_to_end(path) {
                        Ok(replay) => {
                            let moves = reader::parse_moves(path).unwrap_or_default();
                            self.board = replay.board;
                            self.history = moves;
                            self.previous.clear();
                            (true, replay.next_color.gtp_name().to_string())
                        }
                        Err(_) => (false, "cannot open or parse".to_string()),
                    },
                    Some(until) => match until.parse::<usize>() {
                        Ok(n) if n >= 1 => self.load_until(path, n - 1),
                        _ => (false, "invalid move number".to_string()),
                    },
                }
            }

            _ => (false, "unknown command".to_string()),
        }
    }
}

impl Transport for FakeEngine {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.quit {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let mut parts = line.split_whitespace();
        let first = parts.next().unwrap_or("");
        let (id, command) = match first.parse::<u32>() {
            Ok(id) => (Some(id), parts.next().unwrap_or("")),
            Err(_) => (None, first),
        };
        let args: Vec<&str> = parts.collect();

        let full = std::iter::once(command)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let rejected = {
            let mut state = self.script.state();
            state.commands.push(full);
            if state.fail_next.as_deref() == Some(command) {
                state.fail_next = None;
                true
            } else {
                false
            }
        };

        let (success, body) = if rejected {
            (false, "scripted failure".to_string())
        } else {
            self.execute(command, &args)
        };

        let marker = if success { '=' } else { '?' };
        let id = id.map(|i| i.to_string()).unwrap_or_default();
        if body.is_empty() {
            self.output.push_back(format!("{marker}{id}"));
        } else {
            self.output.push_back(format!("{marker}{id} {body}"));
        }
        self.output.push_back(String::new());
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.output.pop_front())
    }
}

// =============================================================================
// Session helpers
// =============================================================================

pub fn game_config(size: usize, human: Color) -> GameConfig {
    GameConfig {
        board_size: size,
        komi: 6.5,
        human_color: human,
        ..GameConfig::default()
    }
}

/// A session connected to a fresh fake engine.
pub fn connected(config: GameConfig) -> (EngineSession, Script) {
    let script = Script::default();
    let session = connected_with(config, &script);
    (session, script)
}

/// Connect using a script the test has already filled in.
pub fn connected_with(config: GameConfig, script: &Script) -> EngineSession {
    let session = EngineSession::new(config);
    session
        .connect_with(Box::new(FakeEngine::new(script.clone())))
        .expect("connect to fake engine");
    session
}

/// Collects move events and the game outcome from a session.
#[derive(Clone, Default)]
pub struct Events {
    pub moves: Arc<Mutex<Vec<PlayedMove>>>,
    pub outcome: Arc<Mutex<Option<String>>>,
}

impl Events {
    pub fn attach(session: &EngineSession) -> Self {
        let events = Self::default();
        let moves = Arc::clone(&events.moves);
        session.on_move(move |e| moves.lock().unwrap().push(PlayedMove::new(e.color, e.mv)));
        let outcome = Arc::clone(&events.outcome);
        session.on_game_end(move |o| *outcome.lock().unwrap() = Some(o.to_string()));
        events
    }

    pub fn moves(&self) -> Vec<PlayedMove> {
        self.moves.lock().unwrap().clone()
    }

    pub fn outcome(&self) -> Option<String> {
        self.outcome.lock().unwrap().clone()
    }
}
