//! Engine session: one external GTP engine driving one game.
//!
//! The session owns the engine process and the turn state machine:
//!
//! ```text
//! Connecting -> { HumanTurn <-> EngineTurn } -> Finished
//! ```
//!
//! All engine traffic and every turn-state change happens while holding a
//! single mutex, so exactly one GTP request is in flight at a time. Move and
//! game-end callbacks run after the mutex is released, which lets a callback
//! call straight back into the session.
//!
//! The engine's own moves are always computed on a background thread spawned
//! after the human's move (and its callback) has completed, so callbacks
//! arrive in game order and the caller never blocks on engine thinking.
//!
//! Board state is updated optimistically from the move itself and then
//! re-read from the engine with `list_stones` after every move and undo, so
//! captures are always the engine's verdict. If that read fails the move
//! still counts: callbacks fire, the turn passes, and the error is returned
//! afterwards with the local board in place.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{Span, debug, error, info, info_span, warn};

use crate::board::{Board, Color, Move, PlayedMove, Point};
use crate::config::GameConfig;
use crate::constants::PASSES_TO_END;
use crate::coords::{Vertex, from_vertex, move_to_vertex, to_vertex};
use crate::error::{GtpError, SessionError};
use crate::gtp::{GtpClient, ProcessTransport, Transport};
use crate::reader::{self, Setup};
use crate::state::{BoardState, Phase};

/// Where the game currently stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    Connecting,
    Human,
    Engine,
    Finished,
}

/// A move that has just been played, by either side.
#[derive(Clone, Debug)]
pub struct MoveEvent {
    pub color: Color,
    pub mv: Move,
    /// Board after the move. Owned by the receiver.
    pub state: BoardState,
}

type MoveCallback = Arc<dyn Fn(&MoveEvent) + Send + Sync>;
type EndCallback = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&SessionError) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_move: Option<MoveCallback>,
    on_end: Option<EndCallback>,
    on_error: Option<ErrorCallback>,
}

/// Record a resumed game was loaded from.
#[derive(Clone)]
struct Base {
    record: PathBuf,
    /// Stones on the board before the first entry of the history. `None`
    /// when the record could not be read at resume time.
    setup: Option<Setup>,
}

impl Base {
    /// The setup, provided the record on disk still carries it unchanged.
    fn verified_setup(&self) -> Result<&Setup, SessionError> {
        let unavailable = |message: String| SessionError::BaseUnavailable {
            path: self.record.clone(),
            message,
        };
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| unavailable("record was unreadable when resumed".to_string()))?;
        let current = reader::parse_setup(&self.record).map_err(|e| unavailable(e.to_string()))?;
        if current != *setup {
            return Err(unavailable("setup stones changed on disk".to_string()));
        }
        Ok(setup)
    }
}

/// State guarded by the session lock.
struct Inner {
    client: Option<GtpClient>,
    state: BoardState,
    /// Set when the game was resumed from a record.
    base: Option<Base>,
    history: Vec<PlayedMove>,
    my_turn: bool,
    pass_count: u32,
    game_over: bool,
    closed: bool,
}

/// What to do once the lock has been released.
enum After {
    /// Hand the turn to the engine.
    EngineTurn,
    /// The human is to move; nothing to schedule.
    HumanTurn,
    /// Two passes: ask the engine for the score, then announce the end.
    Score,
    /// Game over with a known outcome.
    Ended(String),
}

struct Shared {
    config: GameConfig,
    span: Span,
    inner: Mutex<Inner>,
    callbacks: Mutex<Callbacks>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to an engine session. Clones share the same session.
#[derive(Clone)]
pub struct EngineSession {
    shared: Arc<Shared>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read the engine's authoritative stone positions.
fn fetch_board(client: &mut GtpClient, size: usize) -> Result<Board, SessionError> {
    let mut board = Board::new(size);
    for color in [Color::Black, Color::White] {
        for vertex in client.list_stones(color)? {
            match from_vertex(&vertex, size)? {
                Vertex::Point(x, y) => board.set(x, y, Some(color)),
                Vertex::Pass | Vertex::Resign => {
                    return Err(GtpError::Malformed {
                        command: format!("list_stones {}", color.gtp_name()),
                        response: vertex,
                    }
                    .into());
                }
            }
        }
    }
    Ok(board)
}

fn trailing_passes(history: &[PlayedMove]) -> u32 {
    history
        .iter()
        .rev()
        .take_while(|m| m.mv == Move::Pass)
        .count() as u32
}

fn illegal_or_protocol(e: GtpError) -> SessionError {
    match e {
        GtpError::Engine { message, .. } => SessionError::IllegalMove(message),
        other => SessionError::Protocol(other),
    }
}

impl Inner {
    fn check_human_turn(&self) -> Result<(), SessionError> {
        if self.closed || self.client.is_none() {
            return Err(SessionError::NotConnected);
        }
        if self.game_over {
            return Err(SessionError::GameOver);
        }
        if !self.my_turn {
            return Err(SessionError::NotYourTurn);
        }
        Ok(())
    }

    fn client(&mut self) -> Result<&mut GtpClient, SessionError> {
        self.client.as_mut().ok_or(SessionError::NotConnected)
    }

    /// Record a completed move with the engine-confirmed board and flip the
    /// turn. Returns the event for the move callback.
    fn apply(&mut self, played: PlayedMove, board: Board, human: Color) -> MoveEvent {
        self.state.board = board;
        self.state.move_number += 1;
        self.state.to_move = played.color.opponent();
        self.state.last_move = played.mv.point();
        self.history.push(played);
        match played.mv {
            Move::Pass => self.pass_count += 1,
            Move::Place(_) => self.pass_count = 0,
        }
        self.my_turn = self.state.to_move == human;
        if self.pass_count >= PASSES_TO_END {
            self.game_over = true;
            self.state.phase = Phase::Finished;
        }
        MoveEvent {
            color: played.color,
            mv: played.mv,
            state: self.state.clone(),
        }
    }

    fn finish(&mut self, outcome: &str) {
        self.game_over = true;
        self.state.phase = Phase::Finished;
        self.state.outcome = Some(outcome.to_string());
    }

    /// Re-read the board after a move the engine accepted. When the engine
    /// cannot be read the optimistic local board is kept and the error is
    /// returned alongside, to be reported once the move has been applied.
    fn resync(&mut self, size: usize) -> (Board, Option<SessionError>) {
        let fetched = match self.client.as_mut() {
            Some(client) => fetch_board(client, size),
            None => Err(SessionError::NotConnected),
        };
        match fetched {
            Ok(board) => (board, None),
            Err(e) => {
                warn!(error = %e, "board resync failed, keeping local board");
                (self.state.board.clone(), Some(e))
            }
        }
    }

    /// Position after `moves`, computed without the engine. `None` when a
    /// resumed game's setup is unknown.
    fn local_board(&self, size: usize, moves: &[PlayedMove]) -> Option<Board> {
        let mut board = Board::new(size);
        if let Some(base) = &self.base {
            let setup = base.setup.as_ref()?;
            for &(x, y) in &setup.black {
                board.set(x, y, Some(Color::Black));
            }
            for &(x, y) in &setup.white {
                board.set(x, y, Some(Color::White));
            }
        }
        for m in moves {
            if let Move::Place((x, y)) = m.mv {
                board.place(x, y, m.color);
            }
        }
        Some(board)
    }

    /// Rebuild turn state from `history` and a board read from the engine.
    fn rebase(&mut self, history: Vec<PlayedMove>, board: Board, human: Color) {
        self.state.board = board;
        self.state.move_number = history.len();
        self.state.last_move = history.last().and_then(|m| m.mv.point());
        self.state.to_move = history
            .last()
            .map(|m| m.color.opponent())
            .unwrap_or(Color::Black);
        self.pass_count = trailing_passes(&history);
        self.history = history;
        self.my_turn = self.state.to_move == human;
    }
}

impl EngineSession {
    /// Create a session that logs under a fresh `engine_session` span.
    pub fn new(config: GameConfig) -> Self {
        let span = info_span!(
            "engine_session",
            size = config.board_size,
            human = %config.human_color,
            level = config.level
        );
        Self::with_span(config, span)
    }

    /// Create a session whose log events are emitted inside `span`.
    pub fn with_span(config: GameConfig, span: Span) -> Self {
        let inner = Inner {
            client: None,
            state: BoardState::new(config.board_size),
            base: None,
            history: Vec::new(),
            my_turn: false,
            pass_count: 0,
            game_over: false,
            closed: false,
        };
        Self {
            shared: Arc::new(Shared {
                config,
                span,
                inner: Mutex::new(inner),
                callbacks: Mutex::new(Callbacks::default()),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.shared.config
    }

    pub fn human_color(&self) -> Color {
        self.shared.config.human_color
    }

    fn engine_color(&self) -> Color {
        self.shared.config.engine_color()
    }

    fn size(&self) -> usize {
        self.shared.config.board_size
    }

    /// Launch the configured engine binary and set up the game.
    pub fn connect(&self) -> Result<(), SessionError> {
        let config = &self.shared.config;
        let transport = ProcessTransport::spawn(&config.engine_path, &config.engine_args())
            .map_err(|source| SessionError::Spawn {
                path: config.engine_path.clone(),
                source,
            })?;
        self.connect_with(Box::new(transport))
    }

    /// Set up the game over an already-open transport.
    ///
    /// Sends `boardsize`, `clear_board` and `komi`; when resuming a saved game
    /// also `loadsgf`, then reads back the board. If the engine is to move
    /// first its move is requested in the background.
    pub fn connect_with(&self, transport: Box<dyn Transport>) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let config = &self.shared.config;
        let human = config.human_color;

        let mut client = GtpClient::new(transport);
        client.boardsize(config.board_size)?;
        client.clear_board()?;
        client.komi(config.komi)?;

        let engine_first = {
            let mut inner = lock(&self.shared.inner);
            if inner.closed {
                return Err(SessionError::NotConnected);
            }

            match &config.load {
                Some(saved) => {
                    let path = saved.path.to_string_lossy();
                    let to_move = client.loadsgf(&path)?;
                    let board = fetch_board(&mut client, config.board_size)?;
                    let read = reader::parse_moves(&saved.path).and_then(|moves| {
                        reader::parse_setup(&saved.path).map(|setup| (moves, setup))
                    });
                    let (history, setup) = match read {
                        Ok((moves, setup)) => (moves, Some(setup)),
                        Err(e) => {
                            warn!(error = %e, "could not read move history from record");
                            (Vec::new(), None)
                        }
                    };
                    let move_count = if history.is_empty() {
                        saved.move_count
                    } else {
                        history.len()
                    };
                    let last_move = match client.last_move() {
                        Ok(Some((_, vertex))) => match from_vertex(&vertex, config.board_size)? {
                            Vertex::Point(x, y) => Some((x, y)),
                            _ => None,
                        },
                        Ok(None) => None,
                        Err(e) => {
                            debug!(error = %e, "last_move unsupported, using record");
                            history.last().and_then(|m| m.mv.point())
                        }
                    };

                    inner.rebase(history, board, human);
                    inner.base = Some(Base {
                        record: saved.path.clone(),
                        setup,
                    });
                    inner.state.move_number = move_count;
                    inner.state.last_move = last_move;
                    inner.state.to_move = to_move;
                    inner.my_turn = to_move == human;
                    info!(moves = move_count, to_move = %to_move, "resumed saved game");
                }
                None => {
                    inner.state = BoardState::new(config.board_size);
                    inner.base = None;
                    inner.history.clear();
                    inner.pass_count = 0;
                    inner.my_turn = human == Color::Black;
                    info!("new game started");
                }
            }
            inner.game_over = false;
            inner.client = Some(client);
            !inner.my_turn
        };

        if engine_first {
            self.spawn_engine_turn();
        }
        Ok(())
    }

    /// Play the human's stone at `(x, y)`.
    pub fn play_move(&self, x: usize, y: usize) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let human = self.human_color();
        let size = self.size();

        let (event, after, resync_err) = {
            let mut inner = lock(&self.shared.inner);
            inner.check_human_turn()?;
            let vertex = to_vertex(x, y, size)?;

            let client = inner.client()?;
            client.play(human, &vertex).map_err(illegal_or_protocol)?;

            inner.state.board.place(x, y, human);
            let (board, resync_err) = inner.resync(size);
            let event = inner.apply(PlayedMove::new(human, Move::Place((x, y))), board, human);
            info!(vertex = %vertex, "human move");
            (event, After::EngineTurn, resync_err)
        };

        self.dispatch(Some(event), after);
        resync_err.map_or(Ok(()), Err)
    }

    /// Pass the human's turn. A second consecutive pass ends the game.
    pub fn pass(&self) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let human = self.human_color();
        let size = self.size();

        let (event, after, resync_err) = {
            let mut inner = lock(&self.shared.inner);
            inner.check_human_turn()?;
            let client = inner.client()?;
            client.play(human, "pass").map_err(illegal_or_protocol)?;
            let (board, resync_err) = inner.resync(size);
            let event = inner.apply(PlayedMove::new(human, Move::Pass), board, human);
            info!(passes = inner.pass_count, "human pass");
            let after = if inner.game_over {
                After::Score
            } else {
                After::EngineTurn
            };
            (event, after, resync_err)
        };

        self.dispatch(Some(event), after);
        resync_err.map_or(Ok(()), Err)
    }

    /// The human resigns. No engine command is needed.
    pub fn resign(&self) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let outcome = {
            let mut inner = lock(&self.shared.inner);
            if inner.closed || inner.client.is_none() {
                return Err(SessionError::NotConnected);
            }
            if inner.game_over {
                return Err(SessionError::GameOver);
            }
            let outcome = format!("{} wins by resignation", self.engine_color());
            inner.finish(&outcome);
            info!("human resigned");
            outcome
        };
        self.dispatch(None, After::Ended(outcome));
        Ok(())
    }

    /// Take back the engine's last reply and the human's move before it.
    ///
    /// The board is re-read from the engine afterwards so that captured
    /// stones come back. Once the engine has taken both plies back the undo
    /// stands; a failed re-read then falls back to a locally replayed board
    /// and is reported as the error.
    pub fn undo(&self) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let human = self.human_color();
        let size = self.size();

        let (engine_next, resync_err) = {
            let mut inner = lock(&self.shared.inner);
            inner.check_human_turn()?;
            let played = inner.history.len();
            if played < 2 {
                return Err(SessionError::InsufficientHistory { played });
            }

            let client = inner.client()?;
            client.undo()?;
            if let Err(e) = client.undo() {
                // Put the first ply back so engine and session agree again.
                let last = inner.history[played - 1];
                let vertex = move_to_vertex(last.mv.point(), size)?;
                let client = inner.client()?;
                client.play(last.color, &vertex)?;
                return Err(e.into());
            }

            let client = inner.client()?;
            let fetched = fetch_board(client, size);
            let history = inner.history[..played - 2].to_vec();
            let (board, resync_err) = match fetched {
                Ok(board) => (board, None),
                Err(e) => {
                    warn!(error = %e, "board resync after undo failed, replaying locally");
                    let board = inner
                        .local_board(size, &history)
                        .unwrap_or_else(|| inner.state.board.clone());
                    (board, Some(e))
                }
            };
            inner.rebase(history, board, human);
            info!(moves = inner.state.move_number, "undo");
            (!inner.my_turn, resync_err)
        };

        if engine_next {
            self.spawn_engine_turn();
        }
        resync_err.map_or(Ok(()), Err)
    }

    /// Clear the engine's board and replay `moves` from the start.
    ///
    /// A resumed game starts from its record's setup stones, reloaded with
    /// `loadsgf`; if the record no longer carries them the call is refused
    /// before the engine is touched. Used to commit a planned variation. On
    /// failure the previous game is restored on the engine and the error
    /// returned.
    pub fn reset_and_replay(&self, moves: &[PlayedMove]) -> Result<(), SessionError> {
        let _enter = self.shared.span.enter();
        let human = self.human_color();
        let size = self.size();

        let vertices = moves
            .iter()
            .map(|m| move_to_vertex(m.mv.point(), size))
            .collect::<Result<Vec<_>, _>>()?;

        let (engine_next, resync_err) = {
            let mut inner = lock(&self.shared.inner);
            inner.check_human_turn()?;
            let record = match &inner.base {
                Some(base) => {
                    base.verified_setup()?;
                    Some(base.record.to_string_lossy().into_owned())
                }
                None => None,
            };

            let replay = |client: &mut GtpClient,
                          moves: &[PlayedMove],
                          vertices: &[String]|
             -> Result<(), GtpError> {
                if let Some(path) = &record {
                    client.loadsgf_until(path, 1)?;
                } else {
                    client.clear_board()?;
                }
                for (m, v) in moves.iter().zip(vertices) {
                    client.play(m.color, v)?;
                }
                Ok(())
            };

            let client = inner.client()?;
            if let Err(e) = replay(client, moves, &vertices) {
                warn!(error = %e, "replay rejected, restoring previous game");
                let previous = inner.history.clone();
                let old_vertices = previous
                    .iter()
                    .map(|m| move_to_vertex(m.mv.point(), size))
                    .collect::<Result<Vec<_>, _>>()?;
                let client = inner.client()?;
                replay(client, &previous, &old_vertices)?;
                return Err(illegal_or_protocol(e));
            }

            let client = inner.client()?;
            let (board, resync_err) = match fetch_board(client, size) {
                Ok(board) => (board, None),
                Err(e) => {
                    warn!(error = %e, "board resync after replay failed, replaying locally");
                    let board = inner
                        .local_board(size, moves)
                        .unwrap_or_else(|| inner.state.board.clone());
                    (board, Some(e))
                }
            };
            inner.rebase(moves.to_vec(), board, human);
            info!(moves = moves.len(), "replayed game");
            (!inner.my_turn, resync_err)
        };

        if engine_next {
            self.spawn_engine_turn();
        }
        resync_err.map_or(Ok(()), Err)
    }

    /// True when the human may move now.
    pub fn is_my_turn(&self) -> bool {
        let inner = lock(&self.shared.inner);
        inner.client.is_some() && inner.my_turn && !inner.game_over
    }

    pub fn turn(&self) -> Turn {
        let inner = lock(&self.shared.inner);
        if inner.game_over {
            Turn::Finished
        } else if inner.client.is_none() {
            Turn::Connecting
        } else if inner.my_turn {
            Turn::Human
        } else {
            Turn::Engine
        }
    }

    /// Independent copy of the current board state.
    pub fn board_state(&self) -> BoardState {
        lock(&self.shared.inner).state.clone()
    }

    /// Every move played so far, in order.
    pub fn history(&self) -> Vec<PlayedMove> {
        lock(&self.shared.inner).history.clone()
    }

    /// Register the callback for every move, human or engine.
    pub fn on_move(&self, callback: impl Fn(&MoveEvent) + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_move = Some(Arc::new(callback));
    }

    /// Register the callback for the end of the game.
    pub fn on_game_end(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_end = Some(Arc::new(callback));
    }

    /// Register the callback for failures of background engine turns.
    pub fn on_engine_error(&self, callback: impl Fn(&SessionError) + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_error = Some(Arc::new(callback));
    }

    /// Ask the engine for its move again, e.g. after a failed background turn.
    pub fn request_engine_move(&self) -> Result<(), SessionError> {
        {
            let inner = lock(&self.shared.inner);
            if inner.closed || inner.client.is_none() {
                return Err(SessionError::NotConnected);
            }
            if inner.game_over {
                return Err(SessionError::GameOver);
            }
            if inner.my_turn {
                return Ok(());
            }
        }
        self.spawn_engine_turn();
        Ok(())
    }

    /// Block until every background engine turn started so far has finished.
    pub fn wait_for_engine(&self) {
        let current = thread::current().id();
        loop {
            let handles: Vec<_> = std::mem::take(&mut *lock(&self.shared.workers));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if handle.thread().id() == current {
                    continue;
                }
                if handle.join().is_err() {
                    error!("engine turn thread panicked");
                }
            }
        }
    }

    /// Shut the engine down. Waits for an engine move in progress. Calling
    /// this more than once is harmless.
    pub fn close(&self) {
        let _enter = self.shared.span.enter();
        let client = {
            let mut inner = lock(&self.shared.inner);
            inner.closed = true;
            inner.client.take()
        };
        if let Some(client) = client {
            client.quit();
            info!("engine closed");
        }
        self.wait_for_engine();
        *lock(&self.shared.callbacks) = Callbacks::default();
    }

    fn spawn_engine_turn(&self) {
        let session = self.clone();
        let spawned = thread::Builder::new()
            .name("engine-turn".to_string())
            .spawn(move || {
                let _enter = session.shared.span.enter();
                if let Err(e) = session.engine_turn() {
                    error!(error = %e, "engine turn failed");
                    let callback = lock(&session.shared.callbacks).on_error.clone();
                    if let Some(cb) = callback {
                        cb(&e);
                    }
                }
            });
        match spawned {
            Ok(handle) => {
                let mut workers = lock(&self.shared.workers);
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
            }
            Err(e) => {
                error!(error = %e, "failed to start engine turn");
                let callback = lock(&self.shared.callbacks).on_error.clone();
                if let Some(cb) = callback {
                    cb(&SessionError::Protocol(GtpError::Io(e)));
                }
            }
        }
    }

    /// Ask the engine for a move and apply it exactly like a human move.
    fn engine_turn(&self) -> Result<(), SessionError> {
        let human = self.human_color();
        let color = self.engine_color();
        let size = self.size();

        let (event, after, resync_err) = {
            let mut inner = lock(&self.shared.inner);
            if inner.closed || inner.game_over || inner.my_turn {
                return Ok(());
            }
            let client = inner.client()?;
            let reply = client.genmove(color)?;

            match from_vertex(&reply, size)? {
                Vertex::Resign => {
                    let outcome = format!("{human} wins by resignation");
                    inner.finish(&outcome);
                    info!("engine resigned");
                    (None, After::Ended(outcome), None)
                }
                Vertex::Pass => {
                    let (board, resync_err) = inner.resync(size);
                    let event = inner.apply(PlayedMove::new(color, Move::Pass), board, human);
                    info!(passes = inner.pass_count, "engine pass");
                    let after = if inner.game_over {
                        After::Score
                    } else {
                        After::HumanTurn
                    };
                    (Some(event), after, resync_err)
                }
                Vertex::Point(x, y) => {
                    inner.state.board.place(x, y, color);
                    let (board, resync_err) = inner.resync(size);
                    let point: Point = (x, y);
                    let event =
                        inner.apply(PlayedMove::new(color, Move::Place(point)), board, human);
                    info!(vertex = %reply.trim(), "engine move");
                    (Some(event), After::HumanTurn, resync_err)
                }
            }
        };

        self.dispatch(event, after);
        resync_err.map_or(Ok(()), Err)
    }

    /// Request the final score and announce the end of the game.
    fn score_game(&self) {
        let outcome = {
            let mut inner = lock(&self.shared.inner);
            let score = match inner.client.as_mut() {
                Some(client) => client.final_score(),
                None => Err(GtpError::Disconnected),
            };
            let outcome = match score {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                Ok(_) => "Game ended".to_string(),
                Err(e) => {
                    warn!(error = %e, "final_score failed");
                    "Game ended".to_string()
                }
            };
            inner.finish(&outcome);
            info!(outcome = %outcome, "game over");
            outcome
        };
        self.fire_end(&outcome);
    }

    /// Fire callbacks and schedule follow-up work. Must be called without
    /// holding the session lock.
    fn dispatch(&self, event: Option<MoveEvent>, after: After) {
        if let Some(event) = event {
            let callback = lock(&self.shared.callbacks).on_move.clone();
            if let Some(cb) = callback {
                cb(&event);
            }
        }
        match after {
            After::EngineTurn => self.spawn_engine_turn(),
            After::HumanTurn => {}
            After::Score => self.score_game(),
            After::Ended(outcome) => self.fire_end(&outcome),
        }
    }

    fn fire_end(&self, outcome: &str) {
        let callback = lock(&self.shared.callbacks).on_end.clone();
        if let Some(cb) = callback {
            cb(outcome);
        }
    }
}
