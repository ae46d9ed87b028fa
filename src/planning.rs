//! Planning mode: explore variations on a private copy of the board.
//!
//! A [`PlanningSession`] starts from a snapshot of the live game and never
//! touches the engine until [`PlanningSession::commit`]. Legality here is
//! only what the local board can judge (occupied points and suicide); the
//! engine gets the final word when the plan is committed.

use tracing::{debug, info};

use crate::board::{Board, Color, Move, PlayedMove};
use crate::error::PlanError;
use crate::record::GameRecord;
use crate::session::EngineSession;
use crate::state::BoardState;
use crate::tree::GameTree;

pub struct PlanningSession {
    base: Board,
    history: Vec<PlayedMove>,
    first_color: Color,
    tree: GameTree,
    board: Board,
}

impl PlanningSession {
    /// Plan from `base` (the live board), with the game's `history` so far
    /// and `to_move` playing first.
    pub fn new(base: &BoardState, history: Vec<PlayedMove>, to_move: Color) -> Self {
        Self {
            base: base.board.clone(),
            history,
            first_color: to_move,
            tree: GameTree::new(),
            board: base.board.clone(),
        }
    }

    /// Plan from the session's current position.
    pub fn from_session(session: &EngineSession) -> Self {
        let state = session.board_state();
        let to_move = state.to_move;
        Self::new(&state, session.history(), to_move)
    }

    /// Board at the cursor.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    pub fn to_move(&self) -> Color {
        self.tree.next_color(self.first_color)
    }

    /// Planned moves from the live position to the cursor.
    pub fn path_moves(&self) -> Vec<PlayedMove> {
        self.tree.path_from_root()
    }

    /// Place a stone for the side to move. Returns the stones captured.
    pub fn play(&mut self, x: usize, y: usize) -> Result<usize, PlanError> {
        let size = self.board.size();
        if x >= size || y >= size {
            return Err(PlanError::OutOfRange { x, y, size });
        }
        if self.board.get(x, y).is_some() {
            return Err(PlanError::Occupied { x, y });
        }
        let color = self.to_move();
        let captures = self
            .board
            .try_place(x, y, color)
            .ok_or(PlanError::Suicide { x, y })?;
        self.tree
            .add_move(PlayedMove::new(color, Move::Place((x, y))));
        Ok(captures)
    }

    pub fn pass(&mut self) {
        let color = self.to_move();
        self.tree.add_move(PlayedMove::new(color, Move::Pass));
    }

    pub fn back(&mut self) -> bool {
        self.navigated(|tree| tree.back())
    }

    pub fn forward(&mut self, index: usize) -> bool {
        self.navigated(|tree| tree.forward(index))
    }

    pub fn next_variation(&mut self) -> bool {
        self.navigated(GameTree::next_variation)
    }

    pub fn prev_variation(&mut self) -> bool {
        self.navigated(GameTree::prev_variation)
    }

    fn navigated(&mut self, step: impl FnOnce(&mut GameTree) -> bool) -> bool {
        let moved = step(&mut self.tree);
        if moved {
            self.rebuild();
        }
        moved
    }

    /// Replay the path onto the base snapshot.
    fn rebuild(&mut self) {
        let mut board = self.base.clone();
        for m in self.tree.path_from_root() {
            if let Move::Place((x, y)) = m.mv {
                board.place(x, y, m.color);
            }
        }
        self.board = board;
    }

    /// Apply the planned path to the live game.
    ///
    /// The engine is reset and fed the game history followed by the path.
    /// When a record is given, the path is appended to it. An empty path is
    /// a no-op.
    pub fn commit(
        self,
        session: &EngineSession,
        record: Option<&mut GameRecord>,
    ) -> Result<(), PlanError> {
        let path = self.tree.path_from_root();
        if path.is_empty() {
            debug!("nothing planned, commit skipped");
            return Ok(());
        }

        let mut moves = self.history;
        moves.extend_from_slice(&path);
        // A failed board re-read after the replay still leaves the path in
        // the game, so the record has to follow.
        let resync_err = match session.reset_and_replay(&moves) {
            Ok(()) => None,
            Err(e) if session.history() == moves => Some(e),
            Err(e) => return Err(e.into()),
        };
        info!(planned = path.len(), "plan committed");

        if let Some(record) = record {
            for m in &path {
                record.add_move(m.mv, m.color)?;
            }
        }
        resync_err.map_or(Ok(()), |e| Err(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(size: usize) -> PlanningSession {
        PlanningSession::new(&BoardState::new(size), Vec::new(), Color::Black)
    }

    #[test]
    fn test_alternating_colors() {
        let mut plan = planner(9);
        plan.play(2, 2).unwrap();
        plan.play(3, 3).unwrap();
        plan.pass();
        assert_eq!(plan.to_move(), Color::White);
        assert_eq!(plan.board().get(2, 2), Some(Color::Black));
        assert_eq!(plan.board().get(3, 3), Some(Color::White));
        assert_eq!(plan.path_moves().len(), 3);
    }

    #[test]
    fn test_rejects_occupied_and_suicide() {
        let mut plan = planner(5);
        plan.play(1, 0).unwrap(); // B
        plan.play(4, 4).unwrap(); // W
        plan.play(0, 1).unwrap(); // B
        assert!(matches!(plan.play(1, 0), Err(PlanError::Occupied { .. })));
        assert!(matches!(plan.play(0, 0), Err(PlanError::Suicide { .. })));
        assert!(matches!(plan.play(5, 0), Err(PlanError::OutOfRange { .. })));
        assert_eq!(plan.board().get(0, 0), None);
        assert_eq!(plan.to_move(), Color::White);
    }

    #[test]
    fn test_capture_and_navigation_rebuild() {
        let mut plan = planner(5);
        plan.play(0, 1).unwrap(); // B
        plan.play(0, 0).unwrap(); // W
        assert_eq!(plan.play(1, 0).unwrap(), 1); // B captures
        assert_eq!(plan.board().get(0, 0), None);

        assert!(plan.back());
        assert_eq!(plan.board().get(0, 0), Some(Color::White));
        assert_eq!(plan.board().get(1, 0), None);

        assert!(plan.forward(0));
        assert_eq!(plan.board().get(0, 0), None);
    }

    #[test]
    fn test_variations_rebuild_board() {
        let mut plan = planner(9);
        plan.play(2, 2).unwrap();
        plan.back();
        plan.play(6, 6).unwrap();
        assert_eq!(plan.board().get(2, 2), None);
        assert!(plan.prev_variation());
        assert_eq!(plan.board().get(2, 2), Some(Color::Black));
        assert_eq!(plan.board().get(6, 6), None);
    }

    #[test]
    fn test_base_position_respected() {
        let mut base = BoardState::new(9);
        base.board.set(4, 4, Some(Color::Black));
        let history = vec![PlayedMove::new(Color::Black, Move::Place((4, 4)))];
        let mut plan = PlanningSession::new(&base, history, Color::White);
        assert!(matches!(plan.play(4, 4), Err(PlanError::Occupied { .. })));
        plan.play(3, 3).unwrap();
        plan.back();
        assert_eq!(plan.board().get(4, 4), Some(Color::Black));
        assert_eq!(plan.board().get(3, 3), None);
    }
}
