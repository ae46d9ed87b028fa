//! Board snapshot handed to the UI layer.

use crate::board::{Board, Color, Point};

/// Whether the game is still in progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing,
    Finished,
}

/// Complete board state at one moment of a game.
///
/// Snapshots are produced fresh on every state change and are never mutated
/// by the session afterwards. Cloning copies the whole grid, so a holder may
/// keep or modify its copy freely.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardState {
    pub board: Board,
    /// Number of moves played so far, passes included.
    pub move_number: usize,
    pub to_move: Color,
    pub phase: Phase,
    /// Most recent stone placed; `None` at the start or after a pass.
    pub last_move: Option<Point>,
    /// Outcome text once the game has finished.
    pub outcome: Option<String>,
}

impl BoardState {
    pub fn new(size: usize) -> Self {
        Self {
            board: Board::new(size),
            move_number: 0,
            to_move: Color::Black,
            phase: Phase::Playing,
            last_move: None,
            outcome: None,
        }
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = BoardState::new(13);
        assert_eq!(state.size(), 13);
        assert_eq!(state.to_move, Color::Black);
        assert_eq!(state.last_move, None);
        assert!(!state.is_finished());
    }

    #[test]
    fn test_clone_does_not_alias() {
        let state = BoardState::new(9);
        let mut copy = state.clone();
        copy.board.place(4, 4, Color::Black);
        assert_eq!(state.board.get(4, 4), None);
        assert_eq!(copy.board.get(4, 4), Some(Color::Black));
    }
}
