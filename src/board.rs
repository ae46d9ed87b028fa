//! Plain 2D board with capture resolution.
//!
//! This is not a rules engine: it places stones and removes groups left
//! without liberties. Legality (ko, superko, scoring) belongs to the external
//! engine. Record replay and the planning overlay both build on it.

use std::collections::VecDeque;
use std::fmt;

/// Stone colour. Black always moves first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Colour name as GTP spells it.
    pub fn gtp_name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }

    /// Parse a GTP colour (`black`, `b`, `white`, `w`; any case).
    pub fn from_gtp(s: &str) -> Option<Color> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" | "b" => Some(Color::Black),
            "white" | "w" => Some(Color::White),
            _ => None,
        }
    }

    /// Property letter used in SGF move nodes.
    pub fn sgf_letter(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Zero-indexed `(x, y)` with the origin at the top-left corner.
pub type Point = (usize, usize);

/// A single move: a stone placement or a pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    Place(Point),
    Pass,
}

impl Move {
    pub fn point(self) -> Option<Point> {
        match self {
            Move::Place(p) => Some(p),
            Move::Pass => None,
        }
    }
}

/// A move together with the colour that played it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlayedMove {
    pub color: Color,
    pub mv: Move,
}

impl PlayedMove {
    pub fn new(color: Color, mv: Move) -> Self {
        Self { color, mv }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Color>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    pub fn contains(&self, (x, y): Point) -> bool {
        x < self.size && y < self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells[self.idx(x, y)]
    }

    /// Overwrite a single intersection. Out-of-range points are ignored.
    pub fn set(&mut self, x: usize, y: usize, stone: Option<Color>) {
        if x < self.size && y < self.size {
            let i = self.idx(x, y);
            self.cells[i] = stone;
        }
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Iterate over all stones as `(point, colour)`, row by row.
    pub fn stones(&self) -> impl Iterator<Item = (Point, Color)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.map(|color| ((i % self.size, i / self.size), color))
        })
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = Point> + '_ {
        let s = self.size;
        let mut v = Vec::with_capacity(4);
        if x > 0 {
            v.push((x - 1, y));
        }
        if x + 1 < s {
            v.push((x + 1, y));
        }
        if y > 0 {
            v.push((x, y - 1));
        }
        if y + 1 < s {
            v.push((x, y + 1));
        }
        v.into_iter()
    }

    /// Place a stone and remove adjacent opposing groups left without
    /// liberties. The placed stone stays even if its own group has no
    /// liberties afterwards. Returns the number of stones captured.
    pub fn place(&mut self, x: usize, y: usize, color: Color) -> usize {
        if !self.contains((x, y)) {
            return 0;
        }
        let idx = self.idx(x, y);
        self.cells[idx] = Some(color);

        let opp = color.opponent();
        let mut to_remove: Vec<Point> = Vec::new();
        for (nx, ny) in self.neighbors(x, y) {
            if self.get(nx, ny) == Some(opp)
                && !to_remove.contains(&(nx, ny))
                && !self.has_liberty(nx, ny)
            {
                self.collect_group(nx, ny, &mut to_remove);
            }
        }
        for &(rx, ry) in &to_remove {
            let i = self.idx(rx, ry);
            self.cells[i] = None;
        }
        to_remove.len()
    }

    /// Like [`Board::place`] but refuses occupied points and suicide,
    /// leaving the board untouched. Returns the captures on success.
    pub fn try_place(&mut self, x: usize, y: usize, color: Color) -> Option<usize> {
        if !self.contains((x, y)) || self.get(x, y).is_some() {
            return None;
        }
        let before = self.clone();
        let captures = self.place(x, y, color);
        if !self.has_liberty(x, y) {
            *self = before;
            return None;
        }
        Some(captures)
    }

    /// Whether the group containing `(x, y)` touches at least one empty point.
    /// Empty points report `false`.
    pub fn has_liberty(&self, x: usize, y: usize) -> bool {
        let Some(color) = self.get(x, y) else {
            return false;
        };
        let mut visited = vec![false; self.size * self.size];
        let mut queue = VecDeque::from([(x, y)]);
        visited[self.idx(x, y)] = true;
        while let Some((cx, cy)) = queue.pop_front() {
            for (nx, ny) in self.neighbors(cx, cy) {
                let ni = self.idx(nx, ny);
                match self.cells[ni] {
                    None => return true,
                    Some(c) if c == color && !visited[ni] => {
                        visited[ni] = true;
                        queue.push_back((nx, ny));
                    }
                    _ => {}
                }
            }
        }
        false
    }

    /// Append every stone of the group at `(x, y)` to `out`.
    fn collect_group(&self, x: usize, y: usize, out: &mut Vec<Point>) {
        let Some(color) = self.get(x, y) else {
            return;
        };
        let mut visited = vec![false; self.size * self.size];
        let mut queue = VecDeque::from([(x, y)]);
        visited[self.idx(x, y)] = true;
        while let Some((cx, cy)) = queue.pop_front() {
            out.push((cx, cy));
            for (nx, ny) in self.neighbors(cx, cy) {
                let ni = self.idx(nx, ny);
                if !visited[ni] && self.cells[ni] == Some(color) {
                    visited[ni] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.size {
            for x in 0..self.size {
                let ch = match self.get(x, y) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_stone_capture() {
        let mut board = Board::new(9);
        board.place(0, 0, Color::Black);
        board.place(1, 0, Color::White);
        board.place(2, 0, Color::Black);
        let captured = board.place(1, 1, Color::Black);

        assert_eq!(captured, 1);
        assert_eq!(board.get(1, 0), None);
        assert_eq!(board.get(0, 0), Some(Color::Black));
        assert_eq!(board.get(2, 0), Some(Color::Black));
        assert_eq!(board.get(1, 1), Some(Color::Black));
    }

    #[test]
    fn test_group_capture() {
        let mut board = Board::new(5);
        // White pair on the top edge, surrounded by black
        board.place(1, 0, Color::White);
        board.place(2, 0, Color::White);
        board.place(0, 0, Color::Black);
        board.place(3, 0, Color::Black);
        board.place(1, 1, Color::Black);
        let captured = board.place(2, 1, Color::Black);

        assert_eq!(captured, 2);
        assert_eq!(board.get(1, 0), None);
        assert_eq!(board.get(2, 0), None);
    }

    #[test]
    fn test_place_keeps_suicide_stone() {
        let mut board = Board::new(5);
        board.place(1, 0, Color::Black);
        board.place(0, 1, Color::Black);
        board.place(0, 0, Color::White);

        assert_eq!(board.get(0, 0), Some(Color::White));
        assert!(!board.has_liberty(0, 0));
    }

    #[test]
    fn test_try_place_rejects_suicide_and_occupied() {
        let mut board = Board::new(5);
        board.place(1, 0, Color::Black);
        board.place(0, 1, Color::Black);

        assert_eq!(board.try_place(0, 0, Color::White), None);
        assert_eq!(board.get(0, 0), None);
        assert_eq!(board.try_place(1, 0, Color::White), None);
        assert_eq!(board.try_place(2, 2, Color::White), Some(0));
    }

    #[test]
    fn test_capture_beats_suicide() {
        let mut board = Board::new(5);
        // Both black stones are in atari; white fills (0,0) and takes them
        board.place(1, 0, Color::Black);
        board.place(0, 1, Color::Black);
        board.place(2, 0, Color::White);
        board.place(1, 1, Color::White);
        board.place(0, 2, Color::White);

        assert_eq!(board.try_place(0, 0, Color::White), Some(2));
        assert_eq!(board.get(1, 0), None);
        assert_eq!(board.get(0, 1), None);
    }

    #[test]
    fn test_large_group_liberties() {
        let mut board = Board::new(19);
        for x in 0..19 {
            for y in 0..18 {
                board.set(x, y, Some(Color::Black));
            }
        }
        assert!(board.has_liberty(0, 0));
        for x in 0..19 {
            board.set(x, 18, Some(Color::White));
        }
        board.set(18, 18, None);
        let captured = board.place(18, 18, Color::White);
        assert_eq!(captured, 19 * 18);
        assert_eq!(board.stone_count(), 19);
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(3);
        board.place(0, 0, Color::Black);
        board.place(2, 2, Color::White);
        assert_eq!(board.to_string(), "X . . \n. . . \n. . O \n");
    }
}
