//! Conversion between board points and GTP vertices.
//!
//! GTP coordinates use letters A-Z (skipping I) for columns and numbers for
//! rows counted from the bottom edge, so `A1` is the bottom-left corner. Board
//! points are zero-indexed `(x, y)` from the top-left corner. Every
//! conversion inverts the row axis and skips `I` in both directions.
//!
//! SGF coordinates are a different encoding entirely; see [`crate::sgf`].

use crate::board::Point;
use crate::constants::{GTP_COLUMNS, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::error::CoordError;

/// A decoded GTP vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Vertex {
    Point(usize, usize),
    Pass,
    Resign,
}

fn check_size(size: usize) -> Result<(), CoordError> {
    if (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(CoordError::UnsupportedSize(size))
    }
}

/// Convert a board point to a GTP vertex, e.g. `(3, 15)` on 19x19 -> `"D4"`.
pub fn to_vertex(x: usize, y: usize, size: usize) -> Result<String, CoordError> {
    check_size(size)?;
    if x >= size || y >= size {
        return Err(CoordError::OutOfRange { x, y, size });
    }
    let col = GTP_COLUMNS[x] as char;
    Ok(format!("{col}{}", size - y))
}

/// Convert a point to a vertex, `None` meaning pass.
pub fn move_to_vertex(point: Option<Point>, size: usize) -> Result<String, CoordError> {
    match point {
        Some((x, y)) => to_vertex(x, y, size),
        None => Ok("pass".to_string()),
    }
}

/// Parse a GTP vertex (`"D4"`, `"pass"`, `"resign"`; any case).
pub fn from_vertex(vertex: &str, size: usize) -> Result<Vertex, CoordError> {
    check_size(size)?;
    let v = vertex.trim();
    if v.eq_ignore_ascii_case("pass") {
        return Ok(Vertex::Pass);
    }
    if v.eq_ignore_ascii_case("resign") {
        return Ok(Vertex::Resign);
    }

    let bytes = v.as_bytes();
    if bytes.len() < 2 {
        return Err(CoordError::Malformed(vertex.to_string()));
    }

    let col_char = bytes[0].to_ascii_uppercase();
    let col = GTP_COLUMNS
        .iter()
        .position(|&c| c == col_char)
        .ok_or_else(|| CoordError::Malformed(vertex.to_string()))?;

    let digits = &v[1..];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoordError::Malformed(vertex.to_string()));
    }
    let row: usize = digits
        .parse()
        .map_err(|_| CoordError::Malformed(vertex.to_string()))?;

    if col >= size || row == 0 || row > size {
        return Err(CoordError::VertexOutOfRange {
            vertex: vertex.to_string(),
            size,
        });
    }

    Ok(Vertex::Point(col, size - row))
}
