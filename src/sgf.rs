//! SGF encoding shared by the record writer, reader and exploration tree.
//!
//! SGF points are two lower-case letters, column first, counted from the
//! top-left corner: `(0, 0)` is `aa`, `(3, 4)` is `de`. This is unrelated to
//! GTP vertices; use [`crate::coords`] for those.

use crate::board::{Color, Move, PlayedMove, Point};
use crate::constants::UNKNOWN_RESULT;
use crate::error::ParseError;

/// Largest board SGF letter pairs can address.
pub(crate) const SGF_MAX_SIZE: usize = 26;

/// `(3, 4)` -> `"de"`. Only valid for points below 26.
pub fn point_to_sgf((x, y): Point) -> String {
    let col = (b'a' + x as u8) as char;
    let row = (b'a' + y as u8) as char;
    format!("{col}{row}")
}

/// Parse an SGF point. An empty value, or `tt` on boards up to 19x19, is a
/// pass and yields `None`.
pub fn sgf_to_point(value: &str, size: usize) -> Result<Option<Point>, ParseError> {
    if value.is_empty() || (value == "tt" && size <= 19) {
        return Ok(None);
    }
    let bytes = value.as_bytes();
    let out_of_range = || ParseError::OutOfRange {
        coord: value.to_string(),
        size,
    };
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_lowercase) {
        return Err(out_of_range());
    }
    let x = (bytes[0] - b'a') as usize;
    let y = (bytes[1] - b'a') as usize;
    if x >= size || y >= size || size > SGF_MAX_SIZE {
        return Err(out_of_range());
    }
    Ok(Some((x, y)))
}

/// Move node body without the leading `;`, e.g. `B[dd]` or `W[]`.
pub fn encode_move(played: PlayedMove) -> String {
    let value = match played.mv {
        Move::Place(p) => point_to_sgf(p),
        Move::Pass => String::new(),
    };
    format!("{}[{value}]", played.color.sgf_letter())
}

/// Inverse of [`encode_move`]. A leading `;` is accepted.
pub fn decode_move(node: &str, size: usize) -> Result<PlayedMove, ParseError> {
    let node = node.trim().trim_start_matches(';');
    let bad = || ParseError::BadProperty {
        property: "move".to_string(),
        value: node.to_string(),
    };
    let color = match node.chars().next() {
        Some('B') => Color::Black,
        Some('W') => Color::White,
        _ => return Err(bad()),
    };
    let value = node[1..]
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(bad)?;
    let mv = match sgf_to_point(value, size)? {
        Some(p) => Move::Place(p),
        None => Move::Pass,
    };
    Ok(PlayedMove::new(color, mv))
}

/// Escape a text value for use inside `[...]`.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_score(s: &str) -> bool {
    let mut dot_seen = false;
    let mut digit_seen = false;
    for c in s.chars() {
        match c {
            '0'..='9' => digit_seen = true,
            '.' if !dot_seen => dot_seen = true,
            _ => return false,
        }
    }
    digit_seen
}

/// Whether `s` is already an `RE[]` value this crate writes or accepts.
pub fn is_canonical_result(s: &str) -> bool {
    if matches!(s, "?" | "0" | "Draw" | "Jigo" | "Void") {
        return true;
    }
    let Some(rest) = s.strip_prefix("B+").or_else(|| s.strip_prefix("W+")) else {
        return false;
    };
    matches!(rest, "R" | "T" | "F" | "?" | "Resign" | "Time" | "Forfeit") || is_score(rest)
}

/// Turn an outcome into an `RE[]` value.
///
/// Canonical values are kept as they are. Engine prose such as
/// `"White wins by 5.5 points"` or `"Black wins by resignation"` becomes
/// `W+5.5` / `B+R`. A winner without a recognisable margin gives `B+?`;
/// anything else gives `?`. A score is never invented.
pub fn normalize_result(outcome: &str) -> String {
    let o = outcome.trim();
    if is_canonical_result(o) {
        return o.to_string();
    }

    let low = o.to_ascii_lowercase();
    if low == "jigo" || low == "draw" {
        return "0".to_string();
    }

    let winner = if low.starts_with("white wins") || low.starts_with("white won") {
        'W'
    } else if low.starts_with("black wins") || low.starts_with("black won") {
        'B'
    } else {
        return UNKNOWN_RESULT.to_string();
    };

    let Some(by) = low.find(" by ") else {
        return format!("{winner}+?");
    };
    let rest = low[by + 4..].trim();

    if rest.starts_with("resign") {
        return format!("{winner}+R");
    }
    if rest.starts_with("time") {
        return format!("{winner}+T");
    }
    if rest.starts_with("forfeit") {
        return format!("{winner}+F");
    }
    match rest.split_whitespace().next() {
        Some(score) if is_score(score) => format!("{winner}+{score}"),
        _ => format!("{winner}+?"),
    }
}
