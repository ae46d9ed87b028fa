//! Record writer and reader working together on real files.

use std::fs;
use std::path::Path;

use baduk_rust::board::{Board, Color, Move, PlayedMove};
use baduk_rust::reader::{self, GameDocument};
use baduk_rust::record::GameRecord;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn new_record(dir: &Path, size: usize) -> GameRecord {
    GameRecord::create(dir, size, 6.5, Color::Black, 5).expect("create record")
}

/// Alternate colours starting with Black.
fn play_all(record: &mut GameRecord, points: &[(usize, usize)]) {
    for (i, &p) in points.iter().enumerate() {
        let color = if i % 2 == 0 { Color::Black } else { Color::White };
        record.add_move(Move::Place(p), color).unwrap();
    }
}

// =============================================================================
// Crash safety
// =============================================================================

#[test]
fn test_file_complete_after_every_move() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 19);
    let points = [(3, 3), (15, 15), (15, 3), (3, 15), (9, 9), (10, 10)];

    for (i, &p) in points.iter().enumerate() {
        let color = if i % 2 == 0 { Color::Black } else { Color::White };
        record.add_move(Move::Place(p), color).unwrap();
        // Never closed: the reader must still see a complete document.
        let info = reader::parse_header(record.path()).unwrap();
        assert_eq!(info.move_count, i + 1);
    }

    record.add_move(Move::Pass, Color::Black).unwrap();
    assert_eq!(reader::parse_header(record.path()).unwrap().move_count, 7);
}

#[test]
fn test_file_shrinks_after_undo() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 9);
    play_all(&mut record, &[(0, 0), (1, 1), (2, 2), (3, 3)]);
    let long = fs::metadata(record.path()).unwrap().len();

    record.undo_moves(2).unwrap();
    let short = fs::metadata(record.path()).unwrap().len();
    assert!(short < long);

    let content = fs::read_to_string(record.path()).unwrap();
    assert!(GameDocument::parse(&content).is_ok());
    assert!(!content.contains("cc"));
}

#[test]
fn test_stale_temp_file_never_replaces_record() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 9);
    play_all(&mut record, &[(2, 2), (6, 6)]);

    // Left behind by a write that died before its rename.
    let name = record.path().file_name().unwrap().to_string_lossy().into_owned();
    let tmp = dir.path().join(format!(".{name}.tmp"));
    fs::write(&tmp, "(;GM[1]SZ[9];B[").unwrap();
    assert_eq!(reader::parse_header(record.path()).unwrap().move_count, 2);
    let games = reader::list_games(dir.path()).unwrap();
    assert_eq!(games.len(), 1);

    record.add_move(Move::Pass, Color::Black).unwrap();
    assert!(!tmp.exists());
    assert_eq!(reader::parse_header(record.path()).unwrap().move_count, 3);
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn test_capture_on_replay() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 9);
    record.add_move(Move::Place((0, 0)), Color::Black).unwrap();
    record.add_move(Move::Place((1, 0)), Color::White).unwrap();
    record.add_move(Move::Place((2, 0)), Color::Black).unwrap();
    record.add_move(Move::Pass, Color::White).unwrap();
    record.add_move(Move::Place((1, 1)), Color::Black).unwrap();

    let replay = reader::replay_to_end(record.path()).unwrap();
    assert_eq!(replay.board.get(1, 0), None);
    assert_eq!(replay.board.get(0, 0), Some(Color::Black));
    assert_eq!(replay.board.get(2, 0), Some(Color::Black));
    assert_eq!(replay.board.get(1, 1), Some(Color::Black));
    assert_eq!(replay.board.stone_count(), 3);
    assert_eq!(replay.move_count, 5);
}

#[test]
fn test_setup_round_trip() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 9);
    let mut board = Board::new(9);
    board.set(3, 2, Some(Color::Black));
    board.set(5, 4, Some(Color::White));
    record.add_setup_position(&board).unwrap();

    let content = fs::read_to_string(record.path()).unwrap();
    assert!(content.contains(";AB[dc]AW[fe]"));

    let replay = reader::replay_to_end(record.path()).unwrap();
    assert_eq!(replay.board, board);
    assert_eq!(replay.move_count, 0);

    let setup = reader::parse_setup(record.path()).unwrap();
    assert_eq!(setup.black, vec![(3, 2)]);
    assert_eq!(setup.white, vec![(5, 4)]);
}

#[test]
fn test_moves_round_trip_with_passes() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 19);
    record.add_move(Move::Place((15, 3)), Color::Black).unwrap();
    record.add_move(Move::Pass, Color::White).unwrap();
    record.add_move(Move::Place((18, 18)), Color::Black).unwrap();

    let moves = reader::parse_moves(record.path()).unwrap();
    assert_eq!(
        moves,
        vec![
            PlayedMove::new(Color::Black, Move::Place((15, 3))),
            PlayedMove::new(Color::White, Move::Pass),
            PlayedMove::new(Color::Black, Move::Place((18, 18))),
        ]
    );
    assert_eq!(moves, record.moves());
}

#[test]
fn test_player_names_escaped() {
    let dir = temp_dir();
    let path = dir.path().join("foreign.sgf");
    fs::write(
        &path,
        "(;GM[1]FF[4]SZ[9]PB[A\\]B]PW[C\\\\D]RE[B+R];B[ee])",
    )
    .unwrap();

    let mut record = GameRecord::open(&path).unwrap();
    record.add_move(Move::Pass, Color::White).unwrap();

    let info = reader::parse_header(&path).unwrap();
    assert_eq!(info.player_black, "A]B");
    assert_eq!(info.player_white, "C\\D");
    assert_eq!(info.result, "B+R");
    assert_eq!(info.move_count, 2);
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_list_games_newest_first() {
    let dir = temp_dir();
    for name in [
        "2024-01-02_100000_9x9.sgf",
        "2024-03-01_080000_19x19.sgf",
        "2023-12-31_235959_13x13.sgf",
    ] {
        fs::write(dir.path().join(name), "(;GM[1]FF[4]SZ[9];B[aa])").unwrap();
    }
    fs::write(dir.path().join("broken.sgf"), "(;SZ[9];B[aa]").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a record").unwrap();

    let games = reader::list_games(dir.path()).unwrap();
    let names: Vec<_> = games.iter().map(|g| g.file_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "2024-03-01_080000_19x19.sgf",
            "2024-01-02_100000_9x9.sgf",
            "2023-12-31_235959_13x13.sgf",
        ]
    );
    assert!(games.iter().all(|g| g.move_count == 1));
}

#[test]
fn test_list_games_missing_dir() {
    let dir = temp_dir();
    let games = reader::list_games(&dir.path().join("nowhere")).unwrap();
    assert!(games.is_empty());
}

#[test]
fn test_list_includes_written_records() {
    let dir = temp_dir();
    let mut record = new_record(dir.path(), 13);
    play_all(&mut record, &[(3, 3), (9, 9)]);
    record.set_result("Black wins by resignation").unwrap();
    record.close();

    let games = reader::list_games(dir.path()).unwrap();
    assert_eq!(games.len(), 1);
    let g = &games[0];
    assert_eq!(g.board_size, 13);
    assert_eq!(g.komi, 6.5);
    assert_eq!(g.player_black, "Player");
    assert_eq!(g.player_white, "GnuGo Level 5");
    assert_eq!(g.result, "B+R");
    assert_eq!(g.move_count, 2);
    assert_eq!(g.date.len(), 10);
}

#[test]
fn test_direct_open_of_malformed_file_fails() {
    let dir = temp_dir();
    let path = dir.path().join("bad.sgf");
    fs::write(&path, "(;SZ[abc])").unwrap();
    assert!(reader::parse_header(&path).is_err());
    assert!(reader::replay_to_end(&path).is_err());
    assert!(GameRecord::open(&path).is_err());
    assert!(reader::parse_header(&dir.path().join("absent.sgf")).is_err());
}
