//! PGN parsing: a lightweight regex-based reader.

use std::sync::LazyLock;

use regex::Regex;

use crate::game_data::{GameMetadata, GameRecord};
use crate::notation::{NotationError, STANDARD_START_FEN};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("valid header regex"));
static HEADER_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid header block regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}|;[^\n]*").expect("valid comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid variation regex"));
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"O-O-O[+#]?|O-O[+#]?|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?")
        .expect("valid move regex")
});

/// Parse a PGN string into a GameRecord.
/// Only the first game of a multi-game file is read.
pub fn parse_pgn(pgn: &str) -> Result<GameRecord, NotationError> {
    let mut white = "Unknown".to_string();
    let mut black = "Unknown".to_string();
    let mut result = "*".to_string();
    let mut date = None;
    let mut time_control = None;
    let mut eco = None;
    let mut event = None;
    let mut setup = None;
    let mut fen = None;

    for cap in HEADER_RE.captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => white = value,
            "Black" => black = value,
            "Result" => result = value,
            "Date" => date = Some(value),
            "TimeControl" => time_control = Some(value),
            "ECO" => eco = Some(value),
            "Event" => event = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    let start_fen = match (setup.as_deref(), fen) {
        (Some("1"), Some(f)) if f != STANDARD_START_FEN => Some(f),
        _ => None,
    };

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return Err(NotationError::EmptyGame);
    }

    Ok(GameRecord {
        metadata: GameMetadata {
            white,
            black,
            result,
            date,
            time_control,
            eco,
            event,
        },
        moves,
        pgn: pgn.to_string(),
        start_fen,
    })
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_BLOCK_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");

    // Nested variations collapse from the inside out
    let mut text = no_comments.into_owned();
    loop {
        let stripped = VARIATION_RE.replace_all(&text, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    MOVE_RE
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract a string value from a PGN header.
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    HEADER_RE
        .captures_iter(pgn)
        .find(|cap| &cap[1] == header_name)
        .map(|cap| cap[2].to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgn_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[Date "2025.01.15"]
[TimeControl "600"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.metadata.white, "Player1");
        assert_eq!(game.metadata.black, "Player2");
        assert_eq!(game.metadata.result, "1-0");
        assert_eq!(game.moves, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert!(game.start_fen.is_none());
    }

    #[test]
    fn test_comments_and_variations_are_skipped() {
        let pgn = "1. e4 {best by test} e5 (1... c5 2. Nf3 (2. c3)) 2. Nf3 ; sharp\n Nc6 *";
        assert_eq!(extract_moves(pgn), vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_castling_and_promotion() {
        let moves = extract_moves("10. O-O O-O-O 11. exd8=Q+ Kxd8");
        assert_eq!(moves, vec!["O-O", "O-O-O", "exd8=Q+", "Kxd8"]);
    }

    #[test]
    fn test_custom_start_position() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 *"#;
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.start_fen.as_deref(), Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"));
    }

    #[test]
    fn test_empty_game_is_rejected() {
        assert!(matches!(parse_pgn("[White \"A\"]\n\n*"), Err(NotationError::EmptyGame)));
    }

    #[test]
    fn test_extract_header() {
        let pgn = r#"[WhiteElo "1500"]
[Event ""]"#;
        assert_eq!(extract_header(pgn, "WhiteElo").as_deref(), Some("1500"));
        assert_eq!(extract_header(pgn, "Event"), None);
        assert_eq!(extract_header(pgn, "Missing"), None);
    }
}
