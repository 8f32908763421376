//! Move quality bands, theme canonicalization and categorization of
//! hand-built positions.

use review_worker::analysis::{calculate_cp_loss, Score};
use review_worker::categorize::Phase;
use review_worker::themes::{canonical_theme, supported_themes};
use review_worker::{classify, Categorizer, MoveContext, MoveQuality, PoorMove, ReviewError, Theme};

fn band(loss: u32) -> MoveQuality {
    classify(loss, MoveContext::default())
}

fn poor(fen: &str, played: &str, best: &str, before: i32, after: i32, ply: u32) -> PoorMove {
    PoorMove {
        ply,
        fen_before: fen.to_string(),
        player_move: played.to_string(),
        best_move: best.to_string(),
        evaluation_before: before,
        evaluation_after: after,
        centipawn_loss: (before - after).clamp(0, 500) as u32,
        alternatives: Vec::new(),
    }
}

#[test]
fn test_band_examples() {
    assert_eq!(band(0), MoveQuality::Best);
    assert_eq!(band(7), MoveQuality::Excellent);
    assert_eq!(band(30), MoveQuality::Inaccuracy);
    assert_eq!(band(250), MoveQuality::Blunder);
}

#[test]
fn test_bands_never_improve_as_loss_grows() {
    let mut prev = band(0);
    for loss in 1..=1000 {
        let current = band(loss);
        assert!(current.rank() >= prev.rank(), "loss {loss} banded better than {}", loss - 1);
        prev = current;
    }
}

#[test]
fn test_book_overrides_loss() {
    let ctx = MoveContext { ply: 3, is_book: true };
    assert_eq!(classify(400, ctx), MoveQuality::Book);
}

#[test]
fn test_mate_scores_band_as_blunders() {
    let best = Score::Mate(2).to_cp();
    let after = Score::Cp(150).to_cp();
    assert_eq!(band(calculate_cp_loss(best, after, false)), MoveQuality::Blunder);
}

#[test]
fn test_theme_examples() {
    assert_eq!(canonical_theme("fork"), "fork");
    assert_eq!(canonical_theme("hanging_piece"), "hangingPiece");
    assert_eq!(canonical_theme("nonsense"), "nonsense");
    assert_eq!(canonical_theme(canonical_theme("nonsense")), "nonsense");
}

#[test]
fn test_tactical_themes_have_a_mapping() {
    let supported: Vec<&str> = supported_themes().collect();
    for theme in [
        Theme::HangingPiece,
        Theme::Fork,
        Theme::Pin,
        Theme::Skewer,
        Theme::DiscoveredAttack,
        Theme::BackRankWeakness,
        Theme::KingSafety,
    ] {
        assert!(supported.contains(&theme.as_str()), "{theme} unmapped");
    }
    assert_eq!(canonical_theme(Theme::PositionalError.as_str()), "positional_error");
}

#[test]
fn test_free_rook_capture_is_hanging_piece() {
    let cat = Categorizer::default()
        .categorize(&poor("4k3/8/8/4n3/8/8/8/4RK2 w - - 0 40", "f1f2", "e1e5", 0, -300, 79))
        .unwrap();
    assert_eq!(cat.theme, Theme::HangingPiece);
    assert_eq!(cat.tactical_theme, "hangingPiece");
    assert_eq!(cat.phase, Phase::Endgame);
    assert_eq!(cat.severity, MoveQuality::Blunder);
}

#[test]
fn test_missed_knight_fork() {
    let cat = Categorizer::default()
        .categorize(&poor("4k3/8/q7/3N4/8/8/8/4K3 w - - 0 30", "e1d2", "d5c7", 0, -900, 59))
        .unwrap();
    assert_eq!(cat.theme, Theme::Fork);
    assert_eq!(cat.tactical_theme, "fork");
    assert_eq!(cat.difficulty_level, 5);
}

#[test]
fn test_illegal_input_is_invalid_position() {
    let categorizer = Categorizer::default();
    let bad_fen = poor("not a fen", "e2e4", "d2d4", 0, -100, 1);
    assert!(matches!(categorizer.categorize(&bad_fen), Err(ReviewError::InvalidPosition(_))));

    let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let bad_move = poor(start, "e2e5", "d2d4", 0, -100, 1);
    assert!(matches!(categorizer.categorize(&bad_move), Err(ReviewError::InvalidPosition(_))));
}

#[test]
fn test_engine_choice_is_skipped() {
    let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let same = poor(start, "e2e4", "e2e4", 0, -100, 1);
    assert!(matches!(
        Categorizer::default().categorize(&same),
        Err(ReviewError::CategorizationSkipped(_))
    ));
}
