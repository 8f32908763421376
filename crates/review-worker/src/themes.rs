//! Internal theme vocabulary → external (Lichess puzzle) theme names.

/// Registered mappings. Themes missing here pass through unchanged.
const THEME_MAP: &[(&str, &str)] = &[
    ("hanging_piece", "hangingPiece"),
    ("fork", "fork"),
    ("pin", "pin"),
    ("skewer", "skewer"),
    ("discovered_attack", "discoveredAttack"),
    ("back_rank_weakness", "backRankMate"),
    ("king_safety", "exposedKing"),
    ("trapped_piece", "trappedPiece"),
    ("x_ray", "xRayAttack"),
    ("double_check", "doubleCheck"),
    ("mate_threat", "mate"),
];

/// Canonical name for `theme`, or `theme` itself when nothing is registered.
pub fn canonical_theme(theme: &str) -> &str {
    THEME_MAP
        .iter()
        .find(|(internal, _)| *internal == theme)
        .map(|(_, external)| *external)
        .unwrap_or(theme)
}

/// Internal themes that have an explicit mapping
pub fn supported_themes() -> impl Iterator<Item = &'static str> {
    THEME_MAP.iter().map(|(internal, _)| *internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_mappings() {
        assert_eq!(canonical_theme("fork"), "fork");
        assert_eq!(canonical_theme("hanging_piece"), "hangingPiece");
        assert_eq!(canonical_theme("back_rank_weakness"), "backRankMate");
    }

    #[test]
    fn test_identity_fallback_is_idempotent() {
        assert_eq!(canonical_theme("nonsense"), "nonsense");
        assert_eq!(canonical_theme(canonical_theme("nonsense")), "nonsense");
        assert_eq!(canonical_theme("positional_error"), "positional_error");
    }

    #[test]
    fn test_supported_themes_all_map() {
        let themes: Vec<_> = supported_themes().collect();
        assert_eq!(themes.len(), THEME_MAP.len());
        assert!(themes.contains(&"discovered_attack"));
        assert!(!themes.contains(&"positional_error"));
    }
}
