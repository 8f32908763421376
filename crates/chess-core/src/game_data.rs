use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub eco: Option<String>,
    pub event: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub metadata: GameMetadata,
    pub moves: Vec<String>, // SAN notation
    pub pgn: String,
    /// Starting position when the PGN carries a SetUp/FEN pair
    pub start_fen: Option<String>,
}

/// The side that made a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Convert a White-perspective score into this side's perspective.
    pub fn relative(self, white_cp: i32) -> i32 {
        match self {
            Side::White => white_cp,
            Side::Black => -white_cp,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }

    pub fn parse(s: &str) -> Option<Side> {
        match s {
            "white" | "w" => Some(Side::White),
            "black" | "b" => Some(Side::Black),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_flips_for_black() {
        assert_eq!(Side::White.relative(120), 120);
        assert_eq!(Side::Black.relative(120), -120);
        assert_eq!(Side::Black.opposite(), Side::White);
    }

    #[test]
    fn test_parse_side() {
        assert_eq!(Side::parse("white"), Some(Side::White));
        assert_eq!(Side::parse("b"), Some(Side::Black));
        assert_eq!(Side::parse("green"), None);
    }
}
