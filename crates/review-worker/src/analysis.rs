//! Move quality classification: pure functions only
//! (No Board/Engine/Database dependencies)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bounds (inclusive) of each loss band, in centipawns
const THRESHOLD_BEST: u32 = 5;
const THRESHOLD_EXCELLENT: u32 = 10;
const THRESHOLD_GOOD: u32 = 25;
const THRESHOLD_INACCURACY: u32 = 50;
const THRESHOLD_MISTAKE: u32 = 100;

/// Losses above this are inaccuracies or worse
pub const POOR_MOVE_MIN_LOSS: u32 = THRESHOLD_GOOD;

/// Centipawn magnitude a mate score normalizes to
pub const MATE_SCORE: i32 = 10_000;

/// Mate detection threshold
const MATE_THRESHOLD: i32 = 9_000;

/// Maximum CP loss to cap at
pub const MAX_CP_LOSS: u32 = 500;

/// Quality band of a single move. Ordered from best to worst except `Book`,
/// which sits outside the loss scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    Best,
    Excellent,
    Good,
    Book,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveQuality {
    pub const ALL: [MoveQuality; 7] = [
        MoveQuality::Best,
        MoveQuality::Excellent,
        MoveQuality::Good,
        MoveQuality::Book,
        MoveQuality::Inaccuracy,
        MoveQuality::Mistake,
        MoveQuality::Blunder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MoveQuality::Best => "best",
            MoveQuality::Excellent => "excellent",
            MoveQuality::Good => "good",
            MoveQuality::Book => "book",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
        }
    }

    /// Moves that earn a tactical diagnosis
    pub fn is_poor(self) -> bool {
        matches!(
            self,
            MoveQuality::Inaccuracy | MoveQuality::Mistake | MoveQuality::Blunder
        )
    }

    /// Rank on the loss scale: 0 for best up to 5 for blunder. Book ranks with best.
    pub fn rank(self) -> u8 {
        match self {
            MoveQuality::Best | MoveQuality::Book => 0,
            MoveQuality::Excellent => 1,
            MoveQuality::Good => 2,
            MoveQuality::Inaccuracy => 3,
            MoveQuality::Mistake => 4,
            MoveQuality::Blunder => 5,
        }
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveQuality::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown move quality: {s}"))
    }
}

/// Context a move is classified in
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveContext {
    pub ply: u32,
    pub is_book: bool,
}

/// Classify a move by its centipawn loss. Book moves are exempt from the loss scale.
pub fn classify(cp_loss: u32, context: MoveContext) -> MoveQuality {
    if context.is_book {
        return MoveQuality::Book;
    }
    if cp_loss <= THRESHOLD_BEST {
        MoveQuality::Best
    } else if cp_loss <= THRESHOLD_EXCELLENT {
        MoveQuality::Excellent
    } else if cp_loss <= THRESHOLD_GOOD {
        MoveQuality::Good
    } else if cp_loss <= THRESHOLD_INACCURACY {
        MoveQuality::Inaccuracy
    } else if cp_loss <= THRESHOLD_MISTAKE {
        MoveQuality::Mistake
    } else {
        MoveQuality::Blunder
    }
}

/// Engine score as reported for the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    Cp(i32),
    /// Mate in N; negative when the side to move gets mated, 0 when already mated
    Mate(i32),
}

impl Score {
    pub fn from_parts(cp: Option<i32>, mate: Option<i32>) -> Option<Score> {
        match (mate, cp) {
            (Some(m), _) => Some(Score::Mate(m)),
            (None, Some(c)) => Some(Score::Cp(c)),
            (None, None) => None,
        }
    }

    /// Centipawn equivalent, with mate in N mapped to ±(MATE_SCORE − 10·N)
    pub fn to_cp(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(0) => -MATE_SCORE,
            Score::Mate(m) if m > 0 => MATE_SCORE - m * 10,
            Score::Mate(m) => -MATE_SCORE - m * 10,
        }
    }
}

fn is_mate_position(eval: i32) -> bool {
    eval.abs() > MATE_THRESHOLD
}

/// Loss (mover's perspective) between the best line and the line actually played.
pub fn calculate_cp_loss(best_eval: i32, after_eval: i32, is_checkmate: bool) -> u32 {
    if is_checkmate {
        return 0;
    }

    if is_mate_position(best_eval) && is_mate_position(after_eval) {
        return if (best_eval > 0) == (after_eval > 0) {
            0
        } else {
            MAX_CP_LOSS
        };
    }

    (best_eval - after_eval).clamp(0, MAX_CP_LOSS as i32) as u32
}

/// Win chances in [-1, 1] for a centipawn score
pub fn win_chances(cp: i32) -> f64 {
    2.0 / (1.0 + (-0.004 * cp as f64).exp()) - 1.0
}

/// Win probability in percent for the side the score belongs to
pub fn win_probability(cp: i32) -> f64 {
    50.0 + 50.0 * win_chances(cp)
}

pub fn calculate_accuracy(total_cp_loss: u32, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_cp_loss as f64 / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}

/// Per-band move counts for one side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifications {
    pub best: u32,
    pub excellent: u32,
    pub good: u32,
    pub book: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
}

impl Classifications {
    pub fn record(&mut self, quality: MoveQuality) {
        let slot = match quality {
            MoveQuality::Best => &mut self.best,
            MoveQuality::Excellent => &mut self.excellent,
            MoveQuality::Good => &mut self.good,
            MoveQuality::Book => &mut self.book,
            MoveQuality::Inaccuracy => &mut self.inaccuracy,
            MoveQuality::Mistake => &mut self.mistake,
            MoveQuality::Blunder => &mut self.blunder,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.best
            + self.excellent
            + self.good
            + self.book
            + self.inaccuracy
            + self.mistake
            + self.blunder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(loss: u32) -> MoveQuality {
        classify(loss, MoveContext::default())
    }

    #[test]
    fn test_classify_reference_losses() {
        assert_eq!(band(0), MoveQuality::Best);
        assert_eq!(band(7), MoveQuality::Excellent);
        assert_eq!(band(30), MoveQuality::Inaccuracy);
        assert_eq!(band(250), MoveQuality::Blunder);
    }

    #[test]
    fn test_classify_band_edges() {
        assert_eq!(band(5), MoveQuality::Best);
        assert_eq!(band(6), MoveQuality::Excellent);
        assert_eq!(band(10), MoveQuality::Excellent);
        assert_eq!(band(11), MoveQuality::Good);
        assert_eq!(band(25), MoveQuality::Good);
        assert_eq!(band(26), MoveQuality::Inaccuracy);
        assert_eq!(band(50), MoveQuality::Inaccuracy);
        assert_eq!(band(51), MoveQuality::Mistake);
        assert_eq!(band(100), MoveQuality::Mistake);
        assert_eq!(band(101), MoveQuality::Blunder);
        assert_eq!(band(u32::MAX), MoveQuality::Blunder);
    }

    #[test]
    fn test_classify_is_monotone() {
        let mut prev = band(0).rank();
        for loss in 1..=1_000 {
            let rank = band(loss).rank();
            assert!(rank >= prev, "quality improved at loss {loss}");
            prev = rank;
        }
    }

    #[test]
    fn test_book_overrides_loss() {
        let ctx = MoveContext { ply: 3, is_book: true };
        assert_eq!(classify(400, ctx), MoveQuality::Book);
        assert!(!MoveQuality::Book.is_poor());
    }

    #[test]
    fn test_quality_round_trips_through_str() {
        for q in MoveQuality::ALL {
            assert_eq!(q.as_str().parse::<MoveQuality>().unwrap(), q);
        }
        assert!("brilliant".parse::<MoveQuality>().is_err());
    }

    #[test]
    fn test_mate_normalization() {
        assert_eq!(Score::Mate(3).to_cp(), 9_970);
        assert_eq!(Score::Mate(-2).to_cp(), -9_980);
        assert_eq!(Score::Mate(0).to_cp(), -10_000);
        assert_eq!(Score::Cp(-45).to_cp(), -45);
        assert_eq!(Score::from_parts(Some(10), Some(2)), Some(Score::Mate(2)));
    }

    #[test]
    fn test_cp_loss_calculation() {
        assert_eq!(calculate_cp_loss(100, 80, false), 20);
        assert_eq!(calculate_cp_loss(80, 100, false), 0);
        assert_eq!(calculate_cp_loss(100, -9990, true), 0);
        assert_eq!(calculate_cp_loss(9990, 9980, false), 0);
        assert_eq!(calculate_cp_loss(9990, -9990, false), MAX_CP_LOSS);
        assert_eq!(calculate_cp_loss(300, -900, false), MAX_CP_LOSS);
    }

    #[test]
    fn test_calculate_accuracy() {
        assert!((calculate_accuracy(0, 20) - 100.0).abs() < 0.1);
        assert!((calculate_accuracy(500, 20) - 89.4).abs() < 1.0);
        assert!((calculate_accuracy(2000, 20) - 70.7).abs() < 1.0);
    }

    #[test]
    fn test_win_probability() {
        assert!((win_probability(0) - 50.0).abs() < 1e-9);
        assert!(win_probability(300) > 75.0);
        assert!(win_probability(-300) < 25.0);
    }
}
