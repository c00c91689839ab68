//! # Grade Derivation
//!
//! A total, deterministic step function over the 0–100 score scale.
//! Bands are half-open `[threshold, next)` — a boundary score belongs to
//! the higher band, so 70.0 is an A while 69.999 is a B+.

use serde::{Deserialize, Serialize};

use creda_core::ValidationError;

/// Letter grade bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// 70–100.
    A,
    /// 65–69.99…
    BPlus,
    /// 60–64.99…
    B,
    /// 55–59.99…
    CPlus,
    /// 50–54.99…
    C,
    /// 45–49.99…
    DPlus,
    /// 40–44.99…
    D,
    /// Below 40.
    F,
}

/// Band thresholds, descending. Each score maps to the first band whose
/// threshold it meets.
const BANDS: [(f64, Grade); 8] = [
    (70.0, Grade::A),
    (65.0, Grade::BPlus),
    (60.0, Grade::B),
    (55.0, Grade::CPlus),
    (50.0, Grade::C),
    (45.0, Grade::DPlus),
    (40.0, Grade::D),
    (0.0, Grade::F),
];

impl Grade {
    /// Derive the grade for a raw score.
    ///
    /// # Errors
    ///
    /// Rejects non-finite scores and scores outside 0–100.
    pub fn from_score(score: f64) -> Result<Self, ValidationError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ValidationError::invalid(
                "score",
                format!("must be a number between 0 and 100, got {score}"),
            ));
        }
        for (threshold, grade) in BANDS {
            if score >= threshold {
                return Ok(grade);
            }
        }
        // Unreachable: the final band threshold is 0.0 and score >= 0.0.
        Ok(Grade::F)
    }

    /// The grade point for this band.
    pub fn grade_point(&self) -> f64 {
        match self {
            Self::A => 4.0,
            Self::BPlus => 3.5,
            Self::B => 3.0,
            Self::CPlus => 2.5,
            Self::C => 2.0,
            Self::DPlus => 1.5,
            Self::D => 1.0,
            Self::F => 0.0,
        }
    }

    /// Whether this grade earns the course's credits.
    pub fn is_passing(&self) -> bool {
        !matches!(self, Self::F)
    }

    /// The printed letter form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
