use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum LevelError {
    #[error("level must be between 0 and 10, got {0}")]
    OutOfRange(f64),

    #[error("level must be a finite number")]
    NotFinite,
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Completion level of a single checkball: 0 (empty) through 10 (full).
///
/// Persisted as a plain integer. Imported numbers with a fractional part are
/// rounded to the nearest level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const EMPTY: Level = Level(0);
    pub const HALF: Level = Level(5);
    pub const FULL: Level = Level(10);
    pub const MAX: u8 = 10;

    /// Creates a level.
    ///
    /// # Errors
    ///
    /// Returns `LevelError::OutOfRange` if `value > 10`.
    pub fn new(value: u8) -> Result<Self, LevelError> {
        if value > Self::MAX {
            return Err(LevelError::OutOfRange(f64::from(value)));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_full(self) -> bool {
        self.0 == Self::MAX
    }

    /// Share of the maximum, as a whole percentage (0..=100).
    #[must_use]
    pub fn percent(self) -> u8 {
        self.0 * 10
    }

    /// Click cycle: empty → half → full → empty. Any other level resets to empty.
    #[must_use]
    pub fn cycle(self) -> Self {
        match self.0 {
            0 => Self::HALF,
            5 => Self::FULL,
            _ => Self::EMPTY,
        }
    }

    /// Keyboard shortcut: digits `0`-`9` jump straight to that level.
    #[must_use]
    pub fn from_digit(key: char) -> Option<Self> {
        key.to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .map(Self)
    }
}

impl TryFrom<f64> for Level {
    type Error = LevelError;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        if !raw.is_finite() {
            return Err(LevelError::NotFinite);
        }
        if !(0.0..=f64::from(Self::MAX)).contains(&raw) {
            return Err(LevelError::OutOfRange(raw));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(raw.round() as u8))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({})", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
