//! Wager categories, selectors and validation.
//!
//! A wager is a stake bound to a [`Selection`]. Selections are parsed
//! from the `(category, selector)` text pair that arrives over the wire:
//!
//! | category   | selectors                 | aliases accepted |
//! |------------|---------------------------|------------------|
//! | `straight` | `0` ..= `36`              |                  |
//! | `color`    | `red`, `black`            |                  |
//! | `parity`   | `even`, `odd`             | `even_odd`       |
//! | `dozen`    | `first`, `second`, `third`| `dozens`         |
//!
//! Validation is pure and runs before any shared state is touched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WagerError;
use crate::participant::ParticipantId;
use crate::wheel::{Color, POCKETS};

/// Wager category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Straight,
    Color,
    #[serde(alias = "even_odd")]
    Parity,
    #[serde(alias = "dozens")]
    Dozen,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Straight => "straight",
            Category::Color => "color",
            Category::Parity => "parity",
            Category::Dozen => "dozen",
        }
    }

    /// Parse a category name, including the legacy aliases.
    pub fn parse(name: &str) -> Result<Self, WagerError> {
        match name {
            "straight" => Ok(Category::Straight),
            "color" => Ok(Category::Color),
            "parity" | "even_odd" => Ok(Category::Parity),
            "dozen" | "dozens" => Ok(Category::Dozen),
            other => Err(WagerError::InvalidCategory(other.to_string())),
        }
    }

    /// Human description of the legal selectors, used in error messages.
    fn expected(self) -> &'static str {
        match self {
            Category::Straight => "0-36",
            Category::Color => "red or black",
            Category::Parity => "even or odd",
            Category::Dozen => "first, second, or third",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Even / odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn as_str(self) -> &'static str {
        match self {
            Parity::Even => "even",
            Parity::Odd => "odd",
        }
    }
}

/// One of the three dozens: 1-12, 13-24, 25-36.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DozenRange {
    First,
    Second,
    Third,
}

impl DozenRange {
    pub fn as_str(self) -> &'static str {
        match self {
            DozenRange::First => "first",
            DozenRange::Second => "second",
            DozenRange::Third => "third",
        }
    }

    /// Whether `number` falls in this dozen. Zero is in none.
    pub fn contains(self, number: u8) -> bool {
        match self {
            DozenRange::First => (1..=12).contains(&number),
            DozenRange::Second => (13..=24).contains(&number),
            DozenRange::Third => (25..=36).contains(&number),
        }
    }
}

/// A validated category + selector pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Straight(u8),
    Color(Color),
    Parity(Parity),
    Dozen(DozenRange),
}

impl Selection {
    /// Parse a `(category, selector)` pair.
    pub fn parse(category: &str, selector: &str) -> Result<Self, WagerError> {
        let category = Category::parse(category)?;
        let invalid = || WagerError::InvalidSelector {
            category,
            selector: selector.to_string(),
            expected: category.expected(),
        };

        match category {
            Category::Straight => match selector.parse::<u8>() {
                Ok(n) if n < POCKETS => Ok(Selection::Straight(n)),
                _ => Err(invalid()),
            },
            Category::Color => match selector {
                "red" => Ok(Selection::Color(Color::Red)),
                "black" => Ok(Selection::Color(Color::Black)),
                _ => Err(invalid()),
            },
            Category::Parity => match selector {
                "even" => Ok(Selection::Parity(Parity::Even)),
                "odd" => Ok(Selection::Parity(Parity::Odd)),
                _ => Err(invalid()),
            },
            Category::Dozen => match selector {
                "first" => Ok(Selection::Dozen(DozenRange::First)),
                "second" => Ok(Selection::Dozen(DozenRange::Second)),
                "third" => Ok(Selection::Dozen(DozenRange::Third)),
                _ => Err(invalid()),
            },
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Selection::Straight(_) => Category::Straight,
            Selection::Color(_) => Category::Color,
            Selection::Parity(_) => Category::Parity,
            Selection::Dozen(_) => Category::Dozen,
        }
    }

    /// Canonical selector text.
    pub fn selector(&self) -> String {
        match self {
            Selection::Straight(n) => n.to_string(),
            Selection::Color(c) => c.as_str().to_string(),
            Selection::Parity(p) => p.as_str().to_string(),
            Selection::Dozen(d) => d.as_str().to_string(),
        }
    }
}

/// Validate a raw wager request.
///
/// Checks the stake first, then the category, then the selector, and
/// returns the parsed selection together with the stake as an unsigned
/// amount.
pub fn validate(category: &str, selector: &str, stake: i64) -> Result<(Selection, u64), WagerError> {
    if stake <= 0 {
        return Err(WagerError::NonPositiveStake);
    }
    let selection = Selection::parse(category, selector)?;
    Ok((selection, stake as u64))
}

/// A wager appended to a round. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wager {
    pub participant: ParticipantId,
    pub selection: Selection,
    pub stake: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_accepts_full_wheel() {
        assert_eq!(Selection::parse("straight", "0"), Ok(Selection::Straight(0)));
        assert_eq!(Selection::parse("straight", "36"), Ok(Selection::Straight(36)));
    }

    #[test]
    fn straight_rejects_out_of_range_and_garbage() {
        for bad in ["37", "-1", "abc", "", "1.5"] {
            let err = Selection::parse("straight", bad).unwrap_err();
            assert!(matches!(err, WagerError::InvalidSelector { category: Category::Straight, .. }), "{bad}");
        }
    }

    #[test]
    fn outside_bets_parse() {
        assert_eq!(Selection::parse("color", "red"), Ok(Selection::Color(Color::Red)));
        assert_eq!(Selection::parse("color", "black"), Ok(Selection::Color(Color::Black)));
        assert_eq!(Selection::parse("parity", "even"), Ok(Selection::Parity(Parity::Even)));
        assert_eq!(Selection::parse("even_odd", "odd"), Ok(Selection::Parity(Parity::Odd)));
        for (sel, range) in [("first", DozenRange::First), ("second", DozenRange::Second), ("third", DozenRange::Third)] {
            assert_eq!(Selection::parse("dozen", sel), Ok(Selection::Dozen(range)));
            assert_eq!(Selection::parse("dozens", sel), Ok(Selection::Dozen(range)));
        }
    }

    #[test]
    fn outside_bets_reject_wrong_selectors() {
        assert!(Selection::parse("color", "green").is_err());
        assert!(Selection::parse("parity", "neither").is_err());
        assert!(Selection::parse("dozen", "fourth").is_err());
        assert!(Selection::parse("color", "Red").is_err());
    }

    #[test]
    fn unknown_category() {
        assert_eq!(
            Selection::parse("split", "1-2"),
            Err(WagerError::InvalidCategory("split".to_string()))
        );
    }

    #[test]
    fn stake_is_checked_before_anything_else() {
        assert_eq!(validate("split", "1-2", 0), Err(WagerError::NonPositiveStake));
        assert_eq!(validate("straight", "5", -100), Err(WagerError::NonPositiveStake));
        assert_eq!(validate("straight", "5", 100), Ok((Selection::Straight(5), 100)));
    }

    #[test]
    fn canonical_text_round_trips() {
        let sel = Selection::parse("even_odd", "odd").unwrap();
        assert_eq!(sel.category().as_str(), "parity");
        assert_eq!(sel.selector(), "odd");
        assert_eq!(Selection::Straight(17).selector(), "17");
    }

    #[test]
    fn error_messages_name_the_legal_values() {
        let err = Selection::parse("dozen", "fourth").unwrap_err();
        assert_eq!(err.to_string(), "invalid bet value: dozen bet fourth (must be first, second, or third)");
        assert!(err.is_validation());
        assert!(!WagerError::PhaseClosed.is_validation());
    }
}
