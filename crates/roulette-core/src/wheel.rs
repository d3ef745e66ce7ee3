//! The wheel: outcomes, pocket colors and outcome sources.
//!
//! Single-zero layout, 37 pockets (`0` ..= `36`). Zero is green; it has
//! no color, no parity and no dozen.

#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;
use std::convert::TryFrom;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DrawError;
use crate::wager::{DozenRange, Parity};

/// Number of pockets on the wheel.
pub const POCKETS: u8 = 37;

/// Red pockets; every other non-zero pocket is black.
const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Black => "black",
        }
    }
}

/// A drawn pocket, guaranteed to be in `0..37`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Outcome(u8);

impl Outcome {
    pub fn new(number: u8) -> Option<Self> {
        (number < POCKETS).then_some(Outcome(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `None` for zero.
    pub fn color(self) -> Option<Color> {
        if self.is_zero() {
            None
        } else if RED_NUMBERS.contains(&self.0) {
            Some(Color::Red)
        } else {
            Some(Color::Black)
        }
    }

    /// `None` for zero.
    pub fn parity(self) -> Option<Parity> {
        match self.0 {
            0 => None,
            n if n % 2 == 0 => Some(Parity::Even),
            _ => Some(Parity::Odd),
        }
    }

    /// `None` for zero.
    pub fn dozen(self) -> Option<DozenRange> {
        [DozenRange::First, DozenRange::Second, DozenRange::Third]
            .into_iter()
            .find(|d| d.contains(self.0))
    }
}

impl TryFrom<u8> for Outcome {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Outcome::new(value).ok_or_else(|| format!("outcome {value} out of range 0-36"))
    }
}

impl From<Outcome> for u8 {
    fn from(value: Outcome) -> Self {
        value.0
    }
}

/// Something that can draw one outcome, uniformly over the 37 pockets.
pub trait OutcomeSource: Send {
    fn draw(&mut self) -> Result<Outcome, DrawError>;
}

/// Outcome source backed by operating-system entropy.
///
/// Uses rejection sampling over 32-bit words so every pocket is exactly
/// equally likely.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsWheel;

impl OutcomeSource for OsWheel {
    fn draw(&mut self) -> Result<Outcome, DrawError> {
        // Largest multiple of 37 that fits in u32; anything at or above it is biased.
        let zone = u32::MAX - (u32::MAX % POCKETS as u32);
        loop {
            let mut buf = [0u8; 4];
            OsRng.try_fill_bytes(&mut buf)?;
            let word = u32::from_le_bytes(buf);
            if word < zone {
                return Ok(Outcome((word % POCKETS as u32) as u8));
            }
        }
    }
}

/// Outcome source that replays a fixed script. Test support only,
/// behind the `test-util` feature.
///
/// `None` entries simulate an entropy failure. Once the script runs out
/// every draw fails with [`DrawError::Exhausted`].
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone)]
pub struct ScriptedWheel {
    script: VecDeque<Option<Outcome>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedWheel {
    /// # Panics
    ///
    /// If a scripted number is not a pocket on the wheel.
    pub fn new(script: impl IntoIterator<Item = Option<u8>>) -> Self {
        let script = script
            .into_iter()
            .map(|slot| {
                slot.map(|n| match Outcome::new(n) {
                    Some(outcome) => outcome,
                    None => panic!("scripted outcome {n} is not a pocket (0..{POCKETS})"),
                })
            })
            .collect();
        ScriptedWheel { script }
    }

    /// Script made only of successful draws.
    pub fn outcomes(numbers: impl IntoIterator<Item = u8>) -> Self {
        ScriptedWheel::new(numbers.into_iter().map(Some))
    }
}

#[cfg(any(test, feature = "test-util"))]
impl OutcomeSource for ScriptedWheel {
    fn draw(&mut self) -> Result<Outcome, DrawError> {
        match self.script.pop_front() {
            Some(Some(outcome)) => Ok(outcome),
            Some(None) => Err(DrawError::Entropy(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "scripted entropy failure",
            )))),
            None => Err(DrawError::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_wheel_stays_in_range() {
        let mut wheel = OsWheel;
        let mut seen = [false; POCKETS as usize];
        for _ in 0..10_000 {
            let n = wheel.draw().expect("entropy").number();
            assert!(n < POCKETS);
            seen[n as usize] = true;
        }
        // With 10k draws every pocket shows up with overwhelming probability.
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn colors_match_the_table() {
        assert_eq!(Outcome::new(0).unwrap().color(), None);
        assert_eq!(Outcome::new(1).unwrap().color(), Some(Color::Red));
        assert_eq!(Outcome::new(2).unwrap().color(), Some(Color::Black));
        assert_eq!(Outcome::new(19).unwrap().color(), Some(Color::Red));
        assert_eq!(Outcome::new(20).unwrap().color(), Some(Color::Black));
        let reds = (1..POCKETS).filter(|n| Outcome::new(*n).unwrap().color() == Some(Color::Red)).count();
        assert_eq!(reds, 18);
    }

    #[test]
    fn zero_has_no_parity_or_dozen() {
        let zero = Outcome::new(0).unwrap();
        assert_eq!(zero.parity(), None);
        assert_eq!(zero.dozen(), None);
        assert_eq!(Outcome::new(15).unwrap().dozen(), Some(DozenRange::Second));
        assert_eq!(Outcome::new(36).unwrap().parity(), Some(Parity::Even));
    }

    #[test]
    fn outcome_rejects_out_of_range() {
        assert!(Outcome::new(37).is_none());
        assert!(Outcome::try_from(200u8).is_err());
    }

    #[test]
    fn scripted_wheel_replays_then_fails() {
        let mut wheel = ScriptedWheel::new([Some(7), None]);
        assert_eq!(wheel.draw().unwrap().number(), 7);
        assert!(matches!(wheel.draw(), Err(DrawError::Entropy(_))));
        assert!(matches!(wheel.draw(), Err(DrawError::Exhausted)));
    }

    #[test]
    #[should_panic(expected = "not a pocket")]
    fn scripted_wheel_rejects_numbers_off_the_wheel() {
        ScriptedWheel::new([Some(7), Some(37)]);
    }
}
