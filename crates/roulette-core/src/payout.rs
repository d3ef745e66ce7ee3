//! Payout rules.
//!
//! Winnings are profit only. A winning wager returns `winnings + stake`;
//! a losing one returns nothing (the stake was debited when the wager
//! was accepted).
//!
//! | category | pays | zero |
//! |----------|------|------|
//! | straight | 35x  | wins only on a straight 0 |
//! | color    | 1x   | loses |
//! | parity   | 1x   | loses |
//! | dozen    | 2x   | loses |

use crate::wager::{Selection, Wager};
use crate::wheel::Outcome;

/// Profit for a single selection and stake against `outcome`.
pub fn winnings(selection: &Selection, stake: u64, outcome: Outcome) -> u64 {
    let multiplier = match *selection {
        Selection::Straight(n) if n == outcome.number() => 35,
        Selection::Straight(_) => 0,
        Selection::Color(c) if outcome.color() == Some(c) => 1,
        Selection::Parity(p) if outcome.parity() == Some(p) => 1,
        Selection::Dozen(d) if outcome.dozen() == Some(d) => 2,
        Selection::Color(_) | Selection::Parity(_) | Selection::Dozen(_) => 0,
    };
    stake.saturating_mul(multiplier)
}

/// Result of one wager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub wager: Wager,
    pub winnings: u64,
}

impl Payout {
    /// Amount credited back to the participant: stake plus profit for a
    /// win, zero for a loss.
    pub fn returned(&self) -> u64 {
        if self.winnings > 0 {
            self.winnings.saturating_add(self.wager.stake)
        } else {
            0
        }
    }
}

/// Compute payouts for every wager, preserving submission order.
pub fn settle(outcome: Outcome, wagers: &[Wager]) -> Vec<Payout> {
    wagers
        .iter()
        .map(|wager| Payout {
            wager: wager.clone(),
            winnings: winnings(&wager.selection, wager.stake, outcome),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantId;
    use crate::wager::{DozenRange, Parity};
    use crate::wheel::Color;

    fn outcome(n: u8) -> Outcome {
        Outcome::new(n).unwrap()
    }

    #[test]
    fn straight_pays_35_to_1_on_exact_match_only() {
        for stake in [1u64, 7, 100, 12_345] {
            for w in 0..37u8 {
                assert_eq!(winnings(&Selection::Straight(w), stake, outcome(w)), 35 * stake);
                let other = (w + 1) % 37;
                assert_eq!(winnings(&Selection::Straight(w), stake, outcome(other)), 0);
            }
        }
    }

    #[test]
    fn zero_loses_every_outside_bet() {
        let zero = outcome(0);
        let outside = [
            Selection::Color(Color::Red),
            Selection::Color(Color::Black),
            Selection::Parity(Parity::Even),
            Selection::Parity(Parity::Odd),
            Selection::Dozen(DozenRange::First),
            Selection::Dozen(DozenRange::Second),
            Selection::Dozen(DozenRange::Third),
        ];
        for sel in outside {
            assert_eq!(winnings(&sel, 500, zero), 0, "{sel:?}");
        }
    }

    #[test]
    fn color_and_parity_pay_even_money() {
        assert_eq!(winnings(&Selection::Color(Color::Red), 200, outcome(1)), 200);
        assert_eq!(winnings(&Selection::Color(Color::Red), 200, outcome(2)), 0);
        assert_eq!(winnings(&Selection::Parity(Parity::Even), 300, outcome(4)), 300);
        assert_eq!(winnings(&Selection::Parity(Parity::Even), 300, outcome(3)), 0);
    }

    #[test]
    fn dozen_pays_two_to_one() {
        let second = Selection::Dozen(DozenRange::Second);
        assert_eq!(winnings(&second, 500, outcome(15)), 1000);
        assert_eq!(winnings(&second, 500, outcome(25)), 0);
        assert_eq!(winnings(&Selection::Dozen(DozenRange::First), 500, outcome(12)), 1000);
        assert_eq!(winnings(&Selection::Dozen(DozenRange::Third), 500, outcome(24)), 0);
    }

    #[test]
    fn settle_keeps_order_and_returns_stake_on_wins() {
        let alice = ParticipantId::from("alice");
        let wagers = vec![
            Wager { participant: alice.clone(), selection: Selection::Straight(17), stake: 100 },
            Wager { participant: alice.clone(), selection: Selection::Color(Color::Black), stake: 50 },
            Wager { participant: alice, selection: Selection::Parity(Parity::Odd), stake: 10 },
        ];
        let payouts = settle(outcome(17), &wagers);
        assert_eq!(payouts.len(), 3);
        assert_eq!(payouts[0].winnings, 3500);
        assert_eq!(payouts[0].returned(), 3600);
        // 17 is black and odd.
        assert_eq!(payouts[1].returned(), 100);
        assert_eq!(payouts[2].returned(), 20);

        let losers = settle(outcome(0), &wagers);
        assert!(losers.iter().all(|p| p.returned() == 0));
    }
}
