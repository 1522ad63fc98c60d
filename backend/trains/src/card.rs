use crate::color::RailColor;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{EnumCount, IntoEnumIterator};

/// An ordered supply of single colored cards, dealt from the front.
pub type CardDeck = Vec<RailColor>;

/// How many cards of each color a player holds.
///
/// Every color is always present in a hand, with a count of zero if the player holds none of it.
///
/// # JSON
/// Hands are serialized as an object mapping colors to counts, e.g. `{"red": 2, "white": 1}`.
/// Colors with no cards are omitted, and missing colors are read as zero.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "BTreeMap<RailColor, u32>", into = "BTreeMap<RailColor, u32>")]
pub struct CardHand {
    counts: [u32; RailColor::COUNT],
}

impl CardHand {
    /// An empty hand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the given cards.
    ///
    /// # Example
    /// ```
    /// use trains::card::CardHand;
    /// use trains::color::RailColor::*;
    ///
    /// let hand = CardHand::from_cards(&[Red, Blue, Red]);
    /// assert_eq!(hand.count(Red), 2);
    /// assert_eq!(hand.count(Blue), 1);
    /// assert_eq!(hand.count(White), 0);
    /// assert_eq!(hand.total(), 3);
    /// ```
    pub fn from_cards(cards: &[RailColor]) -> Self {
        Self::new().with_cards(cards)
    }

    pub fn count(&self, color: RailColor) -> u32 {
        self.counts[color.index()]
    }

    /// Number of cards in the hand, all colors included.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Returns a new hand, with the given cards added.
    pub fn with_cards(mut self, cards: &[RailColor]) -> Self {
        for card in cards {
            self.counts[card.index()] += 1;
        }
        self
    }

    /// Returns a new hand with `count` fewer cards of the given color, stopping at zero.
    pub fn without(mut self, color: RailColor, count: u32) -> Self {
        let held = &mut self.counts[color.index()];
        *held = held.saturating_sub(count);
        self
    }
}

impl From<BTreeMap<RailColor, u32>> for CardHand {
    fn from(counts_by_color: BTreeMap<RailColor, u32>) -> Self {
        let mut hand = Self::new();
        for (color, count) in counts_by_color {
            hand.counts[color.index()] = count;
        }
        hand
    }
}

impl From<CardHand> for BTreeMap<RailColor, u32> {
    fn from(hand: CardHand) -> Self {
        RailColor::iter()
            .map(|color| (color, hand.count(color)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Builds a deck of `size` cards, with colors picked at random.
///
/// # Example
/// ```
/// use rand::thread_rng;
/// use trains::card::random_deck;
///
/// assert_eq!(random_deck(&mut thread_rng(), 250).len(), 250);
/// ```
pub fn random_deck<R: Rng + ?Sized>(rng: &mut R, size: usize) -> CardDeck {
    let colors: Vec<RailColor> = RailColor::iter().collect();
    (0..size)
        .filter_map(|_| colors.choose(rng).copied())
        .collect()
}
