//! Rules of a game that a referee enforces.

use crate::map::Map;

/// Configuration for the rules of a game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameConfig {
    pub(crate) starting_rails: u32,
    pub(crate) starting_cards: usize,
    pub(crate) destinations_offered: usize,
    pub(crate) destinations_kept: usize,
    pub(crate) deck_size: usize,
    pub(crate) min_rails: u32,
    pub(crate) cards_per_draw: usize,
    pub(crate) min_players: usize,
    pub(crate) max_players: usize,
}

impl GameConfig {
    /// Create a new configuration with the standard rules.
    ///
    /// By default:
    /// - Every player starts with 45 rails and 4 cards.
    /// - Players are offered 5 destinations, and keep 2 of them.
    /// - The referee's deck holds exactly 250 cards.
    /// - The game ends as soon as the player whose turn it is has 3 rails or fewer.
    /// - Requesting cards draws 2 of them.
    /// - A game is played by 2 to 8 players.
    pub fn new() -> Self {
        Self {
            starting_rails: 45,
            starting_cards: 4,
            destinations_offered: 5,
            destinations_kept: 2,
            deck_size: 250,
            min_rails: 3,
            cards_per_draw: 2,
            min_players: 2,
            max_players: 8,
        }
    }

    pub fn with_starting_rails(mut self, value: u32) -> Self {
        self.starting_rails = value;
        self
    }

    pub fn with_starting_cards(mut self, value: usize) -> Self {
        self.starting_cards = value;
        self
    }

    /// Set how many destinations are offered, and how many of those each player keeps.
    pub fn with_destinations(mut self, offered: usize, kept: usize) -> Self {
        self.destinations_offered = offered;
        self.destinations_kept = kept;
        self
    }

    /// Set the exact number of cards the referee's deck must hold.
    pub fn with_deck_size(mut self, value: usize) -> Self {
        self.deck_size = value;
        self
    }

    /// Set the number of rails at or below which the game is over.
    pub fn with_min_rails(mut self, value: u32) -> Self {
        self.min_rails = value;
        self
    }

    pub fn with_cards_per_draw(mut self, value: usize) -> Self {
        self.cards_per_draw = value;
        self
    }

    pub fn starting_rails(&self) -> u32 {
        self.starting_rails
    }

    pub fn deck_size(&self) -> usize {
        self.deck_size
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// How many destinations each player must hand back after setup.
    pub fn destinations_returned(&self) -> usize {
        self.destinations_offered.saturating_sub(self.destinations_kept)
    }

    /// Whether the map can offer a distinct batch of destinations to every one of `num_players`.
    pub fn fits_map(&self, map: &Map, num_players: usize) -> bool {
        map.has_enough_destinations(
            num_players,
            self.destinations_offered,
            self.destinations_kept,
        )
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
