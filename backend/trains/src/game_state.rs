use crate::color::RailColor;
use crate::config::GameConfig;
use crate::game_phase::GamePhase;
use crate::map::{Connection, Map};
use crate::player::{PlayerKnowledge, PlayerView};

use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;

/// Cards handed to a player who requested some.
pub type DrawnCards = SmallVec<[RailColor; 2]>;

/// Outcome of a player's attempt to change the state of the game.
///
/// Either it succeeded, which yields the new state, or it was not allowed,
/// which includes a human-readable error message.
pub type TurnResult = Result<GameState, String>;

/// The authoritative state of a game, held by its referee.
///
/// Every transition returns a new state, leaving the previous one untouched.
/// Two states are equal when their players, deck, and stale turn counts are.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    map: Arc<Map>,
    /// Players still in the game. The first one is the player whose turn it is.
    active: VecDeque<PlayerKnowledge>,
    /// Players removed from the game for misbehaving, in order of removal.
    cheaters: Vec<PlayerKnowledge>,
    /// The draw pile, dealt from the front.
    deck: VecDeque<RailColor>,
    /// How many turns in a row went by without changing anything.
    stale_turns: usize,
    min_rails: u32,
    cards_per_draw: usize,
}

impl GameState {
    /// Creates the state of a game once all players are set up.
    pub fn new(
        map: Arc<Map>,
        players: Vec<PlayerKnowledge>,
        deck: impl IntoIterator<Item = RailColor>,
        config: &GameConfig,
    ) -> Self {
        Self {
            map,
            active: players.into(),
            cheaters: Vec::new(),
            deck: deck.into_iter().collect(),
            stale_turns: 0,
            min_rails: config.min_rails,
            cards_per_draw: config.cards_per_draw,
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn phase(&self) -> GamePhase {
        if self.is_over() {
            GamePhase::Over
        } else {
            GamePhase::InProgress
        }
    }

    /// The game is over as soon as either:
    ///
    /// * no player is left;
    /// * the player whose turn it is has too few rails left;
    /// * every player had a turn in a row that changed nothing.
    pub fn is_over(&self) -> bool {
        match self.active.front() {
            None => true,
            Some(player) => {
                player.rails() <= self.min_rails || self.stale_turns >= self.active.len()
            }
        }
    }

    /// The player whose turn it is, if any is left.
    pub fn current_player(&self) -> Option<&PlayerKnowledge> {
        self.active.front()
    }

    /// Players still in the game, in turn order.
    pub fn active_players(&self) -> &VecDeque<PlayerKnowledge> {
        &self.active
    }

    pub fn cheaters(&self) -> &[PlayerKnowledge] {
        &self.cheaters
    }

    pub fn remaining_cards(&self) -> usize {
        self.deck.len()
    }

    pub fn stale_turns(&self) -> usize {
        self.stale_turns
    }

    /// What the current player is allowed to know about the game.
    pub fn current_view(&self) -> Option<PlayerView> {
        let own = self.active.front()?.clone();
        Some(PlayerView {
            own,
            others: self
                .active
                .iter()
                .skip(1)
                .map(|player| player.acquired().clone())
                .collect(),
        })
    }

    /// Whether a player, including one that was removed, owns the connection.
    pub fn is_occupied(&self, connection: &Connection) -> bool {
        self.active
            .iter()
            .chain(&self.cheaters)
            .any(|player| player.occupies(connection))
    }

    /// The current player attempts to acquire a connection.
    ///
    /// This is only allowed if the connection is on the map, nobody owns it, and the player
    /// has enough rails and cards to pay for it.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use trains::card::CardHand;
    /// use trains::color::RailColor::*;
    /// use trains::config::GameConfig;
    /// use trains::game_state::GameState;
    /// use trains::map::{Connection, Map};
    /// use trains::place::{Destination, Place};
    /// use trains::player::PlayerKnowledge;
    ///
    /// let bwi_bos = Connection::new("BWI", "BOS", Green, 4).unwrap();
    /// let places = vec![
    ///     Place::new("BOS", 10, 10).unwrap(),
    ///     Place::new("BWI", 20, 20).unwrap(),
    ///     Place::new("LAX", 30, 30).unwrap(),
    /// ];
    /// let map = Arc::new(Map::new(100, 100, places, vec![bwi_bos.clone()]).unwrap());
    /// let player = PlayerKnowledge::new(
    ///     Destination::new("BOS", "BWI").unwrap(),
    ///     Destination::new("BOS", "LAX").unwrap(),
    ///     CardHand::from_cards(&[Green; 4]),
    ///     45,
    /// );
    ///
    /// let state = GameState::new(map, vec![player], vec![], &GameConfig::default());
    /// let state = state.attempt_acquire(&bwi_bos).unwrap();
    ///
    /// let player = state.current_player().unwrap();
    /// assert!(player.occupies(&bwi_bos));
    /// assert_eq!(player.rails(), 41);
    /// assert_eq!(player.cards().count(Green), 0);
    ///
    /// // Nobody can acquire it twice.
    /// assert!(state.attempt_acquire(&bwi_bos).is_err());
    /// ```
    pub fn attempt_acquire(&self, connection: &Connection) -> TurnResult {
        let player = self
            .current_player()
            .ok_or_else(|| String::from("No player is left to acquire a connection."))?;

        if !self.map.contains(connection) {
            return Err(format!("{} is not on the map.", connection));
        }

        if self.is_occupied(connection) {
            return Err(format!("{} is already acquired.", connection));
        }

        if !player.can_acquire(connection) {
            return Err(format!(
                "Cannot afford {} with {} rails and {} {} cards.",
                connection,
                player.rails(),
                player.cards().count(connection.color()),
                connection.color()
            ));
        }

        let mut state = self.with_current_player(player.occupy(connection));
        state.stale_turns = 0;
        Ok(state)
    }

    /// The current player draws cards from the front of the deck, as many as allowed per draw
    /// or as many as are left.
    ///
    /// Returns the drawn cards alongside the new state. Drawing nothing counts as a stale turn.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use trains::card::CardHand;
    /// use trains::color::RailColor::*;
    /// use trains::config::GameConfig;
    /// use trains::game_state::GameState;
    /// use trains::map::Map;
    /// use trains::place::{Destination, Place};
    /// use trains::player::PlayerKnowledge;
    ///
    /// let places = vec![Place::new("A", 10, 10).unwrap()];
    /// let map = Arc::new(Map::new(100, 100, places, vec![]).unwrap());
    /// let player = PlayerKnowledge::new(
    ///     Destination::new("A", "B").unwrap(),
    ///     Destination::new("A", "C").unwrap(),
    ///     CardHand::new(),
    ///     45,
    /// );
    ///
    /// let state = GameState::new(map, vec![player], vec![Red], &GameConfig::default());
    ///
    /// let (cards, state) = state.attempt_request_cards();
    /// assert_eq!(cards.as_slice(), &[Red]);
    /// assert_eq!(state.remaining_cards(), 0);
    /// assert_eq!(state.stale_turns(), 0);
    ///
    /// let (cards, state) = state.attempt_request_cards();
    /// assert!(cards.is_empty());
    /// assert_eq!(state.stale_turns(), 1);
    /// ```
    pub fn attempt_request_cards(&self) -> (DrawnCards, GameState) {
        let player = match self.current_player() {
            Some(player) => player,
            None => return (DrawnCards::new(), self.clone()),
        };

        let num_cards = self.cards_per_draw.min(self.deck.len());
        let mut deck = self.deck.clone();
        let cards: DrawnCards = deck.drain(..num_cards).collect();

        let mut state = self.with_current_player(player.give_cards(&cards));
        state.deck = deck;
        state.stale_turns = if cards.is_empty() {
            self.stale_turns + 1
        } else {
            0
        };

        (cards, state)
    }

    /// Hands the turn over to the next player. The current player moves to the back of the queue.
    pub fn next_turn(&self) -> Self {
        let mut state = self.clone();
        state.active.rotate_left(1.min(state.active.len()));
        state
    }

    /// Removes the current player from the game.
    ///
    /// Their connections stay acquired: no one else may acquire them.
    pub fn remove_cheater(&self) -> Self {
        let mut state = self.clone();
        if let Some(cheater) = state.active.pop_front() {
            state.cheaters.push(cheater);
        }
        state
    }

    fn with_current_player(&self, player: PlayerKnowledge) -> Self {
        let mut state = self.clone();
        if let Some(current) = state.active.front_mut() {
            *current = player;
        }
        state
    }
}
