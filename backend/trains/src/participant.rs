//! The interface through which referees and tournament managers talk to players,
//! whether they run in this process or on the other end of a connection.

use crate::action::Action;
use crate::color::RailColor;
use crate::map::Map;
use crate::place::Destination;
use crate::player::PlayerView;
use crate::strategy::{Strategy, StrategyKind};

use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Ways in which a player can fail to answer a call.
///
/// The referee makes no difference between them: any fault gets the player removed.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerFault {
    /// The player did not answer in time.
    TimedOut,
    /// The player can no longer be reached.
    Disconnected(String),
    /// The player's answer could not be understood.
    Malformed(String),
    /// The player refused to answer.
    Declined(String),
}

impl fmt::Display for PlayerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerFault::TimedOut => write!(f, "the player did not answer in time"),
            PlayerFault::Disconnected(reason) => write!(f, "the player disconnected: {}", reason),
            PlayerFault::Malformed(reason) => write!(f, "the player answered nonsense: {}", reason),
            PlayerFault::Declined(reason) => write!(f, "the player declined: {}", reason),
        }
    }
}

impl std::error::Error for PlayerFault {}

/// All calls made to a player have the same `Result`: either the player's answer, or the reason
/// why they failed to give one.
pub type PlayerResult<T> = Result<T, PlayerFault>;

/// Calls a referee or a tournament manager makes to a player.
pub trait Player: Send {
    fn name(&self) -> &str;

    /// The tournament is starting. Returns the map the player would like to play on.
    fn start(&mut self, participating: bool) -> PlayerResult<Map>;

    /// A game is starting, on the given map, with the given rails and cards.
    fn setup(&mut self, map: &Map, rails: u32, cards: &[RailColor]) -> PlayerResult<()>;

    /// Out of the offered destinations, returns the ones the player does not want.
    fn pick(&mut self, offered: &BTreeSet<Destination>) -> PlayerResult<BTreeSet<Destination>>;

    /// It is the player's turn.
    fn play(&mut self, view: &PlayerView) -> PlayerResult<Action>;

    /// Cards drawn after the player requested some.
    fn more(&mut self, cards: &[RailColor]) -> PlayerResult<()>;

    /// The game is over.
    fn win(&mut self, won: bool) -> PlayerResult<()>;

    /// The tournament is over.
    fn end(&mut self, won: bool) -> PlayerResult<()>;
}

/// A player running in this process, driven by a [`Strategy`].
pub struct LocalPlayer {
    name: String,
    strategy: Box<dyn Strategy>,
    /// The map proposed when the tournament starts.
    proposed_map: Option<Map>,
    /// The map of the current game, once set up.
    map: Option<Map>,
    won_game: Option<bool>,
    won_tournament: Option<bool>,
}

impl LocalPlayer {
    pub fn new(name: impl Into<String>, strategy: Box<dyn Strategy>, proposed_map: Option<Map>) -> Self {
        Self {
            name: name.into(),
            strategy,
            proposed_map,
            map: None,
            won_game: None,
            won_tournament: None,
        }
    }

    /// A player using one of the known strategies.
    pub fn with_strategy(name: impl Into<String>, kind: StrategyKind, proposed_map: Option<Map>) -> Self {
        Self::new(name, kind.build(), proposed_map)
    }

    /// Whether the player won their last game, once they were told.
    pub fn won_game(&self) -> Option<bool> {
        self.won_game
    }

    /// Whether the player won the tournament, once they were told.
    pub fn won_tournament(&self) -> Option<bool> {
        self.won_tournament
    }
}

impl Player for LocalPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, _participating: bool) -> PlayerResult<Map> {
        self.proposed_map
            .clone()
            .ok_or_else(|| PlayerFault::Declined(String::from("no map to propose")))
    }

    fn setup(&mut self, map: &Map, rails: u32, cards: &[RailColor]) -> PlayerResult<()> {
        debug!(player = %self.name, rails, cards = cards.len(), "set up");
        self.map = Some(map.clone());
        self.won_game = None;
        Ok(())
    }

    fn pick(&mut self, offered: &BTreeSet<Destination>) -> PlayerResult<BTreeSet<Destination>> {
        Ok(self.strategy.choose_destinations(offered))
    }

    fn play(&mut self, view: &PlayerView) -> PlayerResult<Action> {
        let map = self
            .map
            .as_ref()
            .ok_or_else(|| PlayerFault::Declined(String::from("asked to play before set up")))?;

        Ok(self.strategy.take_turn(view, map))
    }

    fn more(&mut self, _cards: &[RailColor]) -> PlayerResult<()> {
        Ok(())
    }

    fn win(&mut self, won: bool) -> PlayerResult<()> {
        self.won_game = Some(won);
        Ok(())
    }

    fn end(&mut self, won: bool) -> PlayerResult<()> {
        self.won_tournament = Some(won);
        Ok(())
    }
}
