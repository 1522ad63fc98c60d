//! Decision-making of players, independently of how they communicate with a referee.

use crate::action::Action;
use crate::color::RailColor;
use crate::map::{Connection, Map};
use crate::place::Destination;
use crate::player::PlayerView;

use std::collections::BTreeSet;
use strum_macros::{Display, EnumIter, EnumString};

// Every strategy keeps this many of the destinations it is offered.
const DESTINATIONS_KEPT: usize = 2;

// Hold-10 keeps drawing cards until it holds more than this many.
const HOLD_TEN_CARD_LIMIT: u32 = 10;

/// How a player makes decisions.
pub trait Strategy: Send {
    /// Out of the offered destinations, picks the ones to hand back.
    fn choose_destinations(&self, offered: &BTreeSet<Destination>) -> BTreeSet<Destination>;

    /// Decides what to do on a turn, knowing the map of the game.
    fn take_turn(&self, view: &PlayerView, map: &Map) -> Action;
}

/// Requests cards as long as it holds ten or fewer, then acquires the first connection it can.
///
/// Keeps the first two destinations offered, in lexicographic order.
#[derive(Clone, Copy, Debug, Default)]
pub struct HoldTen;

impl Strategy for HoldTen {
    fn choose_destinations(&self, offered: &BTreeSet<Destination>) -> BTreeSet<Destination> {
        offered.iter().skip(DESTINATIONS_KEPT).cloned().collect()
    }

    fn take_turn(&self, view: &PlayerView, map: &Map) -> Action {
        if view.own.cards().total() <= HOLD_TEN_CARD_LIMIT {
            return Action::MoreCards;
        }

        first_acquirable(view, map)
    }
}

/// Acquires the first connection it can, and only requests cards when it cannot acquire any.
///
/// Keeps the last two destinations offered, in lexicographic order.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuyNow;

impl Strategy for BuyNow {
    fn choose_destinations(&self, offered: &BTreeSet<Destination>) -> BTreeSet<Destination> {
        let returned = offered.len().saturating_sub(DESTINATIONS_KEPT);
        offered.iter().take(returned).cloned().collect()
    }

    fn take_turn(&self, view: &PlayerView, map: &Map) -> Action {
        first_acquirable(view, map)
    }
}

/// Picks destinations like [`BuyNow`], then always attempts to acquire a connection that is not on the map.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cheat;

impl Strategy for Cheat {
    fn choose_destinations(&self, offered: &BTreeSet<Destination>) -> BTreeSet<Destination> {
        BuyNow.choose_destinations(offered)
    }

    fn take_turn(&self, _view: &PlayerView, map: &Map) -> Action {
        match connection_off_the_map(map) {
            Some(connection) => Action::Acquire(connection),
            None => Action::MoreCards,
        }
    }
}

fn first_acquirable(view: &PlayerView, map: &Map) -> Action {
    match view.acquirable(map).next() {
        Some(connection) => Action::Acquire(connection.clone()),
        None => Action::MoreCards,
    }
}

fn connection_off_the_map(map: &Map) -> Option<Connection> {
    let mut name = String::from("Nowhere");
    while map.place(&name).is_some() {
        name.push('.');
    }

    let other = map.places().next().map(|place| place.name().to_owned())?;
    Connection::new(name, other, RailColor::Red, 3).ok()
}

/// All known strategies, looked up by name.
///
/// # Example
/// ```
/// use trains::strategy::StrategyKind;
///
/// assert_eq!("hold-10".parse::<StrategyKind>(), Ok(StrategyKind::HoldTen));
/// assert_eq!("buy-now".parse::<StrategyKind>(), Ok(StrategyKind::BuyNow));
/// assert!("random".parse::<StrategyKind>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    #[strum(serialize = "hold-10")]
    HoldTen,
    BuyNow,
    Cheat,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::HoldTen => Box::new(HoldTen),
            StrategyKind::BuyNow => Box::new(BuyNow),
            StrategyKind::Cheat => Box::new(Cheat),
        }
    }
}

/// Builds the strategy registered under the given name, if any.
pub fn strategy_by_name(name: &str) -> Option<Box<dyn Strategy>> {
    name.parse::<StrategyKind>().ok().map(StrategyKind::build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RailColor::*;
    use crate::map::tests::{connection, sample_map};
    use crate::player::tests::{destination, player};
    use strum::IntoEnumIterator;

    fn offer() -> BTreeSet<Destination> {
        BTreeSet::from([
            destination("Austin", "Boston"),
            destination("Austin", "Chicago"),
            destination("Boston", "Chicago"),
            destination("Denver", "Eugene"),
            destination("Austin", "Eugene"),
        ])
    }

    fn view_with_cards(cards: &[RailColor]) -> PlayerView {
        PlayerView {
            own: player(("Austin", "Boston"), ("Austin", "Chicago"), cards),
            others: vec![],
        }
    }

    #[test]
    fn registry_round_trips_names() {
        for kind in StrategyKind::iter() {
            assert_eq!(kind.to_string().parse::<StrategyKind>(), Ok(kind));
        }
        assert!(strategy_by_name("cheat").is_some());
        assert!(strategy_by_name("hold 10").is_none());
    }

    #[test]
    fn hold_ten_keeps_first_destinations() {
        assert_eq!(
            HoldTen.choose_destinations(&offer()),
            BTreeSet::from([
                destination("Boston", "Chicago"),
                destination("Denver", "Eugene"),
                destination("Austin", "Eugene"),
            ])
        );
    }

    #[test]
    fn buy_now_keeps_last_destinations() {
        assert_eq!(
            BuyNow.choose_destinations(&offer()),
            BTreeSet::from([
                destination("Austin", "Boston"),
                destination("Austin", "Chicago"),
                destination("Austin", "Eugene"),
            ])
        );
    }

    #[test]
    fn hold_ten_requests_cards_with_few_cards() {
        let map = sample_map();
        assert_eq!(HoldTen.take_turn(&view_with_cards(&[Red; 10]), &map), Action::MoreCards);
    }

    #[test]
    fn hold_ten_acquires_with_many_cards() {
        let map = sample_map();
        assert_eq!(
            HoldTen.take_turn(&view_with_cards(&[Red; 11]), &map),
            Action::Acquire(connection("Austin", "Boston", Red, 3))
        );
    }

    #[test]
    fn buy_now_acquires_first_lexicographic_connection() {
        let map = sample_map();
        let mut view = view_with_cards(&[Red, Red, Red, Green, Green, Green, Green]);
        assert_eq!(
            BuyNow.take_turn(&view, &map),
            Action::Acquire(connection("Austin", "Boston", Red, 3))
        );

        view.others.push(BTreeSet::from([connection("Austin", "Boston", Red, 3)]));
        assert_eq!(
            BuyNow.take_turn(&view, &map),
            Action::Acquire(connection("Boston", "Chicago", Green, 4))
        );
    }

    #[test]
    fn buy_now_requests_cards_when_nothing_is_affordable() {
        let map = sample_map();
        assert_eq!(BuyNow.take_turn(&view_with_cards(&[]), &map), Action::MoreCards);
    }

    #[test]
    fn cheat_acquires_connection_off_the_map() {
        let map = sample_map();
        match Cheat.take_turn(&view_with_cards(&[Red; 20]), &map) {
            Action::Acquire(connection) => assert!(!map.contains(&connection)),
            Action::MoreCards => panic!("cheat should attempt an acquisition"),
        }
    }
}
