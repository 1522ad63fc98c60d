use crate::card::CardHand;
use crate::color::RailColor;
use crate::map::{Connection, Map};
use crate::place::Destination;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Each unit of length of an acquired connection is worth a point.
const POINTS_PER_SEGMENT: i32 = 1;
// Granted for a connected destination, and substracted for one that isn't.
const POINTS_PER_DESTINATION: i32 = 10;
// Granted to everyone tied for the longest path of the game.
const LONGEST_PATH_BONUS: i32 = 20;

/// Everything the referee knows about a player, and what the player knows about themselves.
///
/// Knowledge is never mutated: every update returns a new value.
///
/// The destinations are fixed at setup, and never shared between two players of the same game.
/// They are therefore used to tell players apart.
///
/// # JSON
/// ```json
/// {
///   "destination1": ["Austin", "Boston"],
///   "destination2": ["Boston", "Chicago"],
///   "rails": 41,
///   "cards": {"red": 2},
///   "acquired": [["Austin", "Boston", "green", 4]]
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PlayerKnowledge {
    destination1: Destination,
    destination2: Destination,
    rails: u32,
    cards: CardHand,
    acquired: BTreeSet<Connection>,
}

impl PlayerKnowledge {
    /// Knowledge of a player who has not acquired anything yet.
    pub fn new(first: Destination, second: Destination, cards: CardHand, rails: u32) -> Self {
        let (destination1, destination2) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };

        Self {
            destination1,
            destination2,
            rails,
            cards,
            acquired: BTreeSet::new(),
        }
    }

    /// Both destinations, in lexicographic order.
    pub fn destinations(&self) -> (&Destination, &Destination) {
        (&self.destination1, &self.destination2)
    }

    /// Identifies the player within a game.
    pub fn key(&self) -> (Destination, Destination) {
        (self.destination1.clone(), self.destination2.clone())
    }

    pub fn rails(&self) -> u32 {
        self.rails
    }

    pub fn cards(&self) -> &CardHand {
        &self.cards
    }

    pub fn acquired(&self) -> &BTreeSet<Connection> {
        &self.acquired
    }

    /// Whether the player has enough rails, and enough cards of the right color, to acquire the
    /// given connection. Whether someone else owns the connection is not checked here.
    ///
    /// # Example
    /// ```
    /// use trains::card::CardHand;
    /// use trains::color::RailColor::*;
    /// use trains::map::Connection;
    /// use trains::place::Destination;
    /// use trains::player::PlayerKnowledge;
    ///
    /// let player = PlayerKnowledge::new(
    ///     Destination::new("BOS", "BWI").unwrap(),
    ///     Destination::new("BOS", "LAX").unwrap(),
    ///     CardHand::from_cards(&[Green, Green, Green, Green]),
    ///     45,
    /// );
    ///
    /// assert!(player.can_acquire(&Connection::new("BWI", "BOS", Green, 4).unwrap()));
    /// assert!(!player.can_acquire(&Connection::new("BWI", "BOS", Green, 5).unwrap()));
    /// assert!(!player.can_acquire(&Connection::new("BWI", "BOS", Red, 4).unwrap()));
    /// ```
    pub fn can_acquire(&self, connection: &Connection) -> bool {
        let length = connection.length() as u32;
        self.rails >= length && self.cards.count(connection.color()) >= length
    }

    /// Returns the knowledge of the player after acquiring the given connection.
    ///
    /// Callers are expected to have checked [`PlayerKnowledge::can_acquire`] beforehand.
    pub fn occupy(&self, connection: &Connection) -> Self {
        let length = connection.length() as u32;
        let mut acquired = self.acquired.clone();
        acquired.insert(connection.clone());

        Self {
            rails: self.rails.saturating_sub(length),
            cards: self.cards.without(connection.color(), length),
            acquired,
            ..self.clone()
        }
    }

    /// Returns the knowledge of the player after receiving the given cards.
    pub fn give_cards(&self, cards: &[RailColor]) -> Self {
        Self {
            cards: self.cards.with_cards(cards),
            ..self.clone()
        }
    }

    /// Whether the player has acquired the given connection.
    pub fn occupies(&self, connection: &Connection) -> bool {
        self.acquired.contains(connection)
    }

    /// Points for the length of all acquired connections.
    pub fn segment_points(&self) -> i32 {
        self.acquired
            .iter()
            .map(|connection| connection.length() as i32 * POINTS_PER_SEGMENT)
            .sum()
    }

    /// Points won for every connected destination, and lost for every other one.
    pub fn destination_points(&self) -> i32 {
        [&self.destination1, &self.destination2]
            .into_iter()
            .map(|destination| {
                let (start, end) = destination.places();
                if Map::are_connected(&self.acquired, start, end) {
                    POINTS_PER_DESTINATION
                } else {
                    -POINTS_PER_DESTINATION
                }
            })
            .sum()
    }

    /// Length of the longest simple path the player can walk on their own connections.
    pub fn longest_path(&self) -> u32 {
        Map::longest_path(&self.acquired)
    }
}

/// Scores every player of a game, in the same order as given.
///
/// The longest path bonus depends on the other players, so scores are computed together.
///
/// # Example
/// ```
/// use trains::card::CardHand;
/// use trains::color::RailColor::*;
/// use trains::map::Connection;
/// use trains::place::Destination;
/// use trains::player::{score_players, PlayerKnowledge};
///
/// let player = PlayerKnowledge::new(
///     Destination::new("BOS", "BWI").unwrap(),
///     Destination::new("BOS", "LAX").unwrap(),
///     CardHand::from_cards(&[Green, Green, Green, Green]),
///     45,
/// )
/// .occupy(&Connection::new("BWI", "BOS", Green, 4).unwrap());
///
/// // 4 points for the connection, +10 and -10 for the destinations, +20 for the longest path.
/// assert_eq!(score_players(&[player]), vec![24]);
/// ```
pub fn score_players(players: &[PlayerKnowledge]) -> Vec<i32> {
    let longest_paths: Vec<u32> = players.iter().map(PlayerKnowledge::longest_path).collect();
    let longest_path = longest_paths.iter().copied().max();

    players
        .iter()
        .zip(&longest_paths)
        .map(|(player, path)| {
            let bonus = if Some(*path) == longest_path {
                LONGEST_PATH_BONUS
            } else {
                0
            };
            player.segment_points() + player.destination_points() + bonus
        })
        .collect()
}

/// What a player is shown when it is their turn: their own knowledge, and the connections
/// acquired by every other player still in the game, in turn order.
///
/// # JSON
/// ```json
/// {"this": { ... }, "acquired": [[["Austin", "Boston", "green", 4]], []]}
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    #[serde(rename = "this")]
    pub own: PlayerKnowledge,
    #[serde(rename = "acquired")]
    pub others: Vec<BTreeSet<Connection>>,
}

impl PlayerView {
    /// Whether anyone in the game already owns the given connection.
    pub fn is_occupied(&self, connection: &Connection) -> bool {
        self.own.occupies(connection) || self.others.iter().any(|acquired| acquired.contains(connection))
    }

    /// Connections of the map the player could acquire right now, in lexicographic order.
    pub fn acquirable<'a>(&'a self, map: &'a Map) -> impl Iterator<Item = &'a Connection> + 'a {
        map.connections()
            .iter()
            .filter(move |connection| !self.is_occupied(connection) && self.own.can_acquire(connection))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::color::RailColor::*;
    use crate::map::tests::connection;
    use pretty_assertions::assert_eq;

    pub(crate) fn destination(a: &str, b: &str) -> Destination {
        Destination::new(a, b).unwrap()
    }

    pub(crate) fn player(first: (&str, &str), second: (&str, &str), cards: &[RailColor]) -> PlayerKnowledge {
        PlayerKnowledge::new(
            destination(first.0, first.1),
            destination(second.0, second.1),
            CardHand::from_cards(cards),
            45,
        )
    }

    #[test]
    fn destinations_are_sorted() {
        let knowledge = player(("C", "D"), ("A", "B"), &[]);
        assert_eq!(
            knowledge.destinations(),
            (&destination("A", "B"), &destination("C", "D"))
        );
        assert_eq!(knowledge, player(("A", "B"), ("C", "D"), &[]));
    }

    #[test]
    fn acquire_scenario() {
        let bwi_bos = connection("BWI", "BOS", Green, 4);
        let knowledge = player(("BOS", "BWI"), ("BOS", "LAX"), &[Green, Green, Green, Green]);

        assert!(knowledge.can_acquire(&bwi_bos));

        let knowledge = knowledge.occupy(&bwi_bos);
        assert!(knowledge.occupies(&bwi_bos));
        assert_eq!(knowledge.rails(), 41);
        assert_eq!(knowledge.cards().count(Green), 0);
        assert!(!knowledge.can_acquire(&bwi_bos));
    }

    #[test]
    fn cannot_acquire_without_rails() {
        let knowledge = PlayerKnowledge::new(
            destination("A", "B"),
            destination("A", "C"),
            CardHand::from_cards(&[Red, Red, Red, Red, Red]),
            4,
        );

        assert!(knowledge.can_acquire(&connection("A", "B", Red, 4)));
        assert!(!knowledge.can_acquire(&connection("A", "B", Red, 5)));
    }

    #[test]
    fn occupy_never_grows_rails_or_cards() {
        let connections = [
            connection("A", "B", Red, 3),
            connection("B", "C", Red, 4),
            connection("C", "D", Blue, 3),
        ];
        let mut knowledge = player(("A", "B"), ("C", "D"), &[Red; 7]).give_cards(&[Blue; 3]);

        for connection in &connections {
            let before = knowledge.clone();
            knowledge = knowledge.occupy(connection);

            assert!(knowledge.rails() <= before.rails());
            assert!(knowledge.cards().total() <= before.cards().total());
            assert!(knowledge.acquired().is_superset(before.acquired()));
        }

        assert_eq!(knowledge.acquired().len(), 3);
        assert_eq!(knowledge.rails(), 35);
        assert_eq!(knowledge.cards().total(), 0);
    }

    #[test]
    fn give_cards_adds_to_hand() {
        let knowledge = player(("A", "B"), ("C", "D"), &[Red]).give_cards(&[Red, White]);
        assert_eq!(knowledge.cards().count(Red), 2);
        assert_eq!(knowledge.cards().count(White), 1);
    }

    #[test]
    fn destination_points() {
        let knowledge = player(("A", "C"), ("A", "D"), &[Red; 10])
            .occupy(&connection("A", "B", Red, 3))
            .occupy(&connection("B", "C", Red, 3));

        // A to C is connected through B, A to D is not.
        assert_eq!(knowledge.destination_points(), 0);
        assert_eq!(knowledge.segment_points(), 6);
    }

    #[test]
    fn longest_path_bonus_is_shared_on_ties() {
        let first = player(("A", "B"), ("A", "C"), &[Red; 10]).occupy(&connection("A", "B", Red, 5));
        let second = player(("C", "D"), ("C", "E"), &[Blue; 10]).occupy(&connection("C", "D", Blue, 5));
        let third = player(("E", "F"), ("E", "G"), &[White; 10]).occupy(&connection("E", "F", White, 3));

        // first: 5 + 10 - 10 + 20, second: 5 + 10 - 10 + 20, third: 3 + 10 - 10.
        assert_eq!(score_players(&[first, second, third]), vec![25, 25, 3]);
    }

    #[test]
    fn everyone_ties_without_connections() {
        let first = player(("A", "B"), ("A", "C"), &[]);
        let second = player(("C", "D"), ("C", "E"), &[]);

        assert_eq!(score_players(&[first, second]), vec![0, 0]);
    }

    #[test]
    fn no_scores_without_players() {
        assert!(score_players(&[]).is_empty());
    }

    #[test]
    fn knowledge_to_json() -> serde_json::Result<()> {
        let knowledge = player(("BOS", "BWI"), ("BOS", "LAX"), &[Green, Green, Green, Green, Red])
            .occupy(&connection("BWI", "BOS", Green, 4));

        assert_eq!(
            serde_json::to_value(&knowledge)?,
            serde_json::json!({
                "destination1": ["BOS", "BWI"],
                "destination2": ["BOS", "LAX"],
                "rails": 41,
                "cards": {"red": 1},
                "acquired": [["BOS", "BWI", "green", 4]]
            })
        );
        Ok(())
    }

    #[test]
    fn json_to_view() -> serde_json::Result<()> {
        let view = serde_json::from_str::<PlayerView>(
            r#"{
                "this": {
                    "destination1": ["A", "B"],
                    "destination2": ["A", "C"],
                    "rails": 45,
                    "cards": {"white": 3},
                    "acquired": []
                },
                "acquired": [[["B", "C", "red", 3]], []]
            }"#,
        )?;

        assert_eq!(view.own.cards().count(White), 3);
        assert_eq!(view.others.len(), 2);
        assert!(view.is_occupied(&connection("C", "B", Red, 3)));
        assert!(!view.is_occupied(&connection("A", "B", Red, 3)));
        Ok(())
    }

    #[test]
    fn acquirable_skips_occupied_and_unaffordable() {
        let map = crate::map::tests::sample_map();
        let view = PlayerView {
            own: player(("Austin", "Boston"), ("Austin", "Chicago"), &[Red, Red, Red, White, White, White]),
            others: vec![BTreeSet::from([connection("Austin", "Chicago", White, 3)])],
        };

        assert_eq!(
            view.acquirable(&map).collect::<Vec<_>>(),
            vec![&connection("Austin", "Boston", Red, 3)]
        );
    }
}
