//! Runs a single game, from setup to the announcement of its winners.

use crate::action::Action;
use crate::card::CardHand;
use crate::color::RailColor;
use crate::config::GameConfig;
use crate::game_state::GameState;
use crate::map::Map;
use crate::participant::Player;
use crate::place::Destination;
use crate::player::{score_players, PlayerKnowledge};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The order in which destinations are offered to players during setup. Each player is offered
/// the first destinations that were not kept by players before them.
pub type DestinationOrder = fn(&Destination, &Destination) -> Ordering;

/// Reasons why a game cannot even start.
#[derive(Clone, Debug, PartialEq)]
pub enum SetupError {
    /// The number of players is outside of the allowed range.
    PlayerCount(usize),
    /// The map cannot offer every player their own destinations.
    NotEnoughDestinations,
    /// The deck does not hold the expected number of cards.
    DeckSize { expected: usize, actual: usize },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::PlayerCount(count) => write!(f, "cannot play a game with {} players", count),
            SetupError::NotEnoughDestinations => {
                write!(f, "the map does not have enough destinations for every player")
            }
            SetupError::DeckSize { expected, actual } => {
                write!(f, "the deck holds {} cards instead of {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// How a game ended. Players are referred to by their index in the slice the game was run with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameOutcome {
    /// Players who were not removed, grouped by equal score, highest score first.
    /// Within a group, players are in index order.
    pub ranking: Vec<Vec<usize>>,
    /// Players who misbehaved at any point of the game, in index order.
    pub cheaters: Vec<usize>,
    /// Final score of every ranked player.
    pub scores: BTreeMap<usize, i32>,
}

impl GameOutcome {
    /// The players sharing the highest score, if anyone was ranked.
    pub fn winners(&self) -> &[usize] {
        self.ranking.first().map(Vec::as_slice).unwrap_or_default()
    }
}

/// Runs a game between the given players, on the given map, with the given deck.
///
/// Setup is attempted with every player in order. Then players take turns until the game is over,
/// and are finally told whether they won. Any player who faults, or attempts something illegal, is
/// removed from the game and reported as a cheater.
///
/// The only errors are those preventing the game from starting at all.
pub fn run_game(
    players: &mut [Box<dyn Player>],
    map: &Arc<Map>,
    deck: &[RailColor],
    config: &GameConfig,
) -> Result<GameOutcome, SetupError> {
    run_game_with_order(players, map, deck, config, Destination::cmp)
}

/// Runs a game like [`run_game`], offering destinations at setup in the given order rather
/// than lexicographically.
#[instrument(skip_all, fields(players = players.len()))]
pub fn run_game_with_order(
    players: &mut [Box<dyn Player>],
    map: &Arc<Map>,
    deck: &[RailColor],
    config: &GameConfig,
    order: DestinationOrder,
) -> Result<GameOutcome, SetupError> {
    if !(config.min_players..=config.max_players).contains(&players.len()) {
        return Err(SetupError::PlayerCount(players.len()));
    }

    if !config.fits_map(map, players.len()) {
        return Err(SetupError::NotEnoughDestinations);
    }

    if deck.len() != config.deck_size {
        return Err(SetupError::DeckSize {
            expected: config.deck_size,
            actual: deck.len(),
        });
    }

    let mut cheaters = BTreeSet::new();
    let (knowledge, actors, dealt) = set_up_players(players, map, deck, config, order, &mut cheaters);

    let mut state = GameState::new(Arc::clone(map), knowledge, deck[dealt..].iter().copied(), config);
    while !state.is_over() {
        let index = match state.current_player().and_then(|current| actors.get(&current.key())) {
            Some(index) => *index,
            None => break,
        };

        state = play_turn(players[index].as_mut(), &state);
    }

    for cheater in state.cheaters() {
        if let Some(index) = actors.get(&cheater.key()) {
            cheaters.insert(*index);
        }
    }

    let active: Vec<PlayerKnowledge> = state.active_players().iter().cloned().collect();
    let scores: BTreeMap<usize, i32> = active
        .iter()
        .zip(score_players(&active))
        .filter_map(|(player, score)| actors.get(&player.key()).map(|index| (*index, score)))
        .collect();
    let ranking = rank(&scores);
    info!(?ranking, ?scores, "game over");

    for (position, group) in ranking.iter().enumerate() {
        for &index in group {
            if let Err(fault) = players[index].win(position == 0) {
                warn!(player = players[index].name(), %fault, "could not be told the result");
                cheaters.insert(index);
            }
        }
    }

    Ok(GameOutcome {
        ranking,
        cheaters: cheaters.into_iter().collect(),
        scores,
    })
}

/// Sets up every player in order, handing them cards and letting them pick destinations.
///
/// Returns the knowledge of players who were set up properly, who they are, and how many cards
/// were dealt. Cards dealt to players who misbehaved are not returned to the deck.
fn set_up_players(
    players: &mut [Box<dyn Player>],
    map: &Map,
    deck: &[RailColor],
    config: &GameConfig,
    order: DestinationOrder,
    cheaters: &mut BTreeSet<usize>,
) -> (
    Vec<PlayerKnowledge>,
    BTreeMap<(Destination, Destination), usize>,
    usize,
) {
    let mut available: Vec<Destination> = map.destinations().into_iter().collect();
    available.sort_by(order);
    let mut knowledge = Vec::with_capacity(players.len());
    let mut actors = BTreeMap::new();
    let mut dealt = 0;

    for (index, player) in players.iter_mut().enumerate() {
        let end = (dealt + config.starting_cards).min(deck.len());
        let cards = &deck[dealt..end];
        dealt = end;

        let offered: BTreeSet<Destination> = available
            .iter()
            .take(config.destinations_offered)
            .cloned()
            .collect();

        match set_up_player(player.as_mut(), map, cards, &offered, config) {
            Ok(kept) => {
                available.retain(|destination| {
                    destination != &kept.destination1 && destination != &kept.destination2
                });
                let player_knowledge = PlayerKnowledge::new(
                    kept.destination1,
                    kept.destination2,
                    CardHand::from_cards(cards),
                    config.starting_rails,
                );
                actors.insert(player_knowledge.key(), index);
                knowledge.push(player_knowledge);
            }
            Err(reason) => {
                warn!(player = player.name(), %reason, "removed during setup");
                cheaters.insert(index);
            }
        }
    }

    (knowledge, actors, dealt)
}

struct Kept {
    destination1: Destination,
    destination2: Destination,
}

fn set_up_player(
    player: &mut dyn Player,
    map: &Map,
    cards: &[RailColor],
    offered: &BTreeSet<Destination>,
    config: &GameConfig,
) -> Result<Kept, String> {
    player
        .setup(map, config.starting_rails, cards)
        .map_err(|fault| fault.to_string())?;
    let returned = player.pick(offered).map_err(|fault| fault.to_string())?;

    if returned.len() != config.destinations_returned() || !returned.is_subset(offered) {
        return Err(format!(
            "returned {} destinations instead of {} of the offered ones",
            returned.len(),
            config.destinations_returned()
        ));
    }

    let mut kept = offered.difference(&returned).cloned();
    match (kept.next(), kept.next(), kept.next()) {
        (Some(destination1), Some(destination2), None) => {
            debug!(player = player.name(), %destination1, %destination2, "set up");
            Ok(Kept {
                destination1,
                destination2,
            })
        }
        _ => Err(String::from("did not keep exactly two destinations")),
    }
}

/// Lets the current player take their turn. The turn only moves on if they behaved.
fn play_turn(player: &mut dyn Player, state: &GameState) -> GameState {
    let view = match state.current_view() {
        Some(view) => view,
        None => return state.clone(),
    };

    let action = match player.play(&view) {
        Ok(action) => action,
        Err(fault) => return remove_cheater(player, state, fault),
    };
    debug!(player = player.name(), %action, "played");

    match action {
        Action::MoreCards => {
            let (cards, state) = state.attempt_request_cards();
            if !cards.is_empty() {
                if let Err(fault) = player.more(&cards) {
                    return remove_cheater(player, &state, fault);
                }
            }
            state.next_turn()
        }
        Action::Acquire(connection) => match state.attempt_acquire(&connection) {
            Ok(state) => state.next_turn(),
            Err(reason) => remove_cheater(player, state, reason),
        },
    }
}

fn remove_cheater(player: &dyn Player, state: &GameState, reason: impl fmt::Display) -> GameState {
    warn!(player = player.name(), %reason, "removed from the game");
    state.remove_cheater()
}

/// Groups players by equal score, highest first.
fn rank(scores: &BTreeMap<usize, i32>) -> Vec<Vec<usize>> {
    let mut by_score: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (&index, &score) in scores {
        by_score.entry(score).or_default().push(index);
    }

    by_score.into_values().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tests::{game_map, sample_map};
    use crate::participant::tests::{FailOn, FaultyPlayer};
    use crate::participant::{LocalPlayer, PlayerResult};
    use crate::player::PlayerView;
    use crate::strategy::{Strategy, StrategyKind};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use strum::IntoEnumIterator;

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Plays like a local player, and writes down every call it receives.
    struct Recorder {
        inner: LocalPlayer,
        calls: Calls,
    }

    impl Recorder {
        fn boxed(name: &str, kind: StrategyKind, calls: &Calls) -> Box<dyn Player> {
            Box::new(Self {
                inner: LocalPlayer::with_strategy(name, kind, None),
                calls: Arc::clone(calls),
            })
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(format!("{} {}", self.inner.name(), call));
        }
    }

    impl Player for Recorder {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn start(&mut self, participating: bool) -> PlayerResult<Map> {
            self.inner.start(participating)
        }

        fn setup(&mut self, map: &Map, rails: u32, cards: &[RailColor]) -> PlayerResult<()> {
            self.record(format!("setup {} {:?}", rails, cards));
            self.inner.setup(map, rails, cards)
        }

        fn pick(&mut self, offered: &BTreeSet<Destination>) -> PlayerResult<BTreeSet<Destination>> {
            let offered_names: Vec<String> = offered.iter().map(ToString::to_string).collect();
            self.record(format!("pick {}", offered_names.join(", ")));
            self.inner.pick(offered)
        }

        fn play(&mut self, view: &PlayerView) -> PlayerResult<Action> {
            self.inner.play(view)
        }

        fn more(&mut self, cards: &[RailColor]) -> PlayerResult<()> {
            self.record(format!("more {}", cards.len()));
            self.inner.more(cards)
        }

        fn win(&mut self, won: bool) -> PlayerResult<()> {
            self.record(format!("win {}", won));
            self.inner.win(won)
        }

        fn end(&mut self, won: bool) -> PlayerResult<()> {
            self.inner.end(won)
        }
    }

    /// Keeps every destination it is offered.
    struct Greedy;

    impl Strategy for Greedy {
        fn choose_destinations(&self, _offered: &BTreeSet<Destination>) -> BTreeSet<Destination> {
            BTreeSet::new()
        }

        fn take_turn(&self, _view: &PlayerView, _map: &Map) -> Action {
            Action::MoreCards
        }
    }

    fn deck() -> Vec<RailColor> {
        RailColor::iter().cycle().take(250).collect()
    }

    fn local(name: &str, kind: StrategyKind) -> Box<dyn Player> {
        Box::new(LocalPlayer::with_strategy(name, kind, None))
    }

    fn faulty(name: &str, kind: StrategyKind, fail_on: FailOn) -> Box<dyn Player> {
        Box::new(FaultyPlayer::new(name, kind, fail_on))
    }

    fn play(players: &mut [Box<dyn Player>]) -> GameOutcome {
        run_game(players, &Arc::new(game_map()), &deck(), &GameConfig::default()).unwrap()
    }

    fn ranked(outcome: &GameOutcome) -> BTreeSet<usize> {
        outcome.ranking.iter().flatten().copied().collect()
    }

    #[test]
    fn too_few_or_too_many_players() {
        let map = Arc::new(game_map());
        let config = GameConfig::default();

        let mut players = vec![local("alice", StrategyKind::BuyNow)];
        assert_eq!(
            run_game(&mut players, &map, &deck(), &config),
            Err(SetupError::PlayerCount(1))
        );

        let mut players: Vec<_> = (0..9)
            .map(|i| local(&format!("player{}", i), StrategyKind::BuyNow))
            .collect();
        assert_eq!(
            run_game(&mut players, &map, &deck(), &config),
            Err(SetupError::PlayerCount(9))
        );
    }

    #[test]
    fn map_without_enough_destinations() {
        let mut players = vec![
            local("alice", StrategyKind::BuyNow),
            local("bob", StrategyKind::BuyNow),
        ];
        assert_eq!(
            run_game(&mut players, &Arc::new(sample_map()), &deck(), &GameConfig::default()),
            Err(SetupError::NotEnoughDestinations)
        );
    }

    #[test]
    fn deck_of_wrong_size() {
        let mut players = vec![
            local("alice", StrategyKind::BuyNow),
            local("bob", StrategyKind::BuyNow),
        ];
        assert_eq!(
            run_game(&mut players, &Arc::new(game_map()), &deck()[..10], &GameConfig::default()),
            Err(SetupError::DeckSize {
                expected: 250,
                actual: 10
            })
        );
    }

    #[test]
    fn well_behaved_players_are_all_ranked() {
        let mut players = vec![
            local("alice", StrategyKind::BuyNow),
            local("bob", StrategyKind::HoldTen),
            local("carol", StrategyKind::BuyNow),
        ];
        let outcome = play(&mut players);

        assert!(outcome.cheaters.is_empty());
        assert_eq!(ranked(&outcome), BTreeSet::from([0, 1, 2]));
        assert_eq!(outcome.scores.len(), 3);

        let scores: Vec<i32> = outcome
            .ranking
            .iter()
            .map(|group| outcome.scores[&group[0]])
            .collect();
        assert!(scores.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn setup_deals_cards_and_distinct_destinations_in_order() {
        let calls = Calls::default();
        let mut players = vec![
            Recorder::boxed("alice", StrategyKind::HoldTen, &calls),
            Recorder::boxed("bob", StrategyKind::HoldTen, &calls),
        ];
        play(&mut players);

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls[..4],
            [
                "alice setup 45 [Blue, Green, Red, White]",
                "alice pick Atlanta to Boston, Atlanta to Chicago, Atlanta to Dallas, Atlanta to El Paso, Atlanta to Fresno",
                "bob setup 45 [Blue, Green, Red, White]",
                "bob pick Atlanta to Dallas, Atlanta to El Paso, Atlanta to Fresno, Atlanta to Houston, Atlanta to Irvine",
            ]
        );
    }

    #[test]
    fn winners_and_losers_are_told() {
        let calls = Calls::default();
        let mut players = vec![
            Recorder::boxed("alice", StrategyKind::BuyNow, &calls),
            Recorder::boxed("bob", StrategyKind::BuyNow, &calls),
        ];
        let outcome = play(&mut players);

        let calls = calls.lock().unwrap();
        for (index, name) in ["alice", "bob"].iter().enumerate() {
            let won = outcome.winners().contains(&index);
            assert!(calls.contains(&format!("{} win {}", name, won)));
        }
    }

    #[test]
    fn players_only_get_more_cards_when_some_were_drawn() {
        let calls = Calls::default();
        let mut players = vec![
            Recorder::boxed("alice", StrategyKind::HoldTen, &calls),
            Recorder::boxed("bob", StrategyKind::HoldTen, &calls),
        ];
        play(&mut players);

        let calls = calls.lock().unwrap();
        assert!(calls.iter().any(|call| call.ends_with("more 2")));
        assert!(!calls.iter().any(|call| call.ends_with("more 0")));
    }

    #[test]
    fn player_failing_setup_does_not_take_destinations() {
        let calls = Calls::default();
        let mut players = vec![
            faulty("mallory", StrategyKind::BuyNow, FailOn::Pick),
            Recorder::boxed("alice", StrategyKind::BuyNow, &calls),
            Recorder::boxed("bob", StrategyKind::BuyNow, &calls),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![0]);
        assert_eq!(ranked(&outcome), BTreeSet::from([1, 2]));

        let calls = calls.lock().unwrap();
        // Cards dealt to mallory are gone, but not the destinations they were offered.
        assert_eq!(calls[0], "alice setup 45 [Blue, Green, Red, White]");
        assert!(calls[1].starts_with("alice pick Atlanta to Boston,"));
    }

    #[test]
    fn player_failing_setup_is_removed() {
        let calls = Calls::default();
        let mut players = vec![
            Recorder::boxed("alice", StrategyKind::HoldTen, &calls),
            faulty("mallory", StrategyKind::HoldTen, FailOn::Setup),
            Recorder::boxed("bob", StrategyKind::HoldTen, &calls),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![1]);
        assert_eq!(ranked(&outcome), BTreeSet::from([0, 2]));
        assert!(!outcome.scores.contains_key(&1));

        let calls = calls.lock().unwrap();
        // mallory is never offered anything, so bob gets what alice did not keep.
        assert_eq!(calls[2], "bob setup 45 [Blue, Green, Red, White]");
        assert_eq!(
            calls[3],
            "bob pick Atlanta to Dallas, Atlanta to El Paso, Atlanta to Fresno, Atlanta to Houston, Atlanta to Irvine"
        );
    }

    #[test]
    fn destinations_offered_in_chosen_order() {
        let calls = Calls::default();
        let mut players = vec![
            Recorder::boxed("alice", StrategyKind::HoldTen, &calls),
            Recorder::boxed("bob", StrategyKind::HoldTen, &calls),
        ];
        let reversed: DestinationOrder = |a, b| b.cmp(a);
        run_game_with_order(&mut players, &Arc::new(game_map()), &deck(), &GameConfig::default(), reversed)
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls[1],
            "alice pick El Paso to Houston, El Paso to Irvine, Fresno to Houston, Fresno to Irvine, Houston to Irvine"
        );
    }

    #[test]
    fn player_keeping_every_destination_is_removed() {
        let mut players = vec![
            Box::new(LocalPlayer::new("greedy", Box::new(Greedy), None)) as Box<dyn Player>,
            local("alice", StrategyKind::BuyNow),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![0]);
        assert_eq!(outcome.ranking, vec![vec![1]]);
    }

    #[test]
    fn cheater_is_removed_mid_game() {
        let mut players = vec![
            local("alice", StrategyKind::BuyNow),
            local("mallory", StrategyKind::Cheat),
            local("bob", StrategyKind::HoldTen),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![1]);
        assert_eq!(ranked(&outcome), BTreeSet::from([0, 2]));
        assert!(!outcome.scores.contains_key(&1));
    }

    #[test]
    fn player_failing_to_play_is_removed() {
        let mut players = vec![
            local("alice", StrategyKind::BuyNow),
            faulty("mallory", StrategyKind::BuyNow, FailOn::Play),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![1]);
        assert_eq!(outcome.ranking, vec![vec![0]]);
    }

    #[test]
    fn player_refusing_cards_is_removed() {
        let mut players = vec![
            faulty("mallory", StrategyKind::HoldTen, FailOn::More),
            local("alice", StrategyKind::HoldTen),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![0]);
        assert_eq!(outcome.ranking, vec![vec![1]]);
    }

    #[test]
    fn player_failing_to_hear_result_stays_ranked() {
        let mut players = vec![
            faulty("mallory", StrategyKind::BuyNow, FailOn::Win),
            local("alice", StrategyKind::BuyNow),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![0]);
        assert_eq!(ranked(&outcome), BTreeSet::from([0, 1]));
    }

    #[test]
    fn game_where_everybody_cheats() {
        let mut players = vec![
            local("mallory", StrategyKind::Cheat),
            local("trudy", StrategyKind::Cheat),
        ];
        let outcome = play(&mut players);

        assert_eq!(outcome.cheaters, vec![0, 1]);
        assert!(outcome.ranking.is_empty());
        assert!(outcome.winners().is_empty());
    }

    #[test]
    fn ranking_groups_equal_scores() {
        let scores = BTreeMap::from([(0, 10), (1, 25), (2, 10), (3, -5)]);
        assert_eq!(rank(&scores), vec![vec![1], vec![0, 2], vec![3]]);
    }
}
