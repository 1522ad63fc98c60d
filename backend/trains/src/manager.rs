//! Runs a knock-out tournament: rounds of games, until a single group of winners is left.

use crate::card::CardDeck;
use crate::config::GameConfig;
use crate::map::Map;
use crate::participant::Player;
use crate::place::Destination;
use crate::referee::{run_game_with_order, DestinationOrder, GameOutcome, SetupError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use threadpool::ThreadPool;
use tracing::{info, instrument, warn};

lazy_static! {
    static ref GAME_POOL: Mutex<ThreadPool> = Mutex::new(ThreadPool::default());
}

/// Names of the players who won the tournament, and of those who were caught misbehaving.
///
/// Both lists are sorted.
///
/// # JSON
/// ```json
/// {"winners": ["alice"], "cheaters": ["mallory"]}
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TournamentResult {
    pub winners: Vec<String>,
    pub cheaters: Vec<String>,
}

/// What comes back from a game that was run on the pool.
struct PlayedGame {
    seats: Vec<usize>,
    players: Vec<Box<dyn Player>>,
    outcome: Result<GameOutcome, SetupError>,
}

/// Picks the map of a tournament among those proposed by players, in the order players were
/// started. Only maps with enough destinations for a full game are proposed.
pub type MapChooser = fn(Vec<Map>) -> Option<Map>;

/// Chooses the first map proposed.
pub fn first_map(proposed: Vec<Map>) -> Option<Map> {
    proposed.into_iter().next()
}

/// In charge of a tournament, from telling players that it starts to telling them whether they won.
///
/// Players are referred to by their index in the list the manager was created with.
pub struct Manager {
    /// Every player, except while they are away playing a game of the current round.
    ///
    /// A player whose game never came back is left as `None` for good.
    players: Vec<Option<Box<dyn Player>>>,
    /// Names of all players, so they can be reported even once gone.
    names: Vec<String>,
    /// Players caught misbehaving at any point.
    cheaters: BTreeSet<usize>,
    /// Copied for every game.
    deck: CardDeck,
    config: GameConfig,
    choose_map: MapChooser,
    destination_order: DestinationOrder,
}

impl Manager {
    pub fn new(players: Vec<Box<dyn Player>>, deck: CardDeck, config: GameConfig) -> Self {
        Self {
            names: players.iter().map(|player| player.name().to_owned()).collect(),
            players: players.into_iter().map(Some).collect(),
            cheaters: BTreeSet::new(),
            deck,
            config,
            choose_map: first_map,
            destination_order: Destination::cmp,
        }
    }

    /// Chooses the map among the proposed ones with the given function, instead of taking the first.
    pub fn with_map_chooser(mut self, choose_map: MapChooser) -> Self {
        self.choose_map = choose_map;
        self
    }

    /// Offers destinations in every game in the given order, instead of lexicographically.
    pub fn with_destination_order(mut self, order: DestinationOrder) -> Self {
        self.destination_order = order;
        self
    }

    /// Runs the whole tournament.
    ///
    /// Rounds go on until either a round was a single game, a round eliminated nobody, or fewer
    /// than two players are left. The players left at that point are the winners.
    #[instrument(skip_all, fields(players = self.players.len()))]
    pub fn run(mut self) -> TournamentResult {
        let map = self.start();

        let mut survivors: Vec<usize> = (0..self.players.len())
            .filter(|index| !self.cheaters.contains(index))
            .collect();

        match map {
            Some(map) => {
                let mut previous_survivors = None;
                let mut final_round = false;

                while !final_round
                    && survivors.len() >= self.config.min_players
                    && previous_survivors.as_ref() != Some(&survivors)
                {
                    let games = allocate(&survivors, self.config.min_players, self.config.max_players);
                    final_round = games.len() == 1;
                    info!(survivors = survivors.len(), games = games.len(), "round starting");

                    let winners = self.play_round(&map, games);
                    previous_survivors = Some(survivors);
                    survivors = winners;
                }
            }
            None => {
                warn!("no player proposed a usable map");
                survivors.clear();
            }
        }

        self.finish(survivors)
    }

    /// Tells every player that the tournament starts, and picks a map among the usable ones
    /// they propose.
    fn start(&mut self) -> Option<Arc<Map>> {
        let mut proposed = Vec::new();

        for index in 0..self.players.len() {
            let player = match self.players[index].as_mut() {
                Some(player) => player,
                None => continue,
            };

            match player.start(true) {
                Ok(map) => {
                    if self.config.fits_map(&map, self.config.max_players) {
                        proposed.push(map);
                    }
                }
                Err(fault) => {
                    warn!(player = player.name(), %fault, "could not start");
                    self.cheaters.insert(index);
                }
            }
        }

        (self.choose_map)(proposed).map(Arc::new)
    }

    /// Plays every game of a round concurrently. Returns the winners of the round, in index order.
    fn play_round(&mut self, map: &Arc<Map>, games: Vec<Vec<usize>>) -> Vec<usize> {
        let (tx, rx) = mpsc::channel();
        let mut num_games = 0;

        {
            let pool = GAME_POOL.lock().unwrap_or_else(PoisonError::into_inner);

            for seats in games {
                let taken: Vec<(usize, Box<dyn Player>)> = seats
                    .iter()
                    .filter_map(|&index| self.players[index].take().map(|player| (index, player)))
                    .collect();
                if taken.len() != seats.len() {
                    warn!(?seats, "some players are gone");
                    for (index, player) in taken {
                        self.players[index] = Some(player);
                    }
                    continue;
                }
                let mut players: Vec<Box<dyn Player>> =
                    taken.into_iter().map(|(_, player)| player).collect();

                let map = Arc::clone(map);
                let deck = self.deck.clone();
                let config = self.config;
                let order = self.destination_order;
                let tx = tx.clone();

                num_games += 1;
                pool.execute(move || {
                    let outcome = run_game_with_order(&mut players, &map, &deck, &config, order);
                    // The manager only stops listening once every game is back.
                    let _ = tx.send(PlayedGame {
                        seats,
                        players,
                        outcome,
                    });
                });
            }
        }
        drop(tx);

        let mut winners = BTreeSet::new();
        for game in rx.iter().take(num_games) {
            match &game.outcome {
                Ok(outcome) => {
                    let cheaters: BTreeSet<usize> =
                        outcome.cheaters.iter().map(|&seat| game.seats[seat]).collect();
                    winners.extend(
                        outcome
                            .winners()
                            .iter()
                            .map(|&seat| game.seats[seat])
                            .filter(|index| !cheaters.contains(index)),
                    );
                    self.cheaters.extend(cheaters);
                }
                Err(error) => warn!(seats = ?game.seats, %error, "game could not be played"),
            }

            self.seat_back(&game.seats, game.players);
        }

        // Players of a game that never came back cannot win anything.
        winners
            .into_iter()
            .filter(|&index| self.players[index].is_some())
            .collect()
    }

    fn seat_back(&mut self, seats: &[usize], players: Vec<Box<dyn Player>>) {
        for (&index, player) in seats.iter().zip(players) {
            self.players[index] = Some(player);
        }
    }

    /// Tells the winners they won, and everybody else who behaved that they lost.
    fn finish(mut self, survivors: Vec<usize>) -> TournamentResult {
        let survivors: BTreeSet<usize> = survivors.into_iter().collect();
        let mut winners = Vec::new();

        for index in 0..self.players.len() {
            if self.cheaters.contains(&index) {
                continue;
            }

            let won = survivors.contains(&index);
            let player = match self.players[index].as_mut() {
                Some(player) => player,
                None => continue,
            };

            match player.end(won) {
                Ok(()) if won => winners.push(self.names[index].clone()),
                Ok(()) => {}
                Err(fault) => {
                    warn!(player = player.name(), %fault, "could not be told the result");
                    self.cheaters.insert(index);
                }
            }
        }

        let mut cheaters: Vec<String> = self
            .cheaters
            .iter()
            .map(|&index| self.names[index].clone())
            .collect();
        winners.sort();
        cheaters.sort();

        info!(?winners, ?cheaters, "tournament over");
        TournamentResult { winners, cheaters }
    }
}

/// Splits players into games as large as possible, keeping their order.
///
/// Whenever the players left over are too few for a game of their own, they join the last game,
/// which is split again along with them, one player smaller.
///
/// # Example
/// ```
/// use trains::manager::allocate;
///
/// let players: Vec<usize> = (0..9).collect();
/// assert_eq!(allocate(&players, 2, 8), vec![(0..7).collect(), vec![7, 8]]);
/// ```
pub fn allocate(players: &[usize], min_size: usize, max_size: usize) -> Vec<Vec<usize>> {
    let mut games: Vec<&[usize]> = Vec::new();
    let mut rest = players;
    let mut size = max_size.max(1);

    loop {
        if rest.len() > size {
            let (game, others) = rest.split_at(size);
            games.push(game);
            rest = others;
            continue;
        }

        if rest.len() < min_size && size > min_size {
            if let Some(last) = games.pop() {
                rest = &players[players.len() - rest.len() - last.len()..];
                size -= 1;
                continue;
            }
        }

        if !rest.is_empty() {
            games.push(rest);
        }
        return games.into_iter().map(<[usize]>::to_vec).collect();
    }
}
