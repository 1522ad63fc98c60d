//! Sign-up of remote players, and the tournament they then play.
//!
//! Sign-up runs on three kinds of threads:
//!
//! - the listener thread accepts connections, and hands each one to a thread of its own;
//! - each connection thread waits for the player's name, and sends the signed-up player on a channel;
//! - the calling thread collects players from the channel until sign-up closes.
//!
//! Sign-up closes as soon as enough players signed up, or else after the first waiting period
//! if a comfortable number did, or else after the second waiting period if the bare minimum did.
//! Players signing up after that are dropped.

use crate::config::ServerConfig;
use crate::error::ProtocolError;
use crate::json_stream::JsonStream;
use crate::proxy::{DeadlineReader, RemotePlayer};

use serde_json::Value;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use trains::card::CardDeck;
use trains::manager::{Manager, TournamentResult};
use trains::participant::Player;

// How long the listener thread sleeps when nobody is connecting.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Listens on the configured address, signs players up, and runs a tournament between them.
///
/// The result is empty if not enough players signed up.
pub fn run_tournament_server(config: &ServerConfig, deck: CardDeck) -> io::Result<TournamentResult> {
    let listener = TcpListener::bind(config.address())?;
    info!(address = %listener.local_addr()?, "listening");

    let players = sign_up(listener, config)?;
    Ok(run_tournament(players, deck, config))
}

/// Runs a tournament between players who signed up. Nobody plays if there is nobody to play.
pub fn run_tournament(
    players: Vec<RemotePlayer>,
    deck: CardDeck,
    config: &ServerConfig,
) -> TournamentResult {
    if players.is_empty() {
        return TournamentResult::default();
    }

    let players: Vec<Box<dyn Player>> = players
        .into_iter()
        .map(|player| Box::new(player) as Box<dyn Player>)
        .collect();
    Manager::new(players, deck, config.game).run()
}

/// Signs players up on the given listener, in the order their names arrive.
///
/// Returns no player at all if too few signed up in time.
#[instrument(skip_all)]
pub fn sign_up(listener: TcpListener, config: &ServerConfig) -> io::Result<Vec<RemotePlayer>> {
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::channel();
    {
        let keep_running = Arc::clone(&keep_running);
        let config = Arc::new(config.clone());
        thread::spawn(move || accept_connections(listener, &keep_running, &config, &tx));
    }

    let mut players = Vec::new();
    let mut deadline = Instant::now() + config.waiting_period;
    let mut quorum = config.comfort_quorum;
    let mut last_period = false;

    while players.len() < config.max_players {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(player) => players.push(player),
            Err(RecvTimeoutError::Timeout) if players.len() >= quorum => break,
            Err(RecvTimeoutError::Timeout) if !last_period => {
                info!(signed_up = players.len(), "waiting some more");
                deadline += config.waiting_period;
                quorum = config.minimum_quorum;
                last_period = true;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(signed_up = players.len(), "not enough players signed up");
                players.clear();
                break;
            }
            // Nobody else can sign up.
            Err(RecvTimeoutError::Disconnected) => {
                if players.len() < config.minimum_quorum {
                    players.clear();
                }
                break;
            }
        }
    }
    keep_running.store(false, Ordering::SeqCst);

    info!(signed_up = players.len(), "sign-up closed");
    Ok(players)
}

fn accept_connections(
    listener: TcpListener,
    keep_running: &AtomicBool,
    config: &Arc<ServerConfig>,
    tx: &Sender<RemotePlayer>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, address)) => {
                debug!(%address, "connected");
                let config = Arc::clone(config);
                let tx = tx.clone();
                thread::spawn(move || match receive_name(stream, &config) {
                    // Sign-up may be over already, which drops the connection.
                    Ok(player) => {
                        let _ = tx.send(player);
                    }
                    Err(error) => debug!(%address, %error, "did not sign up"),
                });
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(error) => {
                warn!(%error, "stopped accepting connections");
                break;
            }
        }
    }
}

/// Waits for a connection to send a valid name, which signs the player up.
fn receive_name(stream: TcpStream, config: &ServerConfig) -> Result<RemotePlayer, ProtocolError> {
    stream.set_nonblocking(false)?;

    let mut values = JsonStream::new(DeadlineReader::new(stream.try_clone()?))
        .with_max_value_size(config.max_message_size);
    values.get_mut().expire_in(config.name_timeout);

    let name = match values.next_value()? {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ProtocolError::BadArguments(format!("{} is not a name", other)));
        }
        None => return Err(ProtocolError::UnexpectedEof),
    };

    let length = name.chars().count();
    if length == 0 || length > config.max_name_length {
        return Err(ProtocolError::BadArguments(format!(
            "names must have 1 to {} characters",
            config.max_name_length
        )));
    }

    info!(%name, "signed up");
    Ok(RemotePlayer::new(
        name,
        stream,
        values,
        config.response_timeout,
    ))
}
