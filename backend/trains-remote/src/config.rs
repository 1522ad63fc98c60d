//! Configuration of a tournament server.
//!
//! Configuration can be created programmatically using [`ServerConfig::new()`] or by reading
//! environment variables using [`ServerConfig::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Values that are missing or cannot be parsed keep their default.
//!
//! - `TRAINS_ADDRESS`: address to listen on (default: `127.0.0.1:45678`)
//! - `TRAINS_WAITING_PERIOD_SECS`: length of each sign-up waiting period, in seconds (default: `20`)
//! - `TRAINS_RESPONSE_TIMEOUT_MS`: how long players have to answer a call, in milliseconds (default: `2000`)
//! - `TRAINS_MAX_PLAYERS`: how many players can sign up (default: `50`)

use std::str::FromStr;
use std::time::Duration;
use trains::config::GameConfig;

/// Configuration of the sign-up phase, and of the tournament that follows.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub(crate) address: String,
    pub(crate) max_players: usize,
    pub(crate) name_timeout: Duration,
    pub(crate) waiting_period: Duration,
    pub(crate) comfort_quorum: usize,
    pub(crate) minimum_quorum: usize,
    pub(crate) max_name_length: usize,
    pub(crate) max_message_size: usize,
    pub(crate) response_timeout: Duration,
    pub(crate) game: GameConfig,
}

impl ServerConfig {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The server listens on `127.0.0.1:45678`.
    /// - Up to 50 players can sign up, and must send a name of at most 50 characters within 3 seconds.
    /// - Sign-up waits 20 seconds for 5 players, then 20 more seconds for 2 players.
    /// - Players have 2 seconds to answer every call, in at most 4 MiB.
    /// - Games follow the standard rules.
    pub fn new() -> Self {
        Self {
            address: String::from("127.0.0.1:45678"),
            max_players: 50,
            name_timeout: Duration::from_secs(3),
            waiting_period: Duration::from_secs(20),
            comfort_quorum: 5,
            minimum_quorum: 2,
            max_name_length: 50,
            max_message_size: 4 * 1024 * 1024,
            response_timeout: Duration::from_secs(2),
            game: GameConfig::default(),
        }
    }

    /// Create configuration from environment variables, on top of the defaults.
    pub fn from_env() -> Self {
        fn get_env<T: FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok()?.trim().parse().ok()
        }

        let mut config = Self::new();
        if let Some(address) = get_env("TRAINS_ADDRESS") {
            config.address = address;
        }
        if let Some(secs) = get_env("TRAINS_WAITING_PERIOD_SECS") {
            config.waiting_period = Duration::from_secs(secs);
        }
        if let Some(millis) = get_env("TRAINS_RESPONSE_TIMEOUT_MS") {
            config.response_timeout = Duration::from_millis(millis);
        }
        if let Some(max_players) = get_env("TRAINS_MAX_PLAYERS") {
            config.max_players = max_players;
        }
        config
    }

    /// Set the address to listen on. Port 0 lets the system pick one.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set how many players can sign up before sign-up closes right away.
    pub fn with_max_players(mut self, value: usize) -> Self {
        self.max_players = value;
        self
    }

    pub fn with_name_timeout(mut self, value: Duration) -> Self {
        self.name_timeout = value;
        self
    }

    /// Set the length of each of the two sign-up waiting periods.
    pub fn with_waiting_period(mut self, value: Duration) -> Self {
        self.waiting_period = value;
        self
    }

    /// Set how many players must have signed up at the end of the first and second waiting periods.
    pub fn with_quorums(mut self, comfort: usize, minimum: usize) -> Self {
        self.comfort_quorum = comfort;
        self.minimum_quorum = minimum;
        self
    }

    pub fn with_max_name_length(mut self, value: usize) -> Self {
        self.max_name_length = value;
        self
    }

    /// Set how many bytes a single message from a player may take.
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn with_response_timeout(mut self, value: Duration) -> Self {
        self.response_timeout = value;
        self
    }

    pub fn with_game(mut self, value: GameConfig) -> Self {
        self.game = value;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
