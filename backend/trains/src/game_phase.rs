use serde::{Deserialize, Serialize};

/// Phases of a game, as seen by the referee's state machine.
///
/// # JSON
/// Phases are serialized in snake_case.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// At least one player is left, and the game has not reached an end condition.
    InProgress,
    /// No more turns are played: players are ranked.
    Over,
}
