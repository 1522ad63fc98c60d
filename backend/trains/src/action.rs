use crate::map::Connection;

use serde::{Deserialize, Serialize};
use std::fmt;

const MORE_CARDS: &str = "more cards";

/// What a player chooses to do on their turn.
///
/// # JSON
/// Requesting cards is serialized as the string `"more cards"`; acquiring a connection is
/// serialized as the connection itself, e.g. `["Boston", "Seattle", "red", 5]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "ActionJson", into = "ActionJson")]
pub enum Action {
    MoreCards,
    Acquire(Connection),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::MoreCards => write!(f, "{}", MORE_CARDS),
            Action::Acquire(connection) => write!(f, "acquire {}", connection),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum ActionJson {
    Keyword(String),
    Acquired(Connection),
}

impl TryFrom<ActionJson> for Action {
    type Error = String;

    fn try_from(json: ActionJson) -> Result<Self, Self::Error> {
        match json {
            ActionJson::Keyword(keyword) if keyword == MORE_CARDS => Ok(Action::MoreCards),
            ActionJson::Keyword(keyword) => Err(format!("\"{}\" is not an action.", keyword)),
            ActionJson::Acquired(connection) => Ok(Action::Acquire(connection)),
        }
    }
}

impl From<Action> for ActionJson {
    fn from(action: Action) -> Self {
        match action {
            Action::MoreCards => ActionJson::Keyword(String::from(MORE_CARDS)),
            Action::Acquire(connection) => ActionJson::Acquired(connection),
        }
    }
}
