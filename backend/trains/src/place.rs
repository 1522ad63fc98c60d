use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_PLACE_NAME_LEN: usize = 25;

lazy_static! {
    static ref PLACE_NAME: Regex = Regex::new(r"^[A-Za-z0-9., ]+$").expect("valid place name pattern");
}

/// A named location on the map.
///
/// # JSON
/// Places are serialized as `[name, [x, y]]`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "(String, (u32, u32))", into = "(String, (u32, u32))")]
pub struct Place {
    name: String,
    x: u32,
    y: u32,
}

impl Place {
    /// Creates a place, as long as its name is made of at most 25 letters, digits, dots, commas or spaces.
    ///
    /// # Example
    /// ```
    /// use trains::place::Place;
    ///
    /// assert!(Place::new("Boston", 10, 20).is_ok());
    /// assert!(Place::new("Montréal", 10, 20).is_err());
    /// assert!(Place::new("", 10, 20).is_err());
    /// ```
    pub fn new(name: impl Into<String>, x: u32, y: u32) -> Result<Self, String> {
        let name = name.into();
        if name.chars().count() > MAX_PLACE_NAME_LEN || !PLACE_NAME.is_match(&name) {
            return Err(format!("\"{}\" is not a valid place name.", name));
        }

        Ok(Self { name, x, y })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }
}

impl TryFrom<(String, (u32, u32))> for Place {
    type Error = String;

    fn try_from((name, (x, y)): (String, (u32, u32))) -> Result<Self, Self::Error> {
        Self::new(name, x, y)
    }
}

impl From<Place> for (String, (u32, u32)) {
    fn from(place: Place) -> Self {
        (place.name, (place.x, place.y))
    }
}

/// Two distinct places that a player aims to connect.
///
/// The pair is unordered: places are kept in lexicographic order, so
/// `Destination::new("A", "B")` and `Destination::new("B", "A")` are equal.
///
/// # JSON
/// Destinations are serialized as `[first, second]`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct Destination {
    first: String,
    second: String,
}

impl Destination {
    /// # Example
    /// ```
    /// use trains::place::Destination;
    ///
    /// let destination = Destination::new("Seattle", "Boston").unwrap();
    /// assert_eq!(destination.places(), ("Boston", "Seattle"));
    ///
    /// assert!(Destination::new("Boston", "Boston").is_err());
    /// ```
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Result<Self, String> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return Err(format!("A destination cannot start and end at {}.", a));
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    /// Pairs two places already known to be distinct.
    pub(crate) fn between(a: &str, b: &str) -> Self {
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Self {
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }

    /// Both places, in lexicographic order.
    pub fn places(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.first, self.second)
    }
}

impl TryFrom<(String, String)> for Destination {
    type Error = String;

    fn try_from((a, b): (String, String)) -> Result<Self, Self::Error> {
        Self::new(a, b)
    }
}

impl From<Destination> for (String, String) {
    fn from(destination: Destination) -> Self {
        (destination.first, destination.second)
    }
}
