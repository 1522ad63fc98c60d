use crate::color::RailColor;
use crate::place::{Destination, Place};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::max;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use threadpool::ThreadPool;

lazy_static! {
    static ref THREAD_POOL: Mutex<ThreadPool> = Mutex::new(ThreadPool::default());
}

const MAP_DIMENSIONS: RangeInclusive<u32> = 10..=800;
const CONNECTION_LENGTHS: RangeInclusive<u8> = 3..=5;

// Most places on a playable map have fewer neighbors than this.
const MAX_NEIGHBORS_PER_PLACE: usize = 8;

/// Neighbors of a place, with the length of the longest connection leading to each of them.
type Hops = SmallVec<[(usize, u8); MAX_NEIGHBORS_PER_PLACE]>;

/// An undirected rail segment between two distinct places.
///
/// Places are kept in lexicographic order. Connections are ordered by their places,
/// then their length, then their color.
///
/// # JSON
/// Connections are serialized as an "acquired" tuple: `[first, second, color, length]`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(
    try_from = "(String, String, RailColor, u8)",
    into = "(String, String, RailColor, u8)"
)]
pub struct Connection {
    first: String,
    second: String,
    length: u8,
    color: RailColor,
}

impl Connection {
    /// Creates a connection of length three, four or five between two distinct places.
    ///
    /// # Example
    /// ```
    /// use trains::color::RailColor;
    /// use trains::map::Connection;
    ///
    /// let connection = Connection::new("BWI", "BOS", RailColor::Green, 4).unwrap();
    /// assert_eq!(connection.places(), ("BOS", "BWI"));
    ///
    /// assert!(Connection::new("BWI", "BOS", RailColor::Green, 6).is_err());
    /// assert!(Connection::new("BOS", "BOS", RailColor::Green, 4).is_err());
    /// ```
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        color: RailColor,
        length: u8,
    ) -> Result<Self, String> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return Err(format!("A connection cannot loop from {} to itself.", a));
        }

        if !CONNECTION_LENGTHS.contains(&length) {
            return Err(format!(
                "A connection between {} and {} cannot have length {}.",
                a, b, length
            ));
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            first,
            second,
            length,
            color,
        })
    }

    /// Both places, in lexicographic order.
    pub fn places(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    pub fn color(&self) -> RailColor {
        self.color
    }

    pub fn length(&self) -> u8 {
        self.length
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} ({} of length {})",
            self.first, self.second, self.color, self.length
        )
    }
}

impl TryFrom<(String, String, RailColor, u8)> for Connection {
    type Error = String;

    fn try_from((a, b, color, length): (String, String, RailColor, u8)) -> Result<Self, String> {
        Self::new(a, b, color, length)
    }
}

impl From<Connection> for (String, String, RailColor, u8) {
    fn from(connection: Connection) -> Self {
        (
            connection.first,
            connection.second,
            connection.color,
            connection.length,
        )
    }
}

/// Reasons why a map cannot be built.
#[derive(Debug, PartialEq)]
pub enum MapError {
    Dimensions { width: u32, height: u32 },
    DuplicatePlace(String),
    PlaceOutOfBounds(String),
    InvalidConnection(String),
    UnknownPlace(String),
    DuplicateConnection(Connection),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Dimensions { width, height } => write!(
                f,
                "A map of {}x{} is not allowed: both dimensions must be within {:?}.",
                width, height, MAP_DIMENSIONS
            ),
            MapError::InvalidConnection(reason) => write!(f, "{}", reason),
            MapError::DuplicatePlace(name) => write!(f, "{} appears more than once.", name),
            MapError::PlaceOutOfBounds(name) => write!(f, "{} lies outside of the map.", name),
            MapError::UnknownPlace(name) => {
                write!(f, "A connection refers to {}, which is not on the map.", name)
            }
            MapError::DuplicateConnection(connection) => {
                write!(f, "{} appears more than once.", connection)
            }
        }
    }
}

impl std::error::Error for MapError {}

/// The board of a game: places, and the connections between them.
///
/// A map is immutable once built, and is shared by reference between all games of a tournament.
///
/// # JSON
/// ```json
/// {
///   "width": 800,
///   "height": 600,
///   "cities": [["Boston", [10, 20]], ["Seattle", [700, 30]]],
///   "connections": {"Boston": {"Seattle": {"red": 5}}}
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "MapJson", into = "MapJson")]
pub struct Map {
    width: u32,
    height: u32,
    places: BTreeMap<String, Place>,
    connections: BTreeSet<Connection>,
}

impl Map {
    /// Builds a map, verifying that:
    ///
    /// * both dimensions are within 10 and 800, inclusively;
    /// * place names are unique, and places lie within the map;
    /// * connections only join places on the map;
    /// * no two connections of the same color join the same places.
    ///
    /// # Example
    /// ```
    /// use trains::color::RailColor;
    /// use trains::map::{Connection, Map, MapError};
    /// use trains::place::Place;
    ///
    /// let places = vec![
    ///     Place::new("BOS", 10, 10).unwrap(),
    ///     Place::new("BWI", 20, 20).unwrap(),
    /// ];
    /// let connections = vec![Connection::new("BWI", "BOS", RailColor::Green, 4).unwrap()];
    /// assert!(Map::new(100, 100, places.clone(), connections.clone()).is_ok());
    ///
    /// assert_eq!(
    ///     Map::new(5, 100, places, connections),
    ///     Err(MapError::Dimensions { width: 5, height: 100 })
    /// );
    /// ```
    pub fn new(
        width: u32,
        height: u32,
        places: Vec<Place>,
        connections: Vec<Connection>,
    ) -> Result<Self, MapError> {
        if !MAP_DIMENSIONS.contains(&width) || !MAP_DIMENSIONS.contains(&height) {
            return Err(MapError::Dimensions { width, height });
        }

        let mut places_by_name = BTreeMap::new();
        for place in places {
            let (x, y) = place.position();
            if x > width || y > height {
                return Err(MapError::PlaceOutOfBounds(place.name().to_owned()));
            }

            let name = place.name().to_owned();
            if places_by_name.insert(name.clone(), place).is_some() {
                return Err(MapError::DuplicatePlace(name));
            }
        }

        let mut unique_connections = BTreeSet::new();
        // Only one connection of a given color can join two places, whatever its length.
        let mut colors_joining = BTreeSet::new();
        for connection in connections {
            let (first, second) = connection.places();
            for place in [first, second] {
                if !places_by_name.contains_key(place) {
                    return Err(MapError::UnknownPlace(place.to_owned()));
                }
            }

            let joined = (first.to_owned(), second.to_owned(), connection.color);
            if !colors_joining.insert(joined) {
                return Err(MapError::DuplicateConnection(connection));
            }

            unique_connections.insert(connection);
        }

        Ok(Self {
            width,
            height,
            places: places_by_name,
            connections: unique_connections,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// All places, ordered by name.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn place(&self, name: &str) -> Option<&Place> {
        self.places.get(name)
    }

    /// All connections, in lexicographic order.
    pub fn connections(&self) -> &BTreeSet<Connection> {
        &self.connections
    }

    pub fn contains(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    /// Every pair of distinct places that can be joined by some path, regardless of who owns
    /// the connections on it.
    ///
    /// Places are first partitioned into connected components, then paired within each component.
    ///
    /// # Example
    /// ```
    /// use trains::color::RailColor;
    /// use trains::map::{Connection, Map};
    /// use trains::place::{Destination, Place};
    ///
    /// let places = ["A", "B", "C", "D"]
    ///     .iter()
    ///     .map(|name| Place::new(*name, 10, 10).unwrap())
    ///     .collect();
    /// let connections = vec![
    ///     Connection::new("A", "B", RailColor::Red, 3).unwrap(),
    ///     Connection::new("B", "C", RailColor::Red, 3).unwrap(),
    /// ];
    /// let map = Map::new(100, 100, places, connections).unwrap();
    ///
    /// // D is isolated, so it is not part of any destination.
    /// assert_eq!(
    ///     map.destinations().into_iter().collect::<Vec<_>>(),
    ///     vec![
    ///         Destination::new("A", "B").unwrap(),
    ///         Destination::new("A", "C").unwrap(),
    ///         Destination::new("B", "C").unwrap(),
    ///     ]
    /// );
    /// ```
    pub fn destinations(&self) -> BTreeSet<Destination> {
        let neighbors = Self::neighbors(&self.connections);
        let mut visited = HashSet::with_capacity(self.places.len());
        let mut destinations = BTreeSet::new();

        for start in self.places.keys() {
            if visited.contains(start.as_str()) {
                continue;
            }

            let mut component = vec![start.as_str()];
            let mut places_to_visit = VecDeque::from([start.as_str()]);
            visited.insert(start.as_str());

            while let Some(place) = places_to_visit.pop_front() {
                for neighbor in neighbors.get(place).into_iter().flatten() {
                    if visited.insert(*neighbor) {
                        component.push(*neighbor);
                        places_to_visit.push_back(*neighbor);
                    }
                }
            }

            for (i, first) in component.iter().enumerate() {
                for second in &component[i + 1..] {
                    destinations.insert(Destination::between(first, second));
                }
            }
        }

        destinations
    }

    /// Whether this map can offer every one of `num_players` players a distinct set of
    /// `kept` destinations, out of `offered` ones.
    pub fn has_enough_destinations(&self, num_players: usize, offered: usize, kept: usize) -> bool {
        self.destinations().len() >= kept * num_players + offered.saturating_sub(kept)
    }

    /// Predicate that assesses whether two places are linked using only the given connections.
    ///
    /// # Example
    /// ```
    /// use trains::color::RailColor;
    /// use trains::map::{Connection, Map};
    ///
    /// let connections = vec![
    ///     Connection::new("Raleigh", "Washington", RailColor::White, 3).unwrap(),
    ///     Connection::new("Washington", "New York", RailColor::Blue, 3).unwrap(),
    /// ];
    ///
    /// assert!(Map::are_connected(&connections, "Raleigh", "New York"));
    /// assert!(Map::are_connected(&connections, "New York", "Raleigh"));
    /// assert!(!Map::are_connected(&connections[..1], "Raleigh", "New York"));
    /// ```
    pub fn are_connected<'a>(
        connections: impl IntoIterator<Item = &'a Connection>,
        start: &str,
        end: &str,
    ) -> bool {
        let neighbors = Self::neighbors(connections);
        let mut visited = HashSet::from([start]);
        let mut places_to_visit = VecDeque::from([start]);

        while let Some(place) = places_to_visit.pop_front() {
            if place == end {
                return true;
            }

            for neighbor in neighbors.get(place).into_iter().flatten() {
                if visited.insert(*neighbor) {
                    places_to_visit.push_back(*neighbor);
                }
            }
        }

        false
    }

    /// Returns the length of the longest simple path (no place visited twice) that can be
    /// walked using only the given connections.
    ///
    /// When several connections join the same two places, only the longest one is worth walking.
    ///
    /// # Example
    /// ```
    /// use trains::color::RailColor;
    /// use trains::map::{Connection, Map};
    ///
    /// let connections = vec![
    ///     Connection::new("El Paso", "Phoenix", RailColor::Red, 3).unwrap(),
    ///     Connection::new("Phoenix", "Denver", RailColor::Blue, 5).unwrap(),
    ///     Connection::new("Phoenix", "Denver", RailColor::Green, 4).unwrap(),
    /// ];
    ///
    /// // El Paso -> Phoenix is of length 3, Phoenix -> Denver is of length 5.
    /// assert_eq!(Map::longest_path(&connections), 8);
    /// assert_eq!(Map::longest_path(&[]), 0);
    /// ```
    pub fn longest_path<'a>(connections: impl IntoIterator<Item = &'a Connection>) -> u32 {
        let mut place_indices: BTreeMap<&str, usize> = BTreeMap::new();
        let mut hops: Vec<Hops> = Vec::new();

        for connection in connections {
            let (first, second) = connection.places();
            let first = Self::place_index(first, &mut place_indices, &mut hops);
            let second = Self::place_index(second, &mut place_indices, &mut hops);

            Self::keep_longest_hop(&mut hops[first], second, connection.length);
            Self::keep_longest_hop(&mut hops[second], first, connection.length);
        }

        // Prepare multi-threading.
        let num_places = hops.len();
        let hops = Arc::new(hops);
        let (tx, rx) = mpsc::sync_channel(0);

        {
            let thread_pool = THREAD_POOL.lock().unwrap_or_else(PoisonError::into_inner);

            // Each place is explored on a separate thread from the pool, which computes the
            // longest path starting at that place.
            for start in 0..num_places {
                let hops = hops.clone();
                let tx = tx.clone();

                thread_pool.execute(move || {
                    let mut visited = vec![false; hops.len()];
                    // The receiver only hangs up once every result it needs has arrived.
                    let _ = tx.send(Self::longest_path_from_place(start, &hops, &mut visited, 0));
                });
            }
        }
        drop(tx);

        rx.iter().take(num_places).fold(0, max)
    }

    fn longest_path_from_place(
        start: usize,
        hops: &[Hops],
        visited: &mut [bool],
        current_length: u32,
    ) -> u32 {
        visited[start] = true;

        let mut longest_path_from_place = current_length;
        for &(end, length) in &hops[start] {
            if visited[end] {
                continue;
            }

            longest_path_from_place = max(
                longest_path_from_place,
                Self::longest_path_from_place(end, hops, visited, current_length + length as u32),
            );
        }

        visited[start] = false;
        longest_path_from_place
    }

    fn place_index<'a>(
        place: &'a str,
        place_indices: &mut BTreeMap<&'a str, usize>,
        hops: &mut Vec<Hops>,
    ) -> usize {
        *place_indices.entry(place).or_insert_with(|| {
            hops.push(SmallVec::new());
            hops.len() - 1
        })
    }

    fn keep_longest_hop(hops: &mut Hops, end: usize, length: u8) {
        match hops.iter_mut().find(|(neighbor, _)| *neighbor == end) {
            Some((_, longest)) => *longest = max(*longest, length),
            None => hops.push((end, length)),
        }
    }

    /// Maps each place to its adjacent places, following the given connections in both directions.
    fn neighbors<'a>(
        connections: impl IntoIterator<Item = &'a Connection>,
    ) -> BTreeMap<&'a str, Vec<&'a str>> {
        let mut neighbors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for connection in connections {
            let (first, second) = connection.places();
            neighbors.entry(first).or_default().push(second);
            neighbors.entry(second).or_default().push(first);
        }

        neighbors
    }
}

/// Intermediate shape of a [`Map`] on the wire.
#[derive(Deserialize, Serialize)]
struct MapJson {
    width: u32,
    height: u32,
    cities: Vec<Place>,
    connections: BTreeMap<String, BTreeMap<String, BTreeMap<RailColor, u8>>>,
}

impl TryFrom<MapJson> for Map {
    type Error = MapError;

    fn try_from(json: MapJson) -> Result<Self, Self::Error> {
        let mut connections = Vec::new();
        for (first, targets) in json.connections {
            for (second, segments) in targets {
                for (color, length) in segments {
                    connections.push(
                        Connection::new(first.as_str(), second.as_str(), color, length)
                            .map_err(MapError::InvalidConnection)?,
                    );
                }
            }
        }

        Map::new(json.width, json.height, json.cities, connections)
    }
}

impl From<Map> for MapJson {
    fn from(map: Map) -> Self {
        let mut connections: BTreeMap<String, BTreeMap<String, BTreeMap<RailColor, u8>>> =
            BTreeMap::new();
        for connection in map.connections {
            connections
                .entry(connection.first)
                .or_default()
                .entry(connection.second)
                .or_default()
                .insert(connection.color, connection.length);
        }

        Self {
            width: map.width,
            height: map.height,
            cities: map.places.into_values().collect(),
            connections,
        }
    }
}
