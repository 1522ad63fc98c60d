//! Players on the other end of a connection.

use crate::error::ProtocolError;
use crate::json_stream::JsonStream;
use crate::message::{expect_void, write_call, Method};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};
use tracing::{trace, warn};
use trains::action::Action;
use trains::color::RailColor;
use trains::map::Map;
use trains::participant::{Player, PlayerResult};
use trains::place::Destination;
use trains::player::PlayerView;

/// How long is left until the deadline, if there is one. Fails once it has passed.
fn time_left(deadline: Option<Instant>) -> io::Result<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            Ok(Some(remaining))
        }
    }
}

/// Reads off a connection, but never past a deadline.
pub struct DeadlineReader {
    stream: TcpStream,
    deadline: Option<Instant>,
}

impl DeadlineReader {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            deadline: None,
        }
    }

    /// Reads fail with a timeout once the given duration has elapsed from now.
    pub fn expire_in(&mut self, timeout: Duration) {
        self.expire_at(Instant::now() + timeout);
    }

    pub fn expire_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }
}

impl Read for DeadlineReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(remaining) = time_left(self.deadline)? {
            self.stream.set_read_timeout(Some(remaining))?;
        }
        self.stream.read(buf)
    }
}

/// Writes to a connection, but never past a deadline, even if the other end stops reading.
pub struct DeadlineWriter {
    stream: TcpStream,
    deadline: Option<Instant>,
}

impl DeadlineWriter {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            deadline: None,
        }
    }

    pub fn expire_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }
}

impl Write for DeadlineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(remaining) = time_left(self.deadline)? {
            self.stream.set_write_timeout(Some(remaining))?;
        }
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// A player reached over a connection.
///
/// Every call writes the method and its arguments, then waits for a single answer, all before
/// a deadline. A player who does not answer in time, or answers nonsense, is at fault.
pub struct RemotePlayer {
    name: String,
    writer: DeadlineWriter,
    values: JsonStream<DeadlineReader>,
    timeout: Duration,
}

impl RemotePlayer {
    /// A player who signed up on the given connection.
    ///
    /// `values` reads from the same connection, and may already hold bytes that came after the name.
    pub fn new(
        name: String,
        writer: TcpStream,
        values: JsonStream<DeadlineReader>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            writer: DeadlineWriter::new(writer),
            values,
            timeout,
        }
    }

    /// A player on a connection where nothing was read yet.
    pub fn connect(name: String, stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        let reader = DeadlineReader::new(stream.try_clone()?);
        Ok(Self::new(name, stream, JsonStream::new(reader), timeout))
    }

    fn call<A: Serialize>(&mut self, method: Method, args: &A) -> Result<Value, ProtocolError> {
        trace!(player = %self.name, %method, "calling");
        let deadline = Instant::now() + self.timeout;
        self.writer.expire_at(deadline);
        self.values.get_mut().expire_at(deadline);

        write_call(&mut self.writer, method, args)?;
        self.values.next_value()?.ok_or(ProtocolError::UnexpectedEof)
    }

    /// Calls a method that returns something.
    fn request<A: Serialize, T: DeserializeOwned>(
        &mut self,
        method: Method,
        args: &A,
    ) -> PlayerResult<T> {
        let result = self.call(method, args).and_then(|answer| {
            serde_json::from_value(answer).map_err(|error| {
                ProtocolError::BadArguments(format!("answer to {}: {}", method, error))
            })
        });
        self.fault_on_error(method, result)
    }

    /// Calls a method that returns nothing.
    fn notify<A: Serialize>(&mut self, method: Method, args: &A) -> PlayerResult<()> {
        let result = self
            .call(method, args)
            .and_then(|answer| expect_void(&answer));
        self.fault_on_error(method, result)
    }

    fn fault_on_error<T>(&self, method: Method, result: Result<T, ProtocolError>) -> PlayerResult<T> {
        result.map_err(|error| {
            warn!(player = %self.name, %method, %error, "call failed");
            error.into()
        })
    }
}

impl Player for RemotePlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, participating: bool) -> PlayerResult<Map> {
        self.request(Method::Start, &(participating,))
    }

    fn setup(&mut self, map: &Map, rails: u32, cards: &[RailColor]) -> PlayerResult<()> {
        self.notify(Method::Setup, &(map, rails, cards))
    }

    fn pick(&mut self, offered: &BTreeSet<Destination>) -> PlayerResult<BTreeSet<Destination>> {
        self.request(Method::Pick, &(offered,))
    }

    fn play(&mut self, view: &PlayerView) -> PlayerResult<Action> {
        self.request(Method::Play, &(view,))
    }

    fn more(&mut self, cards: &[RailColor]) -> PlayerResult<()> {
        self.notify(Method::More, &(cards,))
    }

    fn win(&mut self, won: bool) -> PlayerResult<()> {
        self.notify(Method::Win, &(won,))
    }

    fn end(&mut self, won: bool) -> PlayerResult<()> {
        let result = self.notify(Method::End, &(won,));
        // Nothing more will be asked.
        let _ = self.writer.stream.shutdown(Shutdown::Both);
        result
    }
}
