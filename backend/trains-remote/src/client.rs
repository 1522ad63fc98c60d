//! Lets a local player take part in a tournament run by a remote server.

use crate::error::ProtocolError;
use crate::json_stream::JsonStream;
use crate::message::{write_value, Call, Method, VOID};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info, instrument};
use trains::color::RailColor;
use trains::map::Map;
use trains::participant::{Player, PlayerResult};
use trains::place::Destination;
use trains::player::PlayerView;

/// Signs the player up with the server at the given address, then answers its calls
/// until it hangs up.
#[instrument(skip(player), fields(player = player.name()))]
pub fn run_client<A: ToSocketAddrs + std::fmt::Debug>(
    address: A,
    player: &mut dyn Player,
) -> Result<(), ProtocolError> {
    let mut writer = TcpStream::connect(address)?;
    let mut values = JsonStream::new(writer.try_clone()?);

    write_value(&mut writer, player.name())?;
    info!("signed up");

    serve(&mut values, &mut writer, player)
}

/// Answers calls read from `values` until there are none left.
pub fn serve<R: Read, W: Write>(
    values: &mut JsonStream<R>,
    writer: &mut W,
    player: &mut dyn Player,
) -> Result<(), ProtocolError> {
    while let Some(value) = values.next_value()? {
        let call = Call::try_from(value)?;
        debug!(method = %call.method, "called");

        let answer = dispatch(&call, player)?;
        write_value(writer, &answer)?;
    }

    info!("server hung up");
    Ok(())
}

fn dispatch(call: &Call, player: &mut dyn Player) -> Result<Value, ProtocolError> {
    match call.method {
        Method::Start => answer(player.start(call.arg(0)?)),
        Method::Setup => {
            let map: Map = call.arg(0)?;
            let cards: Vec<RailColor> = call.arg(2)?;
            void(player.setup(&map, call.arg(1)?, &cards))
        }
        Method::Pick => {
            let offered: BTreeSet<Destination> = call.arg(0)?;
            answer(player.pick(&offered))
        }
        Method::Play => {
            let view: PlayerView = call.arg(0)?;
            answer(player.play(&view))
        }
        Method::More => {
            let cards: Vec<RailColor> = call.arg(0)?;
            void(player.more(&cards))
        }
        Method::Win => void(player.win(call.arg(0)?)),
        Method::End => void(player.end(call.arg(0)?)),
    }
}

fn answer<T: Serialize>(result: PlayerResult<T>) -> Result<Value, ProtocolError> {
    let value = result.map_err(ProtocolError::Player)?;
    Ok(serde_json::to_value(value)?)
}

fn void(result: PlayerResult<()>) -> Result<Value, ProtocolError> {
    result.map_err(ProtocolError::Player)?;
    Ok(Value::from(VOID))
}
