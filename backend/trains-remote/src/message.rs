//! Shapes of the calls made over a connection, and of their answers.

use crate::error::ProtocolError;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use strum_macros::{Display, EnumIter, EnumString};

/// The answer to calls that return nothing.
pub const VOID: &str = "void";

/// Methods that can be called on a remote player.
///
/// # JSON
/// Methods are serialized in lowercase.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Method {
    Start,
    Setup,
    Pick,
    Play,
    More,
    Win,
    End,
}

/// A call received over a connection.
///
/// # JSON
/// Calls are serialized as a pair of the method and the list of its arguments, e.g.
/// `["win", [true]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub method: Method,
    pub args: Vec<Value>,
}

impl Call {
    /// Decodes the argument at the given position.
    pub fn arg<T: DeserializeOwned>(&self, position: usize) -> Result<T, ProtocolError> {
        let value = self.args.get(position).ok_or_else(|| {
            ProtocolError::BadArguments(format!("{} has no argument {}", self.method, position))
        })?;

        serde_json::from_value(value.clone()).map_err(|error| {
            ProtocolError::BadArguments(format!(
                "argument {} of {}: {}",
                position, self.method, error
            ))
        })
    }
}

impl TryFrom<Value> for Call {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let (method, args) = match value {
            Value::Array(mut pair) if pair.len() == 2 => {
                let args = pair.pop();
                (pair.pop(), args)
            }
            other => {
                return Err(ProtocolError::BadArguments(format!(
                    "{} is not a call",
                    other
                )))
            }
        };

        let method = match method {
            Some(Value::String(name)) => name
                .parse::<Method>()
                .map_err(|_| ProtocolError::UnknownMethod(name))?,
            other => {
                return Err(ProtocolError::UnknownMethod(
                    other.map(|value| value.to_string()).unwrap_or_default(),
                ))
            }
        };

        match args {
            Some(Value::Array(args)) => Ok(Call { method, args }),
            _ => Err(ProtocolError::BadArguments(format!(
                "arguments of {} are not a list",
                method
            ))),
        }
    }
}

/// Writes a call to the given method, and flushes it.
///
/// The arguments are expected to serialize as a list, e.g. a tuple.
pub fn write_call<W: Write, A: Serialize>(
    writer: &mut W,
    method: Method,
    args: &A,
) -> Result<(), ProtocolError> {
    write_value(writer, &(method, args))
}

/// Writes any value all at once, and flushes it.
pub fn write_value<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> Result<(), ProtocolError> {
    let bytes = serde_json::to_vec(value)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Checks that an answer is the one expected from calls that return nothing.
pub fn expect_void(answer: &Value) -> Result<(), ProtocolError> {
    match answer {
        Value::String(answer) if answer == VOID => Ok(()),
        other => Err(ProtocolError::BadArguments(format!(
            "expected \"{}\", got {}",
            VOID, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;
    use trains::color::RailColor;

    #[test]
    fn method_names() {
        let names: Vec<String> = Method::iter().map(|method| method.to_string()).collect();
        assert_eq!(names, ["start", "setup", "pick", "play", "more", "win", "end"]);

        for method in Method::iter() {
            assert_eq!(method.to_string().parse::<Method>(), Ok(method));
        }
    }

    #[test]
    fn call_to_json() -> Result<(), ProtocolError> {
        let mut written = Vec::new();
        write_call(&mut written, Method::More, &(vec![RailColor::Red, RailColor::Blue],))?;
        assert_eq!(written, br#"["more",[["red","blue"]]]"#);

        let mut written = Vec::new();
        write_call(&mut written, Method::Win, &(true,))?;
        assert_eq!(written, br#"["win",[true]]"#);
        Ok(())
    }

    /// Keeps track of how many writes it took to get the bytes.
    #[derive(Default)]
    struct CountingWriter {
        writes: usize,
        bytes: Vec<u8>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn long_call_is_written_at_once() -> Result<(), ProtocolError> {
        let cards: Vec<RailColor> = RailColor::iter().cycle().take(1000).collect();
        let mut writer = CountingWriter::default();
        write_call(&mut writer, Method::More, &(&cards,))?;

        assert_eq!(writer.writes, 1);
        assert_eq!(
            serde_json::from_slice::<Value>(&writer.bytes)?,
            json!(["more", [cards]])
        );
        Ok(())
    }

    #[test]
    fn json_to_call() -> Result<(), ProtocolError> {
        let call = Call::try_from(json!(["setup", [{"width": 10}, 45, ["red"]]]))?;
        assert_eq!(call.method, Method::Setup);
        assert_eq!(call.arg::<u32>(1)?, 45);
        assert_eq!(call.arg::<Vec<RailColor>>(2)?, vec![RailColor::Red]);
        Ok(())
    }

    #[test]
    fn invalid_calls() {
        assert!(matches!(
            Call::try_from(json!(["dance", []])),
            Err(ProtocolError::UnknownMethod(name)) if name == "dance"
        ));
        assert!(matches!(
            Call::try_from(json!([1, []])),
            Err(ProtocolError::UnknownMethod(_))
        ));
        assert!(matches!(
            Call::try_from(json!(["win", true])),
            Err(ProtocolError::BadArguments(_))
        ));
        assert!(matches!(
            Call::try_from(json!(["win"])),
            Err(ProtocolError::BadArguments(_))
        ));
        assert!(matches!(
            Call::try_from(json!("win")),
            Err(ProtocolError::BadArguments(_))
        ));
    }

    #[test]
    fn invalid_arguments() -> Result<(), ProtocolError> {
        let call = Call::try_from(json!(["win", ["yes"]]))?;
        assert!(matches!(call.arg::<bool>(0), Err(ProtocolError::BadArguments(_))));
        assert!(matches!(call.arg::<bool>(1), Err(ProtocolError::BadArguments(_))));
        Ok(())
    }

    #[test]
    fn void_is_not_null() {
        assert!(expect_void(&json!("void")).is_ok());
        assert!(expect_void(&Value::Null).is_err());
        assert!(expect_void(&json!("VOID")).is_err());
    }
}
