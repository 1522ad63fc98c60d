//! Decoding of self-delimiting JSON values off a byte stream.

use crate::error::ProtocolError;

use serde_json::{Deserializer, Value};
use std::io::{self, Read};

const CHUNK_SIZE: usize = 4096;

/// Reads JSON values one at a time off a stream, with nothing but optional whitespace between them.
///
/// Bytes read past the end of a value are kept for the next one.
///
/// # Example
/// ```
/// use serde_json::json;
/// use std::io::Cursor;
/// use trains_remote::json_stream::JsonStream;
///
/// let mut values = JsonStream::new(Cursor::new(r#"["a","b"] "c""#));
///
/// assert_eq!(values.next_value().unwrap(), Some(json!(["a", "b"])));
/// assert_eq!(values.next_value().unwrap(), Some(json!("c")));
/// assert_eq!(values.next_value().unwrap(), None);
/// ```
pub struct JsonStream<R> {
    reader: R,
    buffer: Vec<u8>,
    max_value_size: usize,
}

impl<R: Read> JsonStream<R> {
    /// Decodes values of any size.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            max_value_size: usize::MAX,
        }
    }

    /// Stops buffering a value once it takes more than the given number of bytes.
    pub fn with_max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = bytes;
        self
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Decodes the next value.
    ///
    /// Returns `None` once the stream is over, as long as it did not end in the middle of a value.
    /// A value that grows past the maximum size is rejected before the rest of it is read.
    pub fn next_value(&mut self) -> Result<Option<Value>, ProtocolError> {
        loop {
            self.skip_whitespace();

            if !self.buffer.is_empty() {
                let decoded = {
                    let mut values = Deserializer::from_slice(&self.buffer).into_iter::<Value>();
                    values
                        .next()
                        .map(|result| result.map(|value| (value, values.byte_offset())))
                };

                match decoded {
                    Some(Ok((value, consumed))) => {
                        self.buffer.drain(..consumed);
                        self.skip_whitespace();
                        return Ok(Some(value));
                    }
                    // The value goes on past what was read so far.
                    Some(Err(error)) if error.is_eof() => {
                        if self.buffer.len() > self.max_value_size {
                            self.buffer.clear();
                            return Err(ProtocolError::BadArguments(format!(
                                "values cannot take more than {} bytes",
                                self.max_value_size
                            )));
                        }
                    }
                    Some(Err(error)) => return Err(error.into()),
                    None => {}
                }
            }

            if self.read_chunk()? == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ProtocolError::UnexpectedEof)
                };
            }
        }
    }

    fn read_chunk(&mut self) -> Result<usize, ProtocolError> {
        let mut chunk = [0; CHUNK_SIZE];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(read) => {
                    self.buffer.extend_from_slice(&chunk[..read]);
                    return Ok(read);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let whitespace = self
            .buffer
            .iter()
            .take_while(|byte| matches!(byte, b' ' | b'\t' | b'\n' | b'\r'))
            .count();
        self.buffer.drain(..whitespace);
    }
}
