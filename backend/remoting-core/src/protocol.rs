//! Worker command framing.
//!
//! Each connection carries exactly one command. A command is a sequence of
//! self-delimiting CBOR items written back to back:
//!
//! | Command          | Request items                        | Response              |
//! |------------------|--------------------------------------|-----------------------|
//! | `hello`          | `"hello"`                            | none                  |
//! | `reset`          | `"reset"`                            | none                  |
//! | `load-operation` | `"load-operation"`, name, params map | handle (unsigned int) |
//! | `run-operation`  | `"run-operation"`, handle, payload   | raw result payload    |
//!
//! The `run-operation` payload and result are produced and consumed by the
//! caller's codec, not by this module.

use crate::descriptor::{OperationDescriptor, OperationHandle};

use std::io::{Error as IoError, ErrorKind, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod commands {
    pub const HELLO: &str = "hello";
    pub const RESET: &str = "reset";
    pub const LOAD_OPERATION: &str = "load-operation";
    pub const RUN_OPERATION: &str = "run-operation";
}

/// A request as it appears on the wire, minus any streamed payload.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    Hello,
    Reset,
    LoadOperation(&'a OperationDescriptor),
    RunOperation(OperationHandle),
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Hello => commands::HELLO,
            Command::Reset => commands::RESET,
            Command::LoadOperation(_) => commands::LOAD_OPERATION,
            Command::RunOperation(_) => commands::RUN_OPERATION,
        }
    }

    /// Write the command name followed by its arguments.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), IoError> {
        write_item(&mut *writer, self.name())?;
        match self {
            Command::Hello | Command::Reset => {}
            Command::LoadOperation(descriptor) => {
                write_item(&mut *writer, descriptor.name())?;
                write_item(&mut *writer, &descriptor.params_map())?;
            }
            Command::RunOperation(handle) => write_item(&mut *writer, handle)?,
        }
        Ok(())
    }
}

/// Encode one CBOR item.
pub fn write_item<T, W>(writer: W, value: &T) -> Result<(), IoError>
where
    T: Serialize + ?Sized,
    W: Write,
{
    ciborium::into_writer(value, writer).map_err(|e| match e {
        ciborium::ser::Error::Io(io) => io,
        ciborium::ser::Error::Value(message) => IoError::new(ErrorKind::InvalidInput, message),
    })
}

/// Decode exactly one CBOR item, leaving anything after it unread.
///
/// Malformed or mistyped input is reported as [`ErrorKind::InvalidData`] so
/// callers can tell framing problems apart from a broken connection.
pub fn read_item<T, R>(reader: R) -> Result<T, IoError>
where
    T: DeserializeOwned,
    R: Read,
{
    ciborium::from_reader(reader).map_err(|e| match e {
        ciborium::de::Error::Io(io) => io,
        ciborium::de::Error::Syntax(offset) => IoError::new(
            ErrorKind::InvalidData,
            format!("malformed CBOR at offset {offset}"),
        ),
        ciborium::de::Error::Semantic(_, message) => {
            IoError::new(ErrorKind::InvalidData, message)
        }
        ciborium::de::Error::RecursionLimitExceeded => {
            IoError::new(ErrorKind::InvalidData, "CBOR nesting too deep")
        }
    })
}
