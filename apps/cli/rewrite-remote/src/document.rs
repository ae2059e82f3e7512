//! Plain-text documents and the codec that carries them to the worker.
//!
//! Payloads are single CBOR arrays written after the `run-operation` handle:
//!
//! - `["full", id, text]` when the worker holds no usable copy
//! - `["unchanged", id]` when the worker's copy from the previous result is
//!   exactly the document being sent
//!
//! The worker answers with the resulting text as a CBOR text string.

use remoting_core::descriptor::OperationDescriptor;
use remoting_core::protocol::{read_item, write_item};
use remoting_core::tracker::Snapshot;
use remoting_core::{RemotingClient, RemotingError};

use std::io::{Error as IoError, ErrorKind, Read, Write};

use ciborium::Value;

pub const FULL_TAG: &str = "full";
pub const UNCHANGED_TAG: &str = "unchanged";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    id: u64,
    text: String,
}

impl TextDocument {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Snapshot for TextDocument {
    type Id = u64;

    fn snapshot_id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPayload {
    Full { id: u64, text: String },
    Unchanged { id: u64 },
}

impl TextPayload {
    /// The payload for `document`, given the snapshot the worker holds.
    pub fn for_document(document: &TextDocument, previous: Option<&TextDocument>) -> Self {
        match previous {
            Some(_) => TextPayload::Unchanged { id: document.id },
            None => TextPayload::Full {
                id: document.id,
                text: document.text.clone(),
            },
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            TextPayload::Full { id, .. } | TextPayload::Unchanged { id } => *id,
        }
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), IoError> {
        match self {
            TextPayload::Full { id, text } => write_item(writer, &(FULL_TAG, id, text)),
            TextPayload::Unchanged { id } => write_item(writer, &(UNCHANGED_TAG, id)),
        }
    }

    /// Read one payload.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidData`] for anything that is not one of the two
    /// payload shapes.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, IoError> {
        let value: Value = read_item(reader)?;
        let Value::Array(items) = value else {
            return Err(invalid("payload is not an array"));
        };

        match items.as_slice() {
            [Value::Text(tag), Value::Integer(id), Value::Text(text)] if tag == FULL_TAG => {
                Ok(TextPayload::Full {
                    id: document_id(*id)?,
                    text: text.clone(),
                })
            }
            [Value::Text(tag), Value::Integer(id)] if tag == UNCHANGED_TAG => {
                Ok(TextPayload::Unchanged {
                    id: document_id(*id)?,
                })
            }
            _ => Err(invalid("unrecognized payload shape")),
        }
    }
}

fn document_id(id: ciborium::value::Integer) -> Result<u64, IoError> {
    u64::try_from(id).map_err(|_| invalid("document id out of range"))
}

fn invalid(message: &str) -> IoError {
    IoError::new(ErrorKind::InvalidData, message.to_string())
}

/// Run `descriptor` on `document` through the text codec.
#[track_caller]
pub fn run_text_operation(
    client: &RemotingClient<TextDocument>,
    descriptor: &OperationDescriptor,
    document: &TextDocument,
) -> Result<TextDocument, RemotingError> {
    let id = document.id;

    client.run_operation(
        descriptor,
        document,
        |sink, previous| TextPayload::for_document(document, previous).write_to(sink),
        |source| {
            let text: String = read_item(source)?;
            Ok(TextDocument::new(id, text))
        },
    )
}
