use crate::error::RewriteRemoteError;

use common::ErrorLocation;

use remoting_core::descriptor::ParamValue;

use std::collections::BTreeMap;
use std::panic::Location;

pub const ADD_PROPERTY: &str = "add-property";
pub const ECHO: &str = "echo";

/// An operation the reference worker knows how to apply to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Append `key = value` unless some line already defines `key`.
    AddProperty { key: String, value: String },

    /// Return the text unchanged.
    Echo,
}

impl Operation {
    /// Build an operation from a `load-operation` request.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteRemoteError::Worker`] for unknown names or missing
    /// parameters.
    #[track_caller]
    pub fn from_request(
        name: &str,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<Self, RewriteRemoteError> {
        match name {
            ADD_PROPERTY => Ok(Operation::AddProperty {
                key: required_scalar(params, "key")?,
                value: required_scalar(params, "value")?,
            }),
            ECHO => Ok(Operation::Echo),
            other => Err(RewriteRemoteError::Worker {
                message: format!("Unknown operation '{other}'"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            Operation::AddProperty { key, value } => add_property(text, key, value),
            Operation::Echo => text.to_string(),
        }
    }
}

fn add_property(text: &str, key: &str, value: &str) -> String {
    let defined = text
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| line.split_once(['=', ':']))
        .any(|(existing, _)| existing.trim() == key);

    if defined {
        return text.to_string();
    }

    let mut result = text.to_string();
    if !result.is_empty() && !result.ends_with('\n') {
        result.push('\n');
    }
    result.push_str(&format!("{key} = {value}\n"));
    result
}

#[track_caller]
fn required_scalar(
    params: &BTreeMap<String, ParamValue>,
    name: &str,
) -> Result<String, RewriteRemoteError> {
    let location = ErrorLocation::from(Location::caller());

    match params.get(name) {
        Some(ParamValue::Text(text)) => Ok(text.clone()),
        Some(ParamValue::Bool(b)) => Ok(b.to_string()),
        Some(ParamValue::Integer(i)) => Ok(i.to_string()),
        Some(ParamValue::Float(f)) => Ok(f.to_string()),
        Some(other) => Err(RewriteRemoteError::Worker {
            message: format!("Parameter '{name}' must be a scalar, got {other}"),
            location,
        }),
        None => Err(RewriteRemoteError::Worker {
            message: format!("Missing parameter '{name}'"),
            location,
        }),
    }
}
