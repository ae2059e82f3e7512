use crate::error::RewriteRemoteError;

use common::ErrorLocation;

use remoting_core::descriptor::ParamValue;

use std::panic::Location;

/// Parse a `key=value` command line parameter.
///
/// The value becomes a bool for `true`/`false`, an integer or float when it
/// parses as one, and text otherwise. Quoting the value in single or double
/// quotes forces text.
#[track_caller]
pub fn parse_param(raw: &str) -> Result<(String, ParamValue), RewriteRemoteError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(RewriteRemoteError::Cli {
            message: format!("Expected key=value, got '{raw}'"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(RewriteRemoteError::Cli {
            message: format!("Missing parameter name in '{raw}'"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok((key.to_string(), parse_value(value)))
}

pub fn parse_value(value: &str) -> ParamValue {
    if let Some(text) = unquote(value) {
        return ParamValue::Text(text.to_string());
    }

    match value {
        "true" => return ParamValue::Bool(true),
        "false" => return ParamValue::Bool(false),
        _ => {}
    }

    if let Ok(integer) = value.parse::<i64>() {
        return ParamValue::Integer(integer);
    }

    // "inf" and "NaN" parse as floats but are almost always meant as words.
    if value.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(float) = value.parse::<f64>() {
            return ParamValue::Float(float);
        }
    }

    ParamValue::Text(value.to_string())
}

fn unquote(value: &str) -> Option<&str> {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
}
