use crate::error::RewriteRemoteError;
use crate::params::{parse_param, parse_value};

use remoting_core::descriptor::ParamValue;

/// **VALUE**: Command line values become the most specific parameter type.
///
/// **WHY THIS MATTERS**: Parameter values are part of the registry cache key and
/// are sent to the worker as typed CBOR. `value=3` and `value="3"` are
/// different operations.
#[test]
fn given_raw_values_when_parsed_then_typed() {
    let cases = [
        ("true", ParamValue::Bool(true)),
        ("false", ParamValue::Bool(false)),
        ("42", ParamValue::Integer(42)),
        ("-7", ParamValue::Integer(-7)),
        ("2.5", ParamValue::Float(2.5)),
        ("blue", ParamValue::from("blue")),
        ("inf", ParamValue::from("inf")),
        ("\"42\"", ParamValue::from("42")),
        ("'true'", ParamValue::from("true")),
        ("", ParamValue::from("")),
    ];

    for (raw, expected) in cases {
        assert_eq!(parse_value(raw), expected, "Parsing {raw:?}");
    }
}

#[test]
fn given_key_value_when_parsed_then_split_at_first_equals() {
    let (key, value) = parse_param("expr=a=b").expect("parse");

    assert_eq!(key, "expr");
    assert_eq!(value, ParamValue::from("a=b"));
}

#[test]
fn given_missing_equals_or_key_when_parsed_then_cli_error() {
    for raw in ["novalue", "=x", "  =x"] {
        let result = parse_param(raw);
        assert!(
            matches!(result, Err(RewriteRemoteError::Cli { .. })),
            "Expected error for {raw:?}"
        );
    }
}
