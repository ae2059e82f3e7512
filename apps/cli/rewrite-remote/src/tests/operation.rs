use crate::error::RewriteRemoteError;
use crate::worker::Operation;

use remoting_core::descriptor::ParamValue;

use std::collections::BTreeMap;

fn params(entries: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn add_property(key: &str, value: &str) -> Operation {
    Operation::AddProperty {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// **VALUE**: A missing property is appended on its own line.
#[test]
fn given_missing_property_when_applied_then_appended() {
    let operation = add_property("from_host", "new_value");

    assert_eq!(
        operation.apply("#comment\n"),
        "#comment\nfrom_host = new_value\n"
    );
    assert_eq!(
        operation.apply("existing = value"),
        "existing = value\nfrom_host = new_value\n"
    );
    assert_eq!(operation.apply(""), "from_host = new_value\n");
}

/// **VALUE**: Running add-property on its own output changes nothing.
///
/// **WHY THIS MATTERS**: The host runs the same operation against the returned
/// snapshot; a non-idempotent operation would grow the file on every run.
#[test]
fn given_property_already_defined_when_applied_then_unchanged() {
    let operation = add_property("color", "blue");
    let text = "size: large\n  color = red\n";

    assert_eq!(operation.apply(text), text);
    let once = operation.apply("a = 1\n");
    assert_eq!(operation.apply(&once), once);
}

#[test]
fn given_commented_out_property_when_applied_then_still_added() {
    let operation = add_property("color", "blue");

    assert_eq!(
        operation.apply("# color = red\n"),
        "# color = red\ncolor = blue\n"
    );
}

#[test]
fn given_request_params_when_built_then_scalars_become_text() {
    let operation = Operation::from_request(
        "add-property",
        &params(&[("key", ParamValue::from("retries")), ("value", ParamValue::Integer(3))]),
    )
    .expect("build");

    assert_eq!(operation, add_property("retries", "3"));
    assert_eq!(
        Operation::from_request("echo", &BTreeMap::new()).expect("build"),
        Operation::Echo
    );
}

#[test]
fn given_bad_requests_when_built_then_cli_error() {
    let missing_value = params(&[("key", ParamValue::from("k"))]);
    let list_value = params(&[
        ("key", ParamValue::from("k")),
        ("value", ParamValue::List(vec![])),
    ]);

    for (name, request) in [
        ("add-property", &missing_value),
        ("add-property", &list_value),
        ("rename", &missing_value),
    ] {
        let result = Operation::from_request(name, request);
        assert!(
            matches!(result, Err(RewriteRemoteError::Worker { .. })),
            "Expected error for {name} {request:?}"
        );
    }
}
