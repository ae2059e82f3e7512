use crate::ErrorLocation;

use std::panic::Location;

#[track_caller]
fn raise_here() -> ErrorLocation {
    ErrorLocation::from(Location::caller())
}

/// **VALUE**: Verifies that a location captured through a `#[track_caller]` helper points at
/// the helper's caller.
///
/// **WHY THIS MATTERS**: Every remoting error (connection, startup, registration) is built
/// inside small helpers. If the location stopped propagating, every error would report the
/// helper's own line and the bracketed position in logs would be useless.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` were dropped from a helper or if the
/// line/column were read from the wrong `Location`.
#[test]
fn given_track_caller_helper_when_location_captured_then_reports_call_site() {
    // GIVEN: The line of the call site
    let expected_line = line!() + 3;

    // WHEN: Capturing through the helper
    let location = raise_here();

    // THEN: The reported line is the call site, in this file
    assert_eq!(location.line, expected_line);
    assert!(location.file.ends_with("error_location.rs"));
    assert!(location.column > 0);
}

/// **VALUE**: Verifies the `[file:line:column]` rendering used as the suffix of every error
/// message.
///
/// **WHY THIS MATTERS**: Log lines are grepped by this suffix when diagnosing worker startup
/// and protocol failures.
///
/// **BUG THIS CATCHES**: Would catch a changed delimiter or a missing component.
#[test]
fn given_fixed_location_when_displayed_then_renders_bracketed_triple() {
    // GIVEN: A hand-built location
    let location = ErrorLocation {
        file: "src/transport.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting it
    let rendered = location.to_string();

    // THEN: All three parts appear in order inside brackets
    assert_eq!(rendered, "[src/transport.rs:42:7]");
}
