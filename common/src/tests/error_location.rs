use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every error in the workspace ends with a location. If capture
/// breaks, a failed pairing or a dropped frame can no longer be traced to its call site.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `Location::caller()` stops being propagated correctly
/// - File path extraction breaks
/// - Line/column capture fails
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: Current caller location
    // WHEN: Creating ErrorLocation from caller
    let expected_line = line!() + 1;
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that ErrorLocation Display produces `[file:line:column]`.
///
/// **WHY THIS MATTERS**: Every error message appends this text. A broken format makes
/// log lines from the reconnect loop unreadable.
///
/// **BUG THIS CATCHES**: Would catch if the Display implementation drops the brackets
/// or one of the three components.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::caller();

    // WHEN: Formatting as string
    let formatted = format!("{}", location);

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(
        formatted.contains("error_location.rs"),
        "Should include filename"
    );
    assert!(
        formatted.ends_with(&format!(":{}:{}]", location.line, location.column)),
        "Should end with line and column"
    );
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the site of the helper call,
/// not the body of `caller()` itself.
///
/// **BUG THIS CATCHES**: Would catch if someone removes `#[track_caller]` from
/// `ErrorLocation::caller()`, which would make every error point into common.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing location from different call sites
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Should have same file but different line numbers
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert!(loc1.file.contains("tests"), "Should point at the test, not the helper");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}
