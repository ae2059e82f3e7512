use crate::descriptor::{OperationDescriptor, OperationHandle, ParamValue};
use crate::protocol::{Command, commands, read_item, write_item};

use std::collections::BTreeMap;
use std::io::{Cursor, ErrorKind};

/// **VALUE**: `load-operation` is written as name, descriptor name and an ordered params map.
///
/// **BUG THIS CATCHES**: Would catch a framing change that a worker expecting
/// three back-to-back items could no longer parse.
#[test]
fn given_load_command_when_written_then_worker_reads_three_items() {
    // GIVEN: A descriptor with parameters
    let descriptor = OperationDescriptor::new("add-property")
        .with_param("key", "color")
        .with_param("value", 3);

    // WHEN: Writing the command
    let mut buf = Vec::new();
    Command::LoadOperation(&descriptor)
        .write_to(&mut buf)
        .expect("write should succeed");

    // THEN: The items come back in order
    let mut cursor = Cursor::new(buf);
    let command: String = read_item(&mut cursor).expect("command");
    let name: String = read_item(&mut cursor).expect("name");
    let params: BTreeMap<String, ParamValue> = read_item(&mut cursor).expect("params");

    assert_eq!(command, commands::LOAD_OPERATION);
    assert_eq!(name, "add-property");
    assert_eq!(params.get("key"), Some(&ParamValue::from("color")));
    assert_eq!(params.get("value"), Some(&ParamValue::Integer(3)));
    assert_eq!(cursor.position() as usize, cursor.get_ref().len());
}

#[test]
fn given_run_command_when_written_then_handle_follows_name() {
    let mut buf = Vec::new();
    Command::RunOperation(OperationHandle(42))
        .write_to(&mut buf)
        .expect("write should succeed");

    let mut cursor = Cursor::new(buf);
    let command: String = read_item(&mut cursor).expect("command");
    let handle: OperationHandle = read_item(&mut cursor).expect("handle");

    assert_eq!(command, commands::RUN_OPERATION);
    assert_eq!(handle, OperationHandle(42));
}

#[test]
fn given_hello_and_reset_when_written_then_only_name_is_sent() {
    for (command, expected) in [(Command::Hello, "hello"), (Command::Reset, "reset")] {
        let mut buf = Vec::new();
        command.write_to(&mut buf).expect("write should succeed");

        let mut cursor = Cursor::new(buf);
        let name: String = read_item(&mut cursor).expect("name");
        assert_eq!(name, expected);
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }
}

/// **VALUE**: Reading one item leaves trailing bytes for the next reader.
///
/// **BUG THIS CATCHES**: Would catch a buffered decoder swallowing the start of
/// a streamed payload that follows the handle.
#[test]
fn given_trailing_bytes_when_item_read_then_rest_is_untouched() {
    let mut buf = Vec::new();
    write_item(&mut buf, &5u32).expect("write");
    buf.extend_from_slice(b"payload");

    let mut cursor = Cursor::new(buf);
    let value: u32 = read_item(&mut cursor).expect("read");

    assert_eq!(value, 5);
    let rest = &cursor.get_ref()[cursor.position() as usize..];
    assert_eq!(rest, b"payload");
}

#[test]
fn given_wrong_item_type_when_read_then_invalid_data() {
    let mut buf = Vec::new();
    write_item(&mut buf, "not a handle").expect("write");

    let error = read_item::<OperationHandle, _>(Cursor::new(buf)).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidData);
}

#[test]
fn given_empty_input_when_read_then_unexpected_eof() {
    let error = read_item::<u32, _>(Cursor::new(Vec::new())).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UnexpectedEof);
}
