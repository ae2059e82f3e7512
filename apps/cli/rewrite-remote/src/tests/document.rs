use crate::document::{FULL_TAG, TextDocument, TextPayload, UNCHANGED_TAG};

use remoting_core::protocol::{read_item, write_item};

use std::io::{Cursor, ErrorKind};

#[test]
fn given_no_prior_when_payload_built_then_full_text_sent() {
    let document = TextDocument::new(3, "a = 1\n");

    let payload = TextPayload::for_document(&document, None);

    assert_eq!(
        payload,
        TextPayload::Full {
            id: 3,
            text: String::from("a = 1\n")
        }
    );
}

/// **VALUE**: With a prior snapshot only the id goes on the wire.
///
/// **BUG THIS CATCHES**: Would catch the codec resending the whole document even
/// though the worker already holds it.
#[test]
fn given_prior_when_payload_written_then_only_tag_and_id() {
    // GIVEN: A document identical to what the worker holds
    let document = TextDocument::new(3, "a = 1\n".repeat(100));

    // WHEN: Writing the payload
    let mut buf = Vec::new();
    TextPayload::for_document(&document, Some(&document))
        .write_to(&mut buf)
        .expect("write");

    // THEN: The wire carries just ["unchanged", 3]
    let (tag, id): (String, u64) = read_item(Cursor::new(&buf)).expect("read");
    assert_eq!(tag, UNCHANGED_TAG);
    assert_eq!(id, 3);
    assert!(buf.len() < 16, "Payload too large: {} bytes", buf.len());
}

#[test]
fn given_written_payload_when_read_back_then_equal() {
    let payload = TextPayload::Full {
        id: 9,
        text: String::from("x = y"),
    };
    let mut buf = Vec::new();
    payload.write_to(&mut buf).expect("write");

    let read = TextPayload::read_from(Cursor::new(buf)).expect("read");

    assert_eq!(read, payload);
    assert_eq!(read.id(), 9);
}

#[test]
fn given_malformed_payloads_when_read_then_invalid_data() {
    let mut unknown_tag = Vec::new();
    write_item(&mut unknown_tag, &("partial", 1u64)).expect("write");
    let mut missing_text = Vec::new();
    write_item(&mut missing_text, &(FULL_TAG, 1u64)).expect("write");
    let mut negative_id = Vec::new();
    write_item(&mut negative_id, &(UNCHANGED_TAG, -1i64)).expect("write");
    let mut not_array = Vec::new();
    write_item(&mut not_array, "full").expect("write");

    for buf in [unknown_tag, missing_text, negative_id, not_array] {
        let error = TextPayload::read_from(Cursor::new(buf)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidData);
    }
}
