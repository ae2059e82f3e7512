use crate::tracker::{Snapshot, StateTracker};

#[derive(Debug, Clone, PartialEq)]
struct Page {
    id: u32,
    body: String,
}

impl Page {
    fn new(id: u32, body: &str) -> Self {
        Self {
            id,
            body: body.to_string(),
        }
    }
}

impl Snapshot for Page {
    type Id = u32;

    fn snapshot_id(&self) -> u32 {
        self.id
    }
}

/// **VALUE**: Sending back exactly what the worker returned allows an incremental send.
#[test]
fn given_recorded_result_when_same_document_sent_then_prior_is_returned() {
    // GIVEN: A result recorded for document 1
    let mut tracker = StateTracker::new();
    let result = Page::new(1, "a = 1");
    tracker.record(&result);

    // WHEN: The caller sends that exact result back
    let prior = tracker.prior_for(&result);

    // THEN: The tracked snapshot is offered as the prior
    assert_eq!(prior, Some(result));
}

/// **VALUE**: A document that diverged from the tracked result forces a full send.
///
/// **BUG THIS CATCHES**: Would catch the tracker offering a stale prior, which
/// would let the worker apply an edit to the wrong base.
#[test]
fn given_modified_document_when_prior_requested_then_none_and_entry_dropped() {
    // GIVEN: A tracked result
    let mut tracker = StateTracker::new();
    tracker.record(&Page::new(1, "a = 1"));

    // WHEN: The caller sends an edited version
    let prior = tracker.prior_for(&Page::new(1, "a = 2"));

    // THEN: No prior, and the stale entry is gone
    assert_eq!(prior, None);
    assert!(tracker.get(&1).is_none());
    assert!(tracker.is_empty());
}

#[test]
fn given_two_documents_when_one_changes_then_other_stays_tracked() {
    let mut tracker = StateTracker::new();
    let first = Page::new(1, "one");
    let second = Page::new(2, "two");
    tracker.record(&first);
    tracker.record(&second);

    assert_eq!(tracker.prior_for(&Page::new(1, "changed")), None);
    assert_eq!(tracker.prior_for(&second), Some(second.clone()));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn given_unknown_document_when_prior_requested_then_none() {
    let mut tracker: StateTracker<Page> = StateTracker::default();

    assert_eq!(tracker.prior_for(&Page::new(9, "x")), None);
}

#[test]
fn given_tracked_documents_when_cleared_or_forgotten_then_removed() {
    let mut tracker = StateTracker::new();
    tracker.record(&Page::new(1, "one"));
    tracker.record(&Page::new(2, "two"));

    assert_eq!(tracker.forget(&1), Some(Page::new(1, "one")));
    assert_eq!(tracker.len(), 1);

    tracker.clear();
    assert!(tracker.is_empty());
}

#[test]
fn given_newer_result_when_recorded_then_replaces_previous() {
    let mut tracker = StateTracker::new();
    tracker.record(&Page::new(1, "v1"));
    tracker.record(&Page::new(1, "v2"));

    assert_eq!(tracker.get(&1), Some(&Page::new(1, "v2")));
    assert_eq!(tracker.len(), 1);
}
