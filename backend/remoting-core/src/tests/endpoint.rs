use crate::SOCKET_FILE_PREFIX;
use crate::supervisor::endpoint::{EmbeddedWorker, choose_socket_path, platform_executable_name};

use std::fs;

use tempfile::TempDir;

#[test]
fn given_free_preferred_path_when_choosing_then_preferred_is_used() {
    let dir = TempDir::new().expect("tempdir");
    let preferred = dir.path().join("worker.sock");

    assert_eq!(choose_socket_path(&preferred), preferred);
}

/// **VALUE**: An occupied well-known path falls back to a fresh random path.
///
/// **BUG THIS CATCHES**: Would catch two sessions on one machine both binding
/// the same socket and talking to each other's worker.
#[test]
fn given_occupied_preferred_path_when_choosing_then_random_fallback() {
    // GIVEN: Something already lives at the preferred path
    let dir = TempDir::new().expect("tempdir");
    let preferred = dir.path().join("worker.sock");
    fs::write(&preferred, b"").expect("write");

    // WHEN: Choosing twice
    let first = choose_socket_path(&preferred);
    let second = choose_socket_path(&preferred);

    // THEN: Both avoid the preferred path and differ from each other
    assert_ne!(first, preferred);
    assert_ne!(first, second);
    let name = first.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(name.starts_with(SOCKET_FILE_PREFIX), "Unexpected name {name}");
    assert!(name.ends_with(".sock"));
}

#[test]
fn given_base_name_when_platform_name_built_then_has_platform_suffix() {
    let name = platform_executable_name("remoting-worker");

    if cfg!(target_os = "macos") {
        assert_eq!(name, "remoting-worker.osx");
    } else {
        assert_eq!(name, "remoting-worker.linux");
    }
}

#[test]
fn given_dev_tree_without_binary_when_resolved_then_none() {
    let dir = TempDir::new().expect("tempdir");
    let worker = EmbeddedWorker::new("remoting-worker", b"#!/bin/sh\n").with_dev_tree_dir(dir.path());

    assert_eq!(worker.dev_tree_path(), None);
}
