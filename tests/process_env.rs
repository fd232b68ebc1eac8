//! Reads the real process handshake, so it runs alone in its own test binary.
#![cfg(unix)]

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use lifecycle_forge::{
    is_socket_activated, listener_from_environment, ActivationSocketResolver, Environment,
    ProcessEnv, LISTEN_FDS, LISTEN_PID,
};

#[test]
fn process_handshake_is_read_through_sd_notify() {
    // Set but not UTF-8: still activated.
    unsafe { std::env::set_var(LISTEN_FDS, OsStr::from_bytes(b"\xff")) };
    assert!(ProcessEnv.is_set(LISTEN_FDS));
    assert!(is_socket_activated());

    // Variables meant for another process: nothing to adopt, nothing unset.
    unsafe {
        std::env::set_var(LISTEN_FDS, "1");
        std::env::set_var(LISTEN_PID, "1");
    }
    assert!(listener_from_environment().unwrap().is_none());
    assert_eq!(ActivationSocketResolver::new().inherited_count().unwrap(), 0);
    assert_eq!(std::env::var(LISTEN_FDS).as_deref(), Ok("1"));
    assert_eq!(std::env::var(LISTEN_PID).as_deref(), Ok("1"));
    assert!(is_socket_activated());

    // One claim per process.
    assert!(ProcessEnv.claim_listener());
    assert!(!ProcessEnv.claim_listener());
    ProcessEnv.release_listener();

    unsafe {
        std::env::remove_var(LISTEN_FDS);
        std::env::remove_var(LISTEN_PID);
    }
}
