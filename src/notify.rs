//! Readiness notification over `$NOTIFY_SOCKET`.
//!
//! The protocol has no acknowledgement, so every call here is
//! fire-and-forget: nothing is returned and a missing or broken channel
//! is only visible at `debug` level. A service must never fail to start
//! because nobody is listening.

use tracing::debug;

use crate::env::{Environment, ProcessEnv};

pub const NOTIFY_SOCKET: &str = "NOTIFY_SOCKET";

/// Sends lifecycle notifications to the service manager.
///
/// The `NOTIFY_SOCKET` variable is left in place after sending, matching the
/// socket-activation variables. The datagram itself is always addressed by
/// `sd-notify` from the process environment; the injected environment only
/// answers [`is_notification_channel_present`](Self::is_notification_channel_present).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadinessNotifier<E = ProcessEnv> {
    env: E,
}

impl ReadinessNotifier<ProcessEnv> {
    pub fn new() -> Self {
        ReadinessNotifier { env: ProcessEnv }
    }
}

impl<E: Environment> ReadinessNotifier<E> {
    /// Reads `NOTIFY_SOCKET` from `env` instead of the process.
    pub fn with_env<N: Environment>(self, env: N) -> ReadinessNotifier<N> {
        ReadinessNotifier { env }
    }

    /// `true` if the service manager set up a notification channel.
    pub fn is_notification_channel_present(&self) -> bool {
        self.env.is_set(NOTIFY_SOCKET)
    }

    /// Sends `READY=1`. Call once, after startup has finished.
    pub fn notify_ready(&self) {
        send("READY=1", &[sys::State::Ready]);
    }

    /// Sends `STOPPING=1` at the start of a graceful shutdown.
    pub fn notify_stopping(&self) {
        send("STOPPING=1", &[sys::State::Stopping]);
    }

    /// Sends `STATUS=<msg>`, shown by `systemctl status`.
    pub fn notify_status(&self, msg: &str) {
        send("STATUS", &[sys::State::Status(msg)]);
    }
}

fn send(what: &str, states: &[sys::State<'_>]) {
    match sys::notify(states) {
        Ok(()) => debug!(state = what, "notified service manager"),
        Err(err) => debug!(state = what, error = %err, "service manager notification dropped"),
    }
}

#[cfg(unix)]
mod sys {
    pub(super) use sd_notify::NotifyState as State;

    pub(super) fn notify(states: &[State<'_>]) -> std::io::Result<()> {
        // `false`: keep NOTIFY_SOCKET set for later notifications.
        sd_notify::notify(false, states)
    }
}

#[cfg(not(unix))]
mod sys {
    #[allow(dead_code)] // only constructed, never sent
    pub(super) enum State<'a> {
        Ready,
        Stopping,
        Status(&'a str),
    }

    pub(super) fn notify(_: &[State<'_>]) -> std::io::Result<()> {
        Ok(())
    }
}
