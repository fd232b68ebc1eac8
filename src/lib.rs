//! # LifecycleForge
//!
//! **LifecycleForge** lets a long-running Rust daemon cooperate with the service manager that supervises it (systemd).
//! It answers three startup questions and performs one startup action:
//!
//! - Is a service manager running, and is the user-session manager healthy? ([`InitSystemDetector`])
//! - Was a listening socket passed down by socket activation, and if so, which one? ([`ActivationSocketResolver`])
//! - Once initialization is done, tell the manager we are ready ([`ReadinessNotifier`]).
//!
//! Every check has a non-supervised fallback: absence is reported as `false` or `None`, never as an error.
//!
//! ```no_run
//! use std::net::TcpListener;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = match lifecycle_forge::listener_from_environment()? {
//!         Some(inherited) => inherited.into_tcp().ok_or("expected a TCP socket")?,
//!         None => TcpListener::bind("127.0.0.1:8080")?,
//!     };
//!     lifecycle_forge::notify_startup_finished();
//!     # drop(listener);
//!     Ok(())
//! }
//! ```

mod command;
mod config;
mod detector;
mod env;
mod error;
mod notify;
mod sys;
mod types;

#[cfg(unix)]
mod activation;
#[cfg(unix)]
mod listener;

#[cfg(test)]
mod test_support;

// Re-export public types to keep the API flat
pub use command::{ControlCommand, Systemctl};
pub use config::{
    SupervisionConfig, DEFAULT_BUS_UNIT, DEFAULT_CONTROL_PROGRAM, SD_LISTEN_FDS_START,
    SYSTEMD_RUNTIME_MARKER,
};
pub use detector::InitSystemDetector;
pub use env::{Environment, ProcessEnv, StaticEnv};
pub use error::{LifecycleError, LifecycleResult};
pub use notify::{ReadinessNotifier, NOTIFY_SOCKET};
pub use types::{is_unit_active, ActivationMode, ManagerState, SupervisionStatus};

#[cfg(unix)]
pub use activation::{ActivationSocketResolver, LISTEN_FDNAMES, LISTEN_FDS, LISTEN_PID};
#[cfg(unix)]
pub use listener::{InheritedListener, ListenerKind};

/// `true` if systemd runs as system manager *and* the user manager is healthy.
pub fn is_supervision_usable() -> bool {
    InitSystemDetector::new().is_supervision_usable()
}

/// `true` if `LISTEN_FDS` is set to a non-empty value.
#[cfg(unix)]
pub fn is_socket_activated() -> bool {
    ActivationSocketResolver::new().is_socket_activated()
}

/// The socket passed by the service manager, or `Ok(None)` if there is none.
///
/// More than one passed socket is a configuration error.
#[cfg(unix)]
pub fn listener_from_environment() -> LifecycleResult<Option<InheritedListener>> {
    ActivationSocketResolver::new().resolve_listener()
}

/// Tells the service manager that startup has finished. Never fails.
pub fn notify_startup_finished() {
    ReadinessNotifier::new().notify_ready();
}
