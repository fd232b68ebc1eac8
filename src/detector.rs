//! Two-tier detection of a usable service manager.
//!
//! The system-level check is a cheap filesystem check. The user-level check
//! talks to `systemctl --user`, because the system manager can be up while
//! the session's user manager is not (sudo environments, older distros).

use std::io;
use std::path::PathBuf;

use tracing::{debug, error, warn};

use crate::command::{ControlCommand, Systemctl};
use crate::config::SupervisionConfig;
use crate::types::{is_unit_active, ManagerState, SupervisionStatus};

const IS_SYSTEM_RUNNING: [&str; 2] = ["--user", "is-system-running"];

/// Answers "is there a service manager, and is it healthy for this user?"
#[derive(Debug, Clone)]
pub struct InitSystemDetector<C = Systemctl> {
    system_marker: PathBuf,
    bus_unit: String,
    command: C,
}

impl Default for InitSystemDetector<Systemctl> {
    fn default() -> Self {
        Self::new()
    }
}

impl InitSystemDetector<Systemctl> {
    /// Detector for a stock systemd installation.
    pub fn new() -> Self {
        Self::from_config(&SupervisionConfig::default())
    }

    pub fn from_config(config: &SupervisionConfig) -> Self {
        InitSystemDetector {
            system_marker: config.system_marker.clone(),
            bus_unit: config.bus_unit.clone(),
            command: Systemctl::new(config.control_program.clone()),
        }
    }
}

impl<C: ControlCommand> InitSystemDetector<C> {
    /// Replaces the control command, keeping the rest of the configuration.
    pub fn with_command<N: ControlCommand>(self, command: N) -> InitSystemDetector<N> {
        InitSystemDetector {
            system_marker: self.system_marker,
            bus_unit: self.bus_unit,
            command,
        }
    }

    /// `true` if the service manager runs as the system manager.
    ///
    /// Checks that the runtime marker directory exists without following a
    /// symlink. Never spawns a process.
    pub fn is_system_supervisor_present(&self) -> bool {
        std::fs::symlink_metadata(&self.system_marker)
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// `true` if the user manager is `running`, or `degraded` with an active
    /// session bus. Every other outcome is logged and reported as `false`.
    pub fn is_user_supervisor_healthy(&self) -> bool {
        self.user_status().is_usable()
    }

    /// `is_system_supervisor_present() && is_user_supervisor_healthy()`.
    ///
    /// The user manager is not queried when the system marker is missing.
    pub fn is_supervision_usable(&self) -> bool {
        self.is_system_supervisor_present() && self.is_user_supervisor_healthy()
    }

    /// Full status, for callers that want more than a boolean.
    pub fn status(&self) -> SupervisionStatus {
        if !self.is_system_supervisor_present() {
            debug!(marker = %self.system_marker.display(), "no system service manager");
            return SupervisionStatus::Unavailable;
        }
        self.user_status()
    }

    /// Runs `--user is-system-running` and classifies its output.
    ///
    /// `Err` only when the control command could not be run.
    pub fn user_manager_state(&self) -> io::Result<ManagerState> {
        self.command.run(&IS_SYSTEM_RUNNING).map(|out| ManagerState::parse(&out))
    }

    fn user_status(&self) -> SupervisionStatus {
        let state = match self.user_manager_state() {
            Ok(state) => state,
            Err(err) => {
                error!(error = %err, "failed to run systemctl: check user manager status");
                return SupervisionStatus::Unknown;
            }
        };

        match state {
            ManagerState::Running => SupervisionStatus::Running,
            // Some unrelated unit failed. Usable as long as the session bus is up.
            ManagerState::Degraded => {
                if self.is_bus_active() {
                    SupervisionStatus::Degraded
                } else {
                    debug!(unit = %self.bus_unit, "user manager degraded and session bus inactive");
                    SupervisionStatus::Unavailable
                }
            }
            ManagerState::Unreachable => {
                error!("failed to reach the user-level service manager");
                SupervisionStatus::Unknown
            }
            ManagerState::Unexpected(status) => {
                error!(%status, "service manager reported an unexpected status");
                SupervisionStatus::Unknown
            }
        }
    }

    fn is_bus_active(&self) -> bool {
        match self.command.run(&["--user", "is-active", self.bus_unit.as_str()]) {
            Ok(out) => is_unit_active(&out),
            Err(err) => {
                warn!(error = %err, unit = %self.bus_unit, "failed to run systemctl: check bus activity");
                false
            }
        }
    }
}
