use std::fmt;

// =========================================================================
// Supervision
// =========================================================================

/// Overall answer of the detector, derived fresh on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStatus {
    /// No service manager, or one that cannot serve this session.
    Unavailable,
    /// The user manager reports `running`.
    Running,
    /// The user manager reports `degraded` but the session bus is active.
    Degraded,
    /// The manager was expected but could not be queried or gave an
    /// unrecognised answer.
    Unknown,
}

impl SupervisionStatus {
    /// `true` for the states in which supervised startup can proceed.
    pub fn is_usable(self) -> bool {
        matches!(self, SupervisionStatus::Running | SupervisionStatus::Degraded)
    }
}

impl fmt::Display for SupervisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupervisionStatus::Unavailable => "unavailable",
            SupervisionStatus::Running => "running",
            SupervisionStatus::Degraded => "degraded",
            SupervisionStatus::Unknown => "unknown",
        })
    }
}

/// What `systemctl --user is-system-running` printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerState {
    Running,
    /// Some unit failed. Not a failure of the manager itself.
    Degraded,
    /// Nothing on stdout: the user manager could not be reached.
    Unreachable,
    /// Any other state (`starting`, `stopping`, `offline`, ...).
    Unexpected(String),
}

impl ManagerState {
    /// Classifies the raw stdout of `is-system-running`. Surrounding whitespace is ignored.
    pub fn parse(output: &str) -> Self {
        match output.trim() {
            "running" => ManagerState::Running,
            "degraded" => ManagerState::Degraded,
            "" => ManagerState::Unreachable,
            other => ManagerState::Unexpected(other.to_owned()),
        }
    }
}

/// `true` iff `systemctl is-active` printed exactly `active`.
pub fn is_unit_active(output: &str) -> bool {
    output.trim() == "active"
}

// =========================================================================
// Activation
// =========================================================================

/// Whether the service manager started us with pre-opened sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    NotActivated,
    SocketActivated,
}
