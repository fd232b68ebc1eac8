use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// First descriptor number used for socket activation (`SD_LISTEN_FDS_START`).
pub const SD_LISTEN_FDS_START: i32 = 3;

/// Directory that exists only while systemd runs as the system manager.
pub const SYSTEMD_RUNTIME_MARKER: &str = "/run/systemd/system";

/// Control binary used for the user-manager queries.
pub const DEFAULT_CONTROL_PROGRAM: &str = "systemctl";

/// Session bus unit whose health decides whether a degraded manager is usable.
pub const DEFAULT_BUS_UNIT: &str = "dbus.service";

/// Where to look for the service manager.
///
/// The defaults match a stock systemd installation; every field can be
/// overridden with the builder methods.
///
/// ```
/// use lifecycle_forge::SupervisionConfig;
///
/// let config = SupervisionConfig::new()
///     .control_program("/usr/bin/systemctl")
///     .bus_unit("dbus-broker.service");
/// assert_eq!(config.bus_unit_name(), "dbus-broker.service");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisionConfig {
    pub(crate) control_program: OsString,
    pub(crate) system_marker: PathBuf,
    pub(crate) bus_unit: String,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisionConfig {
    /// Creates a configuration with the systemd defaults.
    ///
    /// # Defaults
    /// - Control program: `systemctl`
    /// - System marker: `/run/systemd/system`
    /// - Bus unit: `dbus.service`
    pub fn new() -> Self {
        SupervisionConfig {
            control_program: OsString::from(DEFAULT_CONTROL_PROGRAM),
            system_marker: PathBuf::from(SYSTEMD_RUNTIME_MARKER),
            bus_unit: DEFAULT_BUS_UNIT.to_owned(),
        }
    }

    // --- Public Getters ---

    pub fn control_program_path(&self) -> &OsStr { &self.control_program }

    pub fn system_marker_path(&self) -> &Path { &self.system_marker }

    pub fn bus_unit_name(&self) -> &str { &self.bus_unit }

    // --- Builder Methods ---

    /// Sets the binary invoked for the `--user` queries.
    pub fn control_program<S: Into<OsString>>(mut self, program: S) -> Self {
        self.control_program = program.into();
        self
    }

    /// Sets the directory whose presence marks a running system manager.
    pub fn system_marker<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.system_marker = path.into();
        self
    }

    /// Sets the unit queried when the user manager reports `degraded`.
    pub fn bus_unit(mut self, unit: &str) -> Self {
        self.bus_unit = unit.to_owned();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_systemd() {
        let config = SupervisionConfig::default();
        assert_eq!(config.control_program_path(), OsStr::new("systemctl"));
        assert_eq!(config.system_marker_path(), Path::new("/run/systemd/system"));
        assert_eq!(config.bus_unit_name(), "dbus.service");
    }

    #[test]
    fn builder_overrides_each_field() {
        let config = SupervisionConfig::new()
            .control_program("/opt/bin/systemctl")
            .system_marker("/tmp/marker")
            .bus_unit("dbus-broker.service");
        assert_eq!(config.control_program_path(), OsStr::new("/opt/bin/systemctl"));
        assert_eq!(config.system_marker_path(), Path::new("/tmp/marker"));
        assert_eq!(config.bus_unit_name(), "dbus-broker.service");
    }
}
