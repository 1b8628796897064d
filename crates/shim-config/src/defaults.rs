//! Default values shared by the configuration loader and the binary.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Virtual environment holding the Ansible installation.
pub const DEFAULT_PYTHON_ENVIRONMENT: &str = "/etc/osconfig/python";

/// Directory holding the Chef and cloud-init helper scripts.
pub const DEFAULT_SCRIPTS_DIRECTORY: &str = "/usr/lib/osconfig";

/// Directory where scratch payload files are created.
pub const DEFAULT_SCRATCH_DIRECTORY: &str = "/tmp";

/// Distribution name handed to cloud-init.
pub const DEFAULT_CLOUD_INIT_DISTRO: &str = "ubuntu";

/// Client name used when the host does not supply one.
pub const DEFAULT_CLIENT_NAME: &str = "mmi-shim";

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default Python environment path.
#[must_use]
pub fn default_python_environment() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PYTHON_ENVIRONMENT)
}

/// Default helper script directory.
#[must_use]
pub fn default_scripts_directory() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SCRIPTS_DIRECTORY)
}

/// Default scratch directory.
#[must_use]
pub fn default_scratch_directory() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SCRATCH_DIRECTORY)
}

/// Default cloud-init distribution.
#[must_use]
pub fn default_cloud_init_distro() -> String {
    DEFAULT_CLOUD_INIT_DISTRO.to_owned()
}

/// Default session client name.
#[must_use]
pub fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_owned()
}
