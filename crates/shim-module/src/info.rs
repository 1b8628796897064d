//! Static module descriptor returned by `GetInfo`.

use serde::{Deserialize, Serialize};
use shim_config::Backend;
use shim_engine::MappingTable;

/// Descriptor major version.
pub const VERSION_MAJOR: u32 = 1;
/// Descriptor minor version.
pub const VERSION_MINOR: u32 = 0;
/// Descriptor release name.
pub const VERSION_INFO: &str = "Copper";
/// Manufacturer reported to the host.
pub const MANUFACTURER: &str = "Microsoft";
/// Lifetime code asking the host to keep the module loaded.
pub const LIFETIME_LONG: u32 = 2;
/// User account code for the root account.
pub const USER_ACCOUNT_ROOT: u32 = 0;

/// Module descriptor, serialised with the host agent's `PascalCase` keys.
///
/// # Example
///
/// ```
/// use shim_config::Backend;
/// use shim_engine::MappingTable;
/// use shim_module::ModuleInfo;
///
/// let info = ModuleInfo::for_table(Backend::Chef, &MappingTable::builtin(Backend::Chef));
/// assert_eq!(info.name, "ChefInfra");
/// assert_eq!(info.components, vec![String::from("Users")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Major version.
    pub version_major: u32,
    /// Minor version.
    pub version_minor: u32,
    /// Release name.
    pub version_info: String,
    /// Components the module serves.
    pub components: Vec<String>,
    /// Host lifetime code.
    pub lifetime: u32,
    /// Host user account code.
    pub user_account: u32,
}

impl ModuleInfo {
    /// Describes a module serving `table` through `backend`.
    #[must_use]
    pub fn for_table(backend: Backend, table: &MappingTable) -> Self {
        let components: Vec<String> = table
            .components()
            .iter()
            .map(ToString::to_string)
            .collect();
        let description = format!(
            "Provides functionality to observe and configure {} through {}",
            components.join(" and "),
            backend.module_name(),
        );
        Self {
            name: backend.module_name().to_owned(),
            description,
            manufacturer: MANUFACTURER.to_owned(),
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            version_info: VERSION_INFO.to_owned(),
            components,
            lifetime: LIFETIME_LONG,
            user_account: USER_ACCOUNT_ROOT,
        }
    }
}
