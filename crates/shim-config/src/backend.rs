//! External configuration-management tool selection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Configuration-management tool that executes mapped objects.
///
/// The backend decides which mapping table is loaded and how invocations
/// are turned into command lines.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Backend {
    /// Ansible modules run ad hoc against `localhost`.
    #[default]
    Ansible,
    /// Chef Infra resources run through the bundled Ruby helper.
    Chef,
    /// cloud-init config modules run through the bundled Python helper.
    CloudInit,
}

impl Backend {
    /// Returns the module name reported in the host-facing descriptor.
    #[must_use]
    pub const fn module_name(self) -> &'static str {
        match self {
            Self::Ansible => "Ansible",
            Self::Chef => "ChefInfra",
            Self::CloudInit => "CloudInit",
        }
    }
}
