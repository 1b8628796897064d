//! Built-in mapping tables, one per backend.

use shim_config::Backend;

use super::{Component, Direction, ExternalTarget, MappingEntry, MappingKey};
use crate::recipe::{ArgsRecipe, Recipe, ReshapeRecipe};

const ANSIBLE_BUILTIN: &str = "ansible.builtin";

/// Service managers reported by `service_facts` in the `source` field.
const SERVICE_SOURCES: [&str; 4] = ["systemd", "sysv", "upstart", "rcctl"];

pub(super) fn entries(backend: Backend) -> Vec<MappingEntry> {
    match backend {
        Backend::Ansible => ansible_entries(),
        Backend::Chef => vec![MappingEntry::new(
            MappingKey::new(Component::Users, "desiredUsers", Direction::Desired),
            ExternalTarget::new(Backend::Chef, "user", ""),
            Recipe::ToArgs(ArgsRecipe::ChefResource),
        )],
        Backend::CloudInit => vec![MappingEntry::new(
            MappingKey::new(Component::Users, "desiredUsers", Direction::Desired),
            ExternalTarget::new(Backend::CloudInit, "cloudinit.config", "cc_users_groups"),
            Recipe::ToArgs(ArgsRecipe::CloudInitConfig),
        )],
    }
}

fn ansible_entries() -> Vec<MappingEntry> {
    let mut entries: Vec<MappingEntry> = SERVICE_SOURCES
        .iter()
        .map(|source| {
            MappingEntry::new(
                MappingKey::new(Component::Service, *source, Direction::Reported),
                ExternalTarget::new(Backend::Ansible, ANSIBLE_BUILTIN, "service_facts"),
                Recipe::Reshape(ReshapeRecipe::RunningServices),
            )
        })
        .collect();

    entries.push(MappingEntry::new(
        MappingKey::new(Component::Service, "desiredServices", Direction::Desired),
        ExternalTarget::new(Backend::Ansible, ANSIBLE_BUILTIN, "service"),
        Recipe::ToArgs(ArgsRecipe::KeyValue),
    ));
    entries.push(MappingEntry::new(
        MappingKey::new(Component::Users, "users", Direction::Reported),
        ExternalTarget::new(Backend::Ansible, ANSIBLE_BUILTIN, "getent")
            .with_arguments("database=passwd"),
        Recipe::Reshape(ReshapeRecipe::PasswdUsers),
    ));
    entries.push(MappingEntry::new(
        MappingKey::new(Component::Users, "desiredUsers", Direction::Desired),
        ExternalTarget::new(Backend::Ansible, ANSIBLE_BUILTIN, "user"),
        Recipe::ToArgs(ArgsRecipe::KeyValue),
    ));
    entries
}
