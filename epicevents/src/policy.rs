//! Role-command policy for dispatcher-level pre-filtering.
//!
//! [`COMMAND_ROLES`] is the single declarative list tying command names to
//! required-role sets. Commands build their [`crate::auth::Guard`] from it
//! via [`required_roles`], and the default [`RoleCommandPolicy`] table is
//! derived from it, so the dispatcher's fast-fail and the per-operation gate
//! cannot disagree. An operator can narrow the visible surface through the
//! `EPICEVENTS_ROLE_COMMANDS` environment variable (a JSON object mapping
//! role names to command-name lists); the gate still runs after the
//! pre-filter either way.
//!
//! The policy is built once at startup and passed into the dispatcher; there
//! is no module-level table.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::db::models::collaborators::Role;

/// Environment variable overriding the default policy table
pub const ROLE_COMMANDS_ENV: &str = "EPICEVENTS_ROLE_COMMANDS";

pub const GESTION: &[Role] = &[Role::Gestion];
pub const COMMERCIAL: &[Role] = &[Role::Commercial];
pub const SUPPORT: &[Role] = &[Role::Support];
/// Read-only union: every department plus the dedicated read-only role
pub const READ_ONLY: &[Role] = &[Role::Gestion, Role::Commercial, Role::Support, Role::Lecture];

/// Command name -> required-role set, one entry per protected command.
///
/// Names are hierarchical (dot-delimited); an entry covers every command it
/// prefixes, so "collaborateurs" covers the whole subtree.
pub const COMMAND_ROLES: &[(&str, &[Role])] = &[
    ("auth", READ_ONLY),
    ("clients.list", READ_ONLY),
    ("clients.show", READ_ONLY),
    ("clients.create", COMMERCIAL),
    ("clients.update", COMMERCIAL),
    ("contrats.list", READ_ONLY),
    ("contrats.create", GESTION),
    ("contrats.update", GESTION),
    ("contrats.update-mine", COMMERCIAL),
    ("evenements.list", READ_ONLY),
    ("evenements.create", COMMERCIAL),
    ("evenements.update", SUPPORT),
    ("evenements.assign-support", GESTION),
    ("collaborateurs", GESTION),
];

/// Required-role set for a command name, from the most specific matching
/// entry. Unknown commands get the empty set (deny-by-default).
pub fn required_roles(command: &str) -> &'static [Role] {
    COMMAND_ROLES
        .iter()
        .filter(|(entry, _)| entry_matches(entry, command))
        .max_by_key(|(entry, _)| segments(entry).count())
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

/// Mapping from role to the command-name prefixes it may invoke.
#[derive(Debug, Clone)]
pub struct RoleCommandPolicy {
    table: HashMap<Role, Vec<String>>,
}

impl RoleCommandPolicy {
    /// Default table derived from [`COMMAND_ROLES`]
    pub fn default_table() -> Self {
        let mut table: HashMap<Role, Vec<String>> = HashMap::new();
        for (command, roles) in COMMAND_ROLES {
            for role in *roles {
                table.entry(*role).or_default().push((*command).to_string());
            }
        }

        Self { table }
    }

    /// Parse an operator-supplied table, shaped like
    /// `{"gestion": ["clients", "contrats.update"], ...}`
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Table(HashMap<Role, Vec<String>>);

        let Table(table) = serde_json::from_str(raw)?;
        Ok(Self { table })
    }

    /// Table from `EPICEVENTS_ROLE_COMMANDS` when set and well-formed,
    /// otherwise the built-in default
    pub fn from_env() -> Self {
        match std::env::var(ROLE_COMMANDS_ENV) {
            Ok(raw) => match Self::from_json(&raw) {
                Ok(policy) => policy,
                Err(e) => {
                    warn!("Ignoring malformed {ROLE_COMMANDS_ENV}: {e}");
                    Self::default_table()
                }
            },
            Err(_) => Self::default_table(),
        }
    }

    /// Command-name prefixes the role may invoke; empty for unknown roles
    pub fn allowed_commands(&self, role: Role) -> &[String] {
        self.table.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `command` exactly matches or is hierarchically prefixed by
    /// one of the role's entries
    pub fn is_allowed(&self, role: Role, command: &str) -> bool {
        self.allowed_commands(role).iter().any(|entry| entry_matches(entry, command))
    }
}

/// Command names are dot- or space-delimited; an entry matches when its
/// segments are a prefix of the command's segments.
fn entry_matches(entry: &str, command: &str) -> bool {
    let entry: Vec<&str> = segments(entry).collect();
    let command: Vec<&str> = segments(command).collect();

    !entry.is_empty() && entry.len() <= command.len() && entry.iter().zip(&command).all(|(a, b)| a == b)
}

fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split(['.', ' ']).filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_agrees_with_command_roles() {
        let policy = RoleCommandPolicy::default_table();

        for (command, roles) in COMMAND_ROLES {
            for role in [Role::Gestion, Role::Commercial, Role::Support, Role::Lecture] {
                assert_eq!(
                    policy.is_allowed(role, command),
                    roles.contains(&role),
                    "policy and gate disagree on {command} for {role}"
                );
            }
        }
    }

    #[test]
    fn test_hierarchical_prefix_match() {
        let policy = RoleCommandPolicy::default_table();

        // "collaborateurs" covers the whole subtree for gestion only
        assert!(policy.is_allowed(Role::Gestion, "collaborateurs.create"));
        assert!(policy.is_allowed(Role::Gestion, "collaborateurs delete"));
        assert!(!policy.is_allowed(Role::Commercial, "collaborateurs.create"));

        // A leaf entry does not match a sibling
        assert!(policy.is_allowed(Role::Commercial, "contrats.update-mine"));
        assert!(!policy.is_allowed(Role::Commercial, "contrats.update"));
    }

    #[test]
    fn test_unknown_role_or_command_is_denied() {
        let policy = RoleCommandPolicy::from_json(r#"{"gestion": ["clients"]}"#).unwrap();

        // Roles absent from the table get the empty set
        assert!(policy.allowed_commands(Role::Support).is_empty());
        assert!(!policy.is_allowed(Role::Support, "clients.list"));

        // Commands absent from a role's entries are denied
        assert!(!policy.is_allowed(Role::Gestion, "contrats.create"));
        assert!(policy.is_allowed(Role::Gestion, "clients.update"));
    }

    #[test]
    fn test_required_roles_picks_most_specific_entry() {
        assert_eq!(required_roles("contrats.update"), GESTION);
        assert_eq!(required_roles("contrats.update-mine"), COMMERCIAL);
        assert_eq!(required_roles("collaborateurs.delete"), GESTION);
        assert_eq!(required_roles("no.such.command"), &[] as &[Role]);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(RoleCommandPolicy::from_json("not json").is_err());
        assert!(RoleCommandPolicy::from_json(r#"{"astronaut": ["clients"]}"#).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_override_and_fallback() {
        // SAFETY: guarded by serial_test, no other thread reads the variable
        unsafe {
            std::env::set_var(ROLE_COMMANDS_ENV, r#"{"support": ["evenements"]}"#);
        }
        let policy = RoleCommandPolicy::from_env();
        assert!(policy.is_allowed(Role::Support, "evenements.update"));
        assert!(!policy.is_allowed(Role::Gestion, "clients.list"));

        // Malformed values fall back to the default table
        unsafe {
            std::env::set_var(ROLE_COMMANDS_ENV, "{broken");
        }
        let policy = RoleCommandPolicy::from_env();
        assert!(policy.is_allowed(Role::Gestion, "collaborateurs.create"));

        unsafe {
            std::env::remove_var(ROLE_COMMANDS_ENV);
        }
    }
}
