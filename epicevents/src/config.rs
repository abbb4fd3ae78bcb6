//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `EPICEVENTS_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `EPICEVENTS_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `EPICEVENTS_DATABASE__PATH=/var/lib/epicevents.db` sets the `database.path` field.
//!
//! Two `EPICEVENTS_`-prefixed variables are deliberately not config fields:
//! `EPICEVENTS_CONFIG` selects the config file itself, and `EPICEVENTS_ROLE_COMMANDS`
//! feeds the role-command policy table (see [`crate::policy`]).
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use epicevents::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Parse CLI arguments
//! let args = Args::parse();
//!
//! // Load configuration from file and environment
//! let config = Config::load(&args)?;
//!
//! println!("Database at {}", config.database.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override the database file
//! EPICEVENTS_DATABASE__PATH=/var/lib/epicevents/crm.db
//!
//! # Provide the signing secret (preferred over the YAML file)
//! EPICEVENTS_SECRET_KEY="long-random-string"
//!
//! # Override nested values
//! EPICEVENTS_AUTH__PASSWORD__MIN_LENGTH=12
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Simple CLI args - config file selection plus an optional one-shot command
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "EPICEVENTS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without running any command.
    /// Useful for catching config errors before deployment.
    #[arg(long)]
    pub validate: bool,

    /// Command to run (e.g. `clients list`). Starts the interactive shell when omitted.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database configuration (SQLite file)
    pub database: DatabaseConfig,
    /// Login for the initial management collaborator (created on first startup)
    pub admin_login: String,
    /// Password for the initial management collaborator. When unset, no
    /// bootstrap account is created.
    pub admin_password: Option<String>,
    /// Secret key for credential signing (required)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("epicevents.db"),
            create_if_missing: true,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Password validation rules
    pub password: PasswordConfig,
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            admin_login: "admin".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values.
            // EPICEVENTS_CONFIG and EPICEVENTS_ROLE_COMMANDS are consumed
            // elsewhere and are not Config fields, so skip them here.
            .merge(
                Env::prefixed("EPICEVENTS_")
                    .ignore(&["config", "role_commands"])
                    .split("__"),
            )
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Please set EPICEVENTS_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: database.path cannot be empty".to_string(),
            });
        }

        // Validate password requirements
        if self.auth.password.min_length > self.auth.password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    self.auth.password.min_length, self.auth.password.max_length
                ),
            });
        }

        if self.auth.password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        // Argon2 requires memory >= 8 * parallelism
        if self.auth.password.argon2_parallelism < 1
            || self.auth.password.argon2_iterations < 1
            || self.auth.password.argon2_memory_kib < 8 * self.auth.password.argon2_parallelism
        {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid argon2 parameters: memory_kib={}, iterations={}, parallelism={}",
                    self.auth.password.argon2_memory_kib,
                    self.auth.password.argon2_iterations,
                    self.auth.password.argon2_parallelism
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args_for(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
            command: vec![],
        }
    }

    #[test]
    fn test_load_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
admin_login: direction
admin_password: hunter2
database:
  path: crm.db
"#,
            )?;

            let config = Config::load(&args_for("test.yaml"))?;

            assert_eq!(config.secret_key.as_deref(), Some("hello"));
            assert_eq!(config.admin_login, "direction");
            assert_eq!(config.admin_password.as_deref(), Some("hunter2"));
            assert_eq!(config.database.path, PathBuf::from("crm.db"));
            // Defaults fill the rest
            assert_eq!(config.auth.password.min_length, 8);
            assert_eq!(config.auth.password.argon2_memory_kib, 19456);

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
database:
  path: from-yaml.db
"#,
            )?;

            jail.set_env("EPICEVENTS_DATABASE__PATH", "from-env.db");
            jail.set_env("EPICEVENTS_AUTH__PASSWORD__MIN_LENGTH", "12");

            let config = Config::load(&args_for("test.yaml"))?;

            // Env vars should override
            assert_eq!(config.database.path, PathBuf::from("from-env.db"));
            assert_eq!(config.auth.password.min_length, 12);

            Ok(())
        });
    }

    #[test]
    fn test_role_commands_env_is_not_a_config_field() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "secret_key: hello\n")?;

            // Consumed by the policy module, must not trip deny_unknown_fields
            jail.set_env("EPICEVENTS_ROLE_COMMANDS", r#"{"gestion": ["clients"]}"#);

            let config = Config::load(&args_for("test.yaml"))?;
            assert_eq!(config.secret_key.as_deref(), Some("hello"));

            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_key_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "admin_login: direction\n")?;

            let result = Config::load(&args_for("test.yaml"));
            assert!(result.is_err());

            Ok(())
        });
    }

    #[test]
    fn test_inconsistent_password_bounds_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
auth:
  password:
    min_length: 65
    max_length: 64
"#,
            )?;

            let result = Config::load(&args_for("test.yaml"));
            assert!(result.is_err());

            Ok(())
        });
    }
}
