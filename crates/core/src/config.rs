//! TOML-based configuration for idlookup.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration that queries the corporate people directory the same way
//! the legacy `ldapsearch` wrapper did. The bind password is never stored in
//! the file; [`DirectoryConfig::password_env`] may name an environment
//! variable holding it, otherwise the CLI prompts for it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LookupConfig {
    /// Directory server connection settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// External query command settings (used by the `command` backend).
    #[serde(default)]
    pub command: CommandConfig,

    /// Attribute names extracted from each directory entry.
    #[serde(default)]
    pub attributes: AttributeNames,

    /// Report file locations.
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Which [`DirectoryClient`](crate::directory::DirectoryClient) performs
/// the lookups.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native LDAP protocol client.
    #[default]
    Ldap,
    /// Shell out to an external query tool and parse its text output.
    Command,
}

/// Directory server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfig {
    /// Lookup backend.
    #[serde(default)]
    pub backend: Backend,

    /// LDAP URL used by the native backend.
    #[serde(default = "default_url")]
    pub url: String,

    /// Bare host name, substituted as `{host}` into the command template.
    #[serde(default = "default_host")]
    pub host: String,

    /// Search base DN.
    #[serde(default = "default_search_base")]
    pub search_base: String,

    /// Bind DN with a `{bind_name}` placeholder for the prompted identity.
    #[serde(default = "default_bind_dn_template")]
    pub bind_dn_template: String,

    /// Search filter with an `{identifier}` placeholder.
    #[serde(default = "default_filter_template")]
    pub filter_template: String,

    /// Environment variable holding the bind password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Connection timeout in seconds for the native backend. Unset means
    /// wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_url() -> String {
    "ldap://ids.mot-solutions.com".into()
}
fn default_host() -> String {
    "ids.mot-solutions.com".into()
}
fn default_search_base() -> String {
    "ou=people,ou=intranet,dc=motorola,dc=com".into()
}
fn default_bind_dn_template() -> String {
    "motguid={bind_name},ou=people,ou=intranet,dc=motorola,dc=com".into()
}
fn default_filter_template() -> String {
    "(uid={identifier})".into()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: default_url(),
            host: default_host(),
            search_base: default_search_base(),
            bind_dn_template: default_bind_dn_template(),
            filter_template: default_filter_template(),
            password_env: None,
            timeout_secs: None,
        }
    }
}

impl DirectoryConfig {
    /// Expand the bind DN template for the given bind identity.
    pub fn bind_dn(&self, bind_name: &str) -> String {
        self.bind_dn_template.replace("{bind_name}", bind_name)
    }

    /// Read the bind password from [`password_env`](Self::password_env), if
    /// configured and set to a non-empty value.
    pub fn resolve_password_env(&self) -> Option<String> {
        let env_name = self.password_env.as_deref()?;
        match std::env::var(env_name) {
            Ok(val) if !val.is_empty() => {
                debug!(env_name, "resolved bind password from env var");
                Some(val)
            }
            Ok(_) => {
                warn!(env_name, "env var is set but empty");
                None
            }
            Err(_) => {
                warn!(env_name, "env var not set");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// External command
// ---------------------------------------------------------------------------

/// Settings for the `command` backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandConfig {
    /// Shell command template. Placeholders: `{password}`, `{bind_dn}`,
    /// `{bind_name}`, `{base}`, `{host}`, `{url}`, `{identifier}`.
    #[serde(default = "default_command_template")]
    pub template: String,

    /// Shell used to run the rendered command (invoked as `<shell> -c`).
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_command_template() -> String {
    "ldapsearch -w '{password}' -D '{bind_dn}' -b '{base}' -h '{host}' -x uid={identifier}".into()
}
fn default_shell() -> String {
    "sh".into()
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            template: default_command_template(),
            shell: default_shell(),
        }
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Names of the directory attributes that make up a resolved person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeNames {
    #[serde(default = "default_mail_attr")]
    pub mail: String,

    /// Preferred first name; used instead of `first_name` when present.
    #[serde(default = "default_nickname_attr")]
    pub nickname: String,

    #[serde(default = "default_first_name_attr")]
    pub first_name: String,

    #[serde(default = "default_last_name_attr")]
    pub last_name: String,
}

fn default_mail_attr() -> String {
    "motFriendlyMail".into()
}
fn default_nickname_attr() -> String {
    "motNickName".into()
}
fn default_first_name_attr() -> String {
    "motDisplayFirstName".into()
}
fn default_last_name_attr() -> String {
    "motDisplayLastName".into()
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            mail: default_mail_attr(),
            nickname: default_nickname_attr(),
            first_name: default_first_name_attr(),
            last_name: default_last_name_attr(),
        }
    }
}

impl AttributeNames {
    /// All attribute names, in the order requested from the directory.
    pub fn all(&self) -> [&str; 4] {
        [
            self.mail.as_str(),
            self.nickname.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Report file locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_names_file")]
    pub names_file: PathBuf,

    #[serde(default = "default_emails_file")]
    pub emails_file: PathBuf,
}

fn default_names_file() -> PathBuf {
    PathBuf::from("names.tmp")
}
fn default_emails_file() -> PathBuf {
    PathBuf::from("emails.tmp")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            names_file: default_names_file(),
            emails_file: default_emails_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl LookupConfig {
    /// Load a [`LookupConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: LookupConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate that templates and paths are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.directory.backend {
            Backend::Ldap => {
                if self.directory.url.is_empty() {
                    return Err(invalid("directory.url", "LDAP URL must not be empty"));
                }
                if !self.directory.filter_template.contains("{identifier}") {
                    return Err(invalid(
                        "directory.filter_template",
                        "filter must contain the {identifier} placeholder",
                    ));
                }
            }
            Backend::Command => {
                if self.command.template.trim().is_empty() {
                    return Err(invalid("command.template", "command template must not be empty"));
                }
                if !self.command.template.contains("{identifier}") {
                    return Err(invalid(
                        "command.template",
                        "command template must contain the {identifier} placeholder",
                    ));
                }
                if self.command.shell.is_empty() {
                    return Err(invalid("command.shell", "shell must not be empty"));
                }
            }
        }

        if self.directory.timeout_secs == Some(0) {
            return Err(invalid("directory.timeout_secs", "timeout must be > 0"));
        }

        for (field, value) in [
            ("attributes.mail", &self.attributes.mail),
            ("attributes.nickname", &self.attributes.nickname),
            ("attributes.first_name", &self.attributes.first_name),
            ("attributes.last_name", &self.attributes.last_name),
        ] {
            if value.is_empty() {
                return Err(invalid(field, "attribute name must not be empty"));
            }
        }

        if self.output.names_file.as_os_str().is_empty() {
            return Err(invalid("output.names_file", "path must not be empty"));
        }
        if self.output.emails_file.as_os_str().is_empty() {
            return Err(invalid("output.emails_file", "path must not be empty"));
        }
        if self.output.names_file == self.output.emails_file {
            return Err(invalid(
                "output.emails_file",
                "names and emails must go to different files",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[directory]
backend = "command"
url = "ldaps://ldap.example.com"
host = "ldap.example.com"
search_base = "ou=people,dc=example,dc=com"
bind_dn_template = "uid={bind_name},ou=people,dc=example,dc=com"
password_env = "IDLOOKUP_PW"
timeout_secs = 10

[command]
template = "ldapsearch -x -H '{url}' -b '{base}' uid={identifier}"

[attributes]
mail = "mail"
nickname = "displayName"
first_name = "givenName"
last_name = "sn"

[output]
names_file = "out/names.txt"
emails_file = "out/emails.txt"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: LookupConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.directory.backend, Backend::Command);
        assert_eq!(config.directory.timeout_secs, Some(10));
        assert_eq!(config.attributes.last_name, "sn");
        assert_eq!(config.command.shell, "sh");
        assert_eq!(config.output.emails_file, PathBuf::from("out/emails.txt"));
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = LookupConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.directory.host, "ldap.example.com");
    }

    #[test]
    fn test_file_not_found() {
        let result = LookupConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));

        let config = LookupConfig::load_or_default("/nonexistent/config.toml").unwrap();
        assert_eq!(config, LookupConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[directory\nbackend = ").unwrap();
        let result = LookupConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_defaults() {
        let config: LookupConfig = toml::from_str("").unwrap();
        assert_eq!(config.directory.backend, Backend::Ldap);
        assert_eq!(
            config.directory.search_base,
            "ou=people,ou=intranet,dc=motorola,dc=com"
        );
        assert_eq!(config.attributes.mail, "motFriendlyMail");
        assert_eq!(config.attributes.nickname, "motNickName");
        assert_eq!(config.output.names_file, PathBuf::from("names.tmp"));
        assert_eq!(config.output.emails_file, PathBuf::from("emails.tmp"));
        assert!(config.command.template.starts_with("ldapsearch -w '{password}'"));
        config.validate().unwrap();
    }

    #[test]
    fn test_bind_dn_expansion() {
        let config = DirectoryConfig::default();
        assert_eq!(
            config.bind_dn("ABC123"),
            "motguid=ABC123,ou=people,ou=intranet,dc=motorola,dc=com"
        );
    }

    #[test]
    fn test_validate_rejects_template_without_identifier() {
        let mut config = LookupConfig::default();
        config.directory.backend = Backend::Command;
        config.command.template = "ldapsearch -x".into();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "command.template"
        ));
    }

    #[test]
    fn test_validate_rejects_same_output_files() {
        let mut config = LookupConfig::default();
        config.output.emails_file = config.output.names_file.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "output.emails_file"
        ));
    }

    #[test]
    fn test_resolve_password_env() {
        std::env::set_var("IDLOOKUP_TEST_PW", "s3cret");
        let mut config = DirectoryConfig::default();
        assert_eq!(config.resolve_password_env(), None);

        config.password_env = Some("IDLOOKUP_TEST_PW".into());
        assert_eq!(config.resolve_password_env().as_deref(), Some("s3cret"));

        config.password_env = Some("IDLOOKUP_TEST_PW_UNSET".into());
        assert_eq!(config.resolve_password_env(), None);

        std::env::remove_var("IDLOOKUP_TEST_PW");
    }

    #[test]
    fn test_serialize_roundtrips_defaults() {
        let text = toml::to_string_pretty(&LookupConfig::default()).unwrap();
        let parsed: LookupConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, LookupConfig::default());
    }
}
