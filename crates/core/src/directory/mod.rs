//! Directory lookups.
//!
//! A [`DirectoryClient`] turns an identifier into a structured
//! [`DirectoryRecord`]. Two clients are provided:
//! - [`LdapDirectory`]: speaks LDAP directly via `ldap3`
//! - [`CommandDirectory`]: runs an external query tool and parses its
//!   `Name: value` text output

pub mod command;
pub mod ldap;
pub mod parser;

use std::collections::HashMap;
use std::fmt;

pub use command::CommandDirectory;
pub use ldap::LdapDirectory;

use crate::errors::LookupError;

/// Attribute values returned for one directory entry.
///
/// Attribute names are matched case-insensitively, as LDAP attribute types
/// are. Values keep the order in which the directory returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    attrs: HashMap<String, Vec<String>>,
}

impl DirectoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.attrs
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values of `name`, in directory order.
    pub fn get(&self, name: &str) -> &[String] {
        self.attrs
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first value of `name`, if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    /// Number of distinct attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Bind identity and password supplied by the operator.
#[derive(Clone)]
pub struct Credentials {
    pub bind_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(bind_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            bind_name: bind_name.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bind_name", &self.bind_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of directory records, one identifier at a time.
///
/// Lookups are awaited sequentially by the batch runner; implementations
/// may hold a connection open between calls.
#[allow(async_fn_in_trait)]
pub trait DirectoryClient {
    /// Fetch the entry for `identifier`.
    async fn lookup(&mut self, identifier: &str) -> Result<DirectoryRecord, LookupError>;

    /// Release any held connection. Called once after the batch.
    async fn close(&mut self) -> Result<(), LookupError> {
        Ok(())
    }
}
