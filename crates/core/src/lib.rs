//! idlookup core library.
//!
//! Resolves organizational identifiers against a directory service and
//! writes paired name/email reports: configuration, directory clients
//! (native LDAP and external command), person extraction, the report writer,
//! and the batch runner.

pub mod config;
pub mod directory;
pub mod errors;
pub mod person;
pub mod report;
pub mod runner;

// Re-exports for convenience.
pub use config::LookupConfig;
pub use directory::{CommandDirectory, Credentials, DirectoryClient, DirectoryRecord, LdapDirectory};
pub use person::Person;
pub use report::ReportWriter;
pub use runner::{BatchRunner, BatchSummary, LookupOutcome};
