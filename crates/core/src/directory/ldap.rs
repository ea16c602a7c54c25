//! Native LDAP directory client.
//!
//! Connects and binds lazily on the first lookup and keeps the connection for
//! the rest of the batch. A connection or bind failure fails only the current
//! identifier; the next lookup tries to connect again.

use std::time::Duration;

use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use super::{Credentials, DirectoryClient, DirectoryRecord};
use crate::config::{AttributeNames, DirectoryConfig};
use crate::errors::LookupError;

/// LDAP client searching one base DN for one entry per identifier.
pub struct LdapDirectory {
    config: DirectoryConfig,
    attributes: AttributeNames,
    credentials: Credentials,
    ldap: Option<Ldap>,
}

impl LdapDirectory {
    /// Create a new client. This does not connect; the connection is
    /// established on the first lookup.
    pub fn new(config: &DirectoryConfig, attributes: &AttributeNames, credentials: Credentials) -> Self {
        info!(url = %config.url, base = %config.search_base, "created LdapDirectory");
        Self {
            config: config.clone(),
            attributes: attributes.clone(),
            credentials,
            ldap: None,
        }
    }

    /// Return whether a bound connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.ldap.is_some()
    }

    /// Search filter for `identifier`, with the identifier escaped.
    pub fn filter(&self, identifier: &str) -> String {
        self.config
            .filter_template
            .replace("{identifier}", &ldap_escape(identifier))
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    async fn connect(&self) -> Result<Ldap, LookupError> {
        let mut settings = LdapConnSettings::new();
        if let Some(timeout) = self.timeout() {
            settings = settings.set_conn_timeout(timeout);
        }

        debug!(url = %self.config.url, "connecting to LDAP server");
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection terminated");
            }
        });

        let bind_dn = self.config.bind_dn(&self.credentials.bind_name);
        debug!(%bind_dn, "binding");
        if let Some(timeout) = self.timeout() {
            ldap.with_timeout(timeout);
        }
        ldap.simple_bind(&bind_dn, &self.credentials.password)
            .await?
            .success()?;

        info!(url = %self.config.url, "LDAP bind succeeded");
        Ok(ldap)
    }

    async fn search(&mut self, identifier: &str) -> Result<Vec<SearchEntry>, LookupError> {
        if self.ldap.is_none() {
            self.ldap = Some(self.connect().await?);
        }
        let filter = self.filter(identifier);
        let base = self.config.search_base.clone();
        let attrs = self.attributes.all().to_vec();
        let timeout = self.timeout();

        let ldap = self
            .ldap
            .as_mut()
            .ok_or_else(|| LookupError::Ldap("no LDAP connection".into()))?;
        if let Some(timeout) = timeout {
            ldap.with_timeout(timeout);
        }
        let (entries, _result) = ldap
            .search(&base, Scope::Subtree, &filter, attrs)
            .await?
            .success()?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

impl DirectoryClient for LdapDirectory {
    #[instrument(skip(self))]
    async fn lookup(&mut self, identifier: &str) -> Result<DirectoryRecord, LookupError> {
        let entries = match self.search(identifier).await {
            Ok(entries) => entries,
            Err(e) => {
                // Drop the connection so the next identifier reconnects.
                self.ldap = None;
                return Err(e);
            }
        };

        if entries.len() > 1 {
            warn!(count = entries.len(), "multiple entries matched, using the first");
        }
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(identifier.to_string()))?;

        debug!(dn = %entry.dn, "found directory entry");
        Ok(DirectoryRecord::from(entry))
    }

    async fn close(&mut self) -> Result<(), LookupError> {
        if let Some(mut ldap) = self.ldap.take() {
            debug!("unbinding from LDAP server");
            ldap.unbind().await?;
        }
        Ok(())
    }
}

impl From<SearchEntry> for DirectoryRecord {
    fn from(entry: SearchEntry) -> Self {
        let mut record = DirectoryRecord::new();
        for (name, values) in entry.attrs {
            for value in values {
                record.insert(&name, value);
            }
        }
        for (name, values) in entry.bin_attrs {
            for value in values {
                record.insert(&name, String::from_utf8_lossy(&value).into_owned());
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn directory(url: &str) -> LdapDirectory {
        let config = DirectoryConfig {
            url: url.into(),
            timeout_secs: Some(2),
            ..DirectoryConfig::default()
        };
        LdapDirectory::new(
            &config,
            &AttributeNames::default(),
            Credentials::new("ABC123", "secret"),
        )
    }

    #[test]
    fn test_filter_escapes_identifier() {
        let dir = directory("ldap://localhost");
        assert_eq!(dir.filter("jdoe123"), "(uid=jdoe123)");
        assert_eq!(dir.filter("a*)(uid=*"), "(uid=a\\2a\\29\\28uid=\\2a)");
    }

    #[test]
    fn test_record_from_search_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("motFriendlyMail".to_string(), vec!["jdoe@example.com".to_string()]);
        attrs.insert("motDisplayLastName".to_string(), vec!["Doe".to_string()]);
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("motNickName".to_string(), vec![b"Johnny".to_vec()]);

        let record = DirectoryRecord::from(SearchEntry {
            dn: "motguid=XYZ789,ou=people".into(),
            attrs,
            bin_attrs,
        });

        assert_eq!(record.first("motfriendlymail"), Some("jdoe@example.com"));
        assert_eq!(record.first("motNickName"), Some("Johnny"));
        assert_eq!(record.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_lookup_and_stays_disconnected() {
        let mut dir = directory("ldap://127.0.0.1:1");
        assert!(!dir.is_connected());

        let err = dir.lookup("jdoe123").await.unwrap_err();
        assert!(matches!(err, LookupError::Ldap(_)));
        assert!(!dir.is_connected());

        dir.close().await.unwrap();
    }

    /// Server settings for the live test, from `IDLOOKUP_TEST_LDAP_*`.
    struct LiveServer {
        config: DirectoryConfig,
        credentials: Credentials,
        identifier: String,
    }

    fn live_server() -> Option<LiveServer> {
        let var = |name: &str| std::env::var(format!("IDLOOKUP_TEST_LDAP_{name}")).ok();
        let config = DirectoryConfig {
            url: var("URL")?,
            search_base: var("BASE")?,
            bind_dn_template: var("BIND_DN_TEMPLATE").unwrap_or_else(|| "{bind_name}".into()),
            filter_template: var("FILTER").unwrap_or_else(|| "(uid={identifier})".into()),
            timeout_secs: Some(5),
            ..DirectoryConfig::default()
        };
        Some(LiveServer {
            config,
            credentials: Credentials::new(var("BIND_NAME")?, var("PASSWORD")?),
            identifier: var("UID")?,
        })
    }

    /// Bind, search and build a record against a real server. Set
    /// `IDLOOKUP_TEST_LDAP_{URL,BASE,BIND_NAME,PASSWORD,UID}` to run it.
    #[tokio::test]
    async fn test_live_server_bind_and_search() {
        let Some(server) = live_server() else {
            eprintln!("SKIPPED: IDLOOKUP_TEST_LDAP_* not set");
            return;
        };
        let mut dir = LdapDirectory::new(&server.config, &AttributeNames::default(), server.credentials);

        let record = dir.lookup(&server.identifier).await.unwrap();
        assert!(dir.is_connected());
        assert!(!record.is_empty());

        // Second lookup reuses the bound connection.
        let err = dir.lookup("no-such-identifier-0000").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(_)));
        assert!(dir.is_connected());

        dir.close().await.unwrap();
        assert!(!dir.is_connected());
    }
}
