//! External query command adapter.
//!
//! Renders a shell command template per identifier, runs it, and parses the
//! text it prints. Only exit status zero counts as success.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::parser::parse_attribute_text;
use super::{Credentials, DirectoryClient, DirectoryRecord};
use crate::config::{CommandConfig, DirectoryConfig};
use crate::errors::LookupError;

/// Runs the configured query tool through a shell.
#[derive(Debug, Clone)]
pub struct CommandDirectory {
    shell: String,
    template: String,
    directory: DirectoryConfig,
    credentials: Credentials,
}

impl CommandDirectory {
    pub fn new(command: &CommandConfig, directory: &DirectoryConfig, credentials: Credentials) -> Self {
        info!(shell = %command.shell, host = %directory.host, "created CommandDirectory");
        Self {
            shell: command.shell.clone(),
            template: command.template.clone(),
            directory: directory.clone(),
            credentials,
        }
    }

    /// The command line that would run for `identifier`.
    pub fn render(&self, identifier: &str) -> String {
        let bind_dn = self.directory.bind_dn(&self.credentials.bind_name);
        render_template(
            &self.template,
            &[
                ("password", self.credentials.password.as_str()),
                ("bind_dn", bind_dn.as_str()),
                ("bind_name", self.credentials.bind_name.as_str()),
                ("base", self.directory.search_base.as_str()),
                ("host", self.directory.host.as_str()),
                ("url", self.directory.url.as_str()),
                ("identifier", identifier),
            ],
        )
    }

    /// Run the command and return its exit status and combined output.
    async fn run(&self, identifier: &str) -> Result<(i32, String), LookupError> {
        // Send stderr into stdout so the captured text keeps its interleaving.
        let script = format!("exec 2>&1\n{}", self.render(identifier));

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let status = output.status.code().unwrap_or(-1);
        Ok((status, text.trim_end().to_string()))
    }
}

impl DirectoryClient for CommandDirectory {
    #[instrument(skip(self))]
    async fn lookup(&mut self, identifier: &str) -> Result<DirectoryRecord, LookupError> {
        let (status, output) = self.run(identifier).await?;
        if status != 0 {
            warn!(status, "query command failed");
            return Err(LookupError::CommandFailed { status, output });
        }
        debug!(bytes = output.len(), "query command succeeded");
        Ok(parse_attribute_text(&output))
    }
}

/// Substitute `{name}` placeholders, quoting each value for `sh`.
///
/// The quoting follows the template's own quoting at the placeholder: inside
/// `'...'` the value's single quotes are escaped, inside `"..."` the
/// characters special to double quotes are backslash-escaped, and a bare
/// placeholder is quoted as a whole unless it is made only of shell-safe
/// characters. Unknown placeholders are left as they are.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut quote = Quote::None;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '{' {
            let placeholder = template[i..].find('}').and_then(|end| {
                let key = &template[i + 1..i + end];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, value)| (end, *value))
            });
            if let Some((end, value)) = placeholder {
                out.push_str(&quote.escape(value));
                while chars.next_if(|(j, _)| *j <= i + end).is_some() {}
                continue;
            }
        }

        out.push(c);
        match (quote, c) {
            (Quote::None, '\\') | (Quote::Double, '\\') => {
                if let Some((_, next)) = chars.next() {
                    out.push(next);
                }
            }
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            _ => {}
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

impl Quote {
    fn escape(self, value: &str) -> String {
        match self {
            Quote::None => shell_quote(value),
            Quote::Single => value.replace('\'', r"'\''"),
            Quote::Double => {
                let mut escaped = String::with_capacity(value.len());
                for c in value.chars() {
                    if matches!(c, '"' | '\\' | '$' | '`') {
                        escaped.push('\\');
                    }
                    escaped.push(c);
                }
                escaped
            }
        }
    }
}

fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
