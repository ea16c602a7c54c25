//! Credential prompts.
//!
//! On a terminal the prompts go through `dialoguer` and the password is not
//! echoed. When stdin is piped, one line is read for each answer, so the
//! tool can run from scripts. Either way the prompts are written to stdout.

use std::io::{BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use console::Term;
use dialoguer::{Input, Password};

use idlookup_core::directory::Credentials;

/// Collect the bind name and password, prompting only for values not
/// already supplied.
pub fn read_credentials(bind_name: Option<String>, password: Option<String>) -> Result<Credentials> {
    let interactive = std::io::stdin().is_terminal();
    let term = prompt_term();
    let mut stdout = std::io::stdout();

    let bind_name = match bind_name {
        Some(name) => name,
        None if interactive => Input::<String>::new()
            .with_prompt("bind name")
            .interact_text_on(&term)
            .context("failed to read bind name")?
            .trim_end()
            .to_string(),
        None => read_answer("bind name: ", &mut std::io::stdin().lock(), &mut stdout)?,
    };

    let password = match password {
        Some(password) => password,
        None if interactive => Password::new()
            .with_prompt("password")
            .allow_empty_password(true)
            .interact_on(&term)
            .context("failed to read password")?
            .trim_end()
            .to_string(),
        None => read_answer("password: ", &mut std::io::stdin().lock(), &mut stdout)?,
    };

    Ok(Credentials::new(bind_name, password))
}

/// Terminal the interactive prompts are drawn on.
fn prompt_term() -> Term {
    Term::stdout()
}

/// Write `prompt`, then read one line from `input` with trailing whitespace
/// removed.
fn read_answer<R: BufRead, W: Write>(prompt: &str, input: &mut R, out: &mut W) -> Result<String> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .with_context(|| format!("failed to read answer to '{}'", prompt.trim_end()))?;
    if read == 0 {
        bail!("standard input closed before answering '{}'", prompt.trim_end());
    }
    Ok(line.trim_end().to_string())
}
