//! Interactive prompts
//!
//! Line-based prompts used for confirmations and for editing item text.
//! The readers and writers are injectable so the behaviour can be tested
//! without a terminal.

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    confirm_with(prompt, &mut io::stdin().lock(), &mut io::stdout())
}

/// Prompt with the current value as default
///
/// Returns `None` if the user keeps the default (blank input). Anything
/// else is returned as typed, without the line ending.
pub fn prompt_with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    prompt_with_default_from(prompt, default, &mut io::stdin().lock(), &mut io::stdout())
}

fn confirm_with(prompt: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{} [y/N] ", prompt)?;
    out.flush()?;

    let answer = read_line(input)?.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn prompt_with_default_from(
    prompt: &str,
    default: &str,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Option<String>> {
    if default.is_empty() {
        write!(out, "{}: ", prompt)?;
    } else {
        write!(out, "{} [{}]: ", prompt, default)?;
    }
    out.flush()?;

    let line = read_line(input)?;
    if line.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

/// Read one line, dropping only the line ending
fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let content_len = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(content_len);
    Ok(line)
}
