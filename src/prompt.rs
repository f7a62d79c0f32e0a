use std::io::{self, BufRead, Write};

use anyhow::Result;

/// Interprets a confirmation answer. Blank input returns the default; only an
/// explicit opposite-of-default token flips the result, any other non-blank
/// input collapses to the default.
pub fn is_yes(answer: &str, default: bool) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return default;
    }
    if default {
        !(answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no") || answer == "否")
    } else {
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") || answer == "是"
    }
}

pub fn confirm(input: &mut impl BufRead, message: &str, default: bool) -> Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    print_prompt(&format!("{message} ({hint}) "))?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(is_yes(&line, default))
}

pub fn confirm_with<T>(
    input: &mut impl BufRead,
    message: &str,
    default: bool,
    callback: impl FnOnce(bool) -> T,
) -> Result<T> {
    Ok(callback(confirm(input, message, default)?))
}

pub fn confirm_branch<T>(
    input: &mut impl BufRead,
    message: &str,
    default: bool,
    yes: impl FnOnce() -> T,
    no: impl FnOnce() -> T,
) -> Result<T> {
    if confirm(input, message, default)? {
        Ok(yes())
    } else {
        Ok(no())
    }
}

/// Reads work items line by line; a blank line (or end of input) ends the list.
pub fn read_items(input: &mut impl BufRead) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            break;
        }
        items.push(trimmed.to_string());
    }
    Ok(items)
}

pub fn print_prompt(message: &str) -> Result<()> {
    print!("{message}");
    io::stdout().flush()?;
    Ok(())
}
