//! Turns one raw input line into a handler invocation.
//!
//! Order of operations:
//! * trim; empty input is a no-op
//! * expand a leading special alias (`"`, `:`, `#`) into its command name
//! * reject characters outside the allow-list, unless the line carries credentials
//! * split on spaces and take the greedy longest command-name match
//! * echo the parsed line, check the disabled list, run the handler

use log::{debug, error};

use super::{CommandContext, INTERNAL_ERROR};
use crate::logutil::{escape_log, redact_command};
use crate::validation::is_allowed_command_text;

/// Commands whose arguments carry passwords or recovery codes.
pub const CREDENTIAL_COMMANDS: [&str; 4] = ["login", "register", "password", "recover"];

pub fn carries_credentials(first_word: &str) -> bool {
    CREDENTIAL_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(first_word))
}

/// Replace a leading special-alias character with `<command> `.
fn expand_special(ctx: &CommandContext<'_>, line: &str) -> String {
    let mut chars = line.chars();
    if let Some(first) = chars.next() {
        if let Some(spec) = ctx.registry.special(first) {
            return format!("{} {}", spec.name, chars.as_str());
        }
    }
    line.to_string()
}

fn echo_enabled(ctx: &CommandContext<'_>) -> bool {
    ctx.console
        .user()
        .and_then(|u| ctx.world.user(u))
        .map(|u| u.settings.echo)
        .unwrap_or(true)
}

/// Execute one input line. Returns whether a command ran and succeeded.
pub fn dispatch(ctx: &mut CommandContext<'_>, raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.len() > ctx.config.server.max_line_length {
        ctx.send(format!(
            "Input too long (maximum {} characters).",
            ctx.config.server.max_line_length
        ));
        return false;
    }

    let line = expand_special(ctx, trimmed);
    let first = line.split(' ').next().unwrap_or("");
    let secret = carries_credentials(first);
    if !secret && !is_allowed_command_text(&line) {
        ctx.send("Input contains unsupported characters.");
        return false;
    }

    let tokens: Vec<String> = line
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    let registry = ctx.registry;
    let Some((spec, consumed)) = registry.resolve(&tokens) else {
        debug!("Unknown command from {:?}: {}", ctx.console.user(), redact_command(&line));
        let suggestions = registry.suggestions(&tokens);
        if suggestions.is_empty() {
            ctx.send("Unknown command. Type 'help' for a list of commands.");
        } else {
            ctx.send(format!(
                "Unknown command. Did you mean: {}",
                suggestions.join(", ")
            ));
        }
        return false;
    };
    let args = &tokens[consumed..];

    if !secret && echo_enabled(ctx) {
        ctx.send(format!("> {}", tokens.join(" ")));
    }

    if ctx.config.world.is_disabled(spec.name) && !ctx.is_wizard() {
        ctx.send("Command disabled.");
        return false;
    }

    ctx.command = Some(spec);
    if secret {
        debug!("{:?} runs '{}'", ctx.console.user(), spec.name);
    } else {
        debug!(
            "{:?} runs '{}' {}",
            ctx.console.user(),
            spec.name,
            escape_log(&args.join(" "))
        );
    }

    let outcome = (spec.handler)(ctx, args);
    ctx.command = None;
    match outcome {
        Ok(ok) => ok,
        Err(e) => {
            error!("Command '{}' failed: {}", spec.name, e);
            ctx.send(INTERNAL_ERROR);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Registry;

    #[test]
    fn credential_commands_match_case_insensitively() {
        assert!(carries_credentials("LOGIN"));
        assert!(carries_credentials("recover"));
        assert!(!carries_credentials("say"));
    }

    #[test]
    fn special_aliases_map_to_social_commands() {
        let registry = Registry::standard();
        assert_eq!(registry.special('"').map(|s| s.name), Some("say"));
        assert_eq!(registry.special(':').map(|s| s.name), Some("action"));
        assert_eq!(registry.special('#').map(|s| s.name), Some("chat"));
        assert!(registry.special('!').is_none());
    }
}
