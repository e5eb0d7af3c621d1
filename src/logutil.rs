//! Logging utilities for sanitizing user-typed strings so logs stay single-line.
//! Escapes control characters that otherwise break log readability.

use crate::commands::dispatch::carries_credentials;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///
/// Truncates very long strings with an ellipsis to cap log noise.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 200;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Replace everything after a credential-bearing command word so the line can be logged.
pub fn redact_command(line: &str) -> String {
    let first = line.split_whitespace().next().unwrap_or("");
    if carries_credentials(first) {
        format!("{} <redacted>", first)
    } else {
        escape_log(line)
    }
}

// Security events go to the dedicated `security` target so they can be split into their own file.
macro_rules! sec_log {
    ($($arg:tt)*) => { log::warn!(target: "security", $($arg)*); };
}
pub(crate) use sec_log;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newlines_and_truncates() {
        let s = "Line1\nLine2\r\tEnd";
        assert_eq!(escape_log(s), "Line1\\nLine2\\r\\tEnd");
        let long = "x".repeat(500);
        assert!(escape_log(&long).ends_with('…'));
    }

    #[test]
    fn redacts_credentials() {
        assert_eq!(redact_command("LOGIN ann hunter2"), "LOGIN <redacted>");
        assert_eq!(redact_command("say hi\nthere"), "say hi\\nthere");
        for command in crate::commands::dispatch::CREDENTIAL_COMMANDS {
            assert_eq!(
                redact_command(&format!("{} name secret", command)),
                format!("{} <redacted>", command)
            );
        }
    }
}
