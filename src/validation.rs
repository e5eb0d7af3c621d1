//! Input validation for usernames, nicknames, entity names and command lines.

use std::collections::HashSet;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username must start with a letter")]
    LeadingNonLetter,

    #[error("Username is a reserved system name")]
    Reserved,
}

/// Errors for free-text fields (room, exit and item names, descriptions).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    #[error("Text cannot be empty")]
    Empty,

    #[error("Text is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Names cannot consist only of digits")]
    Numeric,
}

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    /// Extra names refused on top of the built-in list, e.g. the root account.
    pub reserved: Vec<String>,
}

impl UsernameRules {
    pub fn user(root_user: &str) -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 20,
            reserved: vec![root_user.to_ascii_lowercase()],
        }
    }
}

/// Get set of reserved usernames that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        // System/admin terms
        "admin", "administrator", "root", "system", "sysop", "operator", "wizard",
        "world", "guest", "anonymous", "nobody", "everyone",
        // Words that read as command targets
        "me", "self", "here", "room", "exit", "item", "none", "all",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username (or nickname) according to the given rules.
/// Returns the name as typed; callers lowercase it for use as a key.
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let len = username.chars().count();
    if len < rules.min_length {
        return Err(UsernameError::TooShort {
            min: rules.min_length,
        });
    }
    if len > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }

    let invalid: HashSet<char> = username
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(UsernameError::InvalidCharacters {
            chars: chars.into_iter().collect(),
        });
    }

    if !username
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        return Err(UsernameError::LeadingNonLetter);
    }

    let lower = username.to_ascii_lowercase();
    if reserved_names().contains(lower.as_str()) || rules.reserved.iter().any(|r| *r == lower) {
        return Err(UsernameError::Reserved);
    }

    Ok(username.to_string())
}

/// Validate a room, exit or item name.
pub fn validate_entity_name(name: &str, max_length: usize) -> Result<String, TextError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TextError::Empty);
    }
    if trimmed.chars().count() > max_length {
        return Err(TextError::TooLong { max: max_length });
    }
    // Numeric names would be ambiguous with ids.
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(TextError::Numeric);
    }
    Ok(trimmed.to_string())
}

/// Validate descriptive or action text. Empty text is allowed and clears the field.
pub fn validate_description(text: &str, max_length: usize) -> Result<String, TextError> {
    let trimmed = text.trim();
    if trimmed.chars().count() > max_length {
        return Err(TextError::TooLong { max: max_length });
    }
    Ok(trimmed.to_string())
}

/// Whether a command line uses only ASCII letters, digits, punctuation and spaces.
pub fn is_allowed_command_text(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation() || c == ' ')
}
