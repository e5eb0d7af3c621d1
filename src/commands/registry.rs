//! Static command table.
//!
//! Every handler module contributes its [`CommandSpec`]s through a `commands()`
//! function; [`Registry::standard`] collects them once at startup and warns
//! about names that shadow one another.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};

use super::CommandContext;
use crate::world::WorldError;

/// `Ok(true)` success, `Ok(false)` a failure already reported to the user,
/// `Err` a hard error the dispatcher logs and reports as internal.
pub type Handler = fn(&mut CommandContext<'_>, &[String]) -> Result<bool, WorldError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Account,
    Settings,
    Info,
    Movement,
    Building,
    Ownership,
    Locking,
    Items,
    Social,
    Wizard,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Account,
        Category::Settings,
        Category::Info,
        Category::Movement,
        Category::Building,
        Category::Ownership,
        Category::Locking,
        Category::Items,
        Category::Social,
        Category::Wizard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Account => "account",
            Category::Settings => "settings",
            Category::Info => "info",
            Category::Movement => "movement",
            Category::Building => "building",
            Category::Ownership => "ownership",
            Category::Locking => "locking",
            Category::Items => "items",
            Category::Social => "social",
            Category::Wizard => "wizard",
        }
    }
}

#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Canonical, lowercase, possibly multi-word.
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Single leading character that expands to this command's name.
    pub special: Option<char>,
    pub usage: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub handler: Handler,
}

impl CommandSpec {
    pub const fn new(name: &'static str, category: Category, handler: Handler) -> Self {
        Self {
            name,
            aliases: &[],
            special: None,
            usage: name,
            description: "",
            category,
            handler,
        }
    }

    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub const fn special(mut self, c: char) -> Self {
        self.special = Some(c);
        self
    }

    pub const fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("special", &self.special)
            .field("category", &self.category)
            .finish()
    }
}

pub struct Registry {
    commands: Vec<CommandSpec>,
    by_name: HashMap<String, usize>,
    by_special: HashMap<char, usize>,
}

impl Registry {
    pub fn new(commands: Vec<CommandSpec>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_special = HashMap::new();
        for (idx, spec) in commands.iter().enumerate() {
            for name in spec.names() {
                if let Some(prev) = by_name.insert(name.to_ascii_lowercase(), idx) {
                    warn!(
                        "Command name '{}' registered twice ({} and {})",
                        name, commands[prev].name, spec.name
                    );
                }
            }
            if let Some(c) = spec.special {
                if by_special.insert(c, idx).is_some() {
                    warn!("Special alias '{}' registered twice", c);
                }
            }
        }
        let registry = Self {
            commands,
            by_name,
            by_special,
        };
        for (short, long) in registry.prefix_collisions() {
            warn!(
                "Command '{}' is a word-prefix of '{}' and shadows it for shorter input",
                short, long
            );
        }
        debug!("Registered {} commands", registry.commands.len());
        registry
    }

    /// The full built-in command table.
    pub fn standard() -> Self {
        Self::new(super::handlers::all())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Exact, case-insensitive lookup of a name or alias.
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        let key = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        self.by_name.get(&key).map(|idx| &self.commands[*idx])
    }

    pub fn special(&self, c: char) -> Option<&CommandSpec> {
        self.by_special.get(&c).map(|idx| &self.commands[*idx])
    }

    /// Greedy longest match: the most leading tokens that form a command name.
    /// Returns the command and how many tokens its name consumed.
    pub fn resolve(&self, tokens: &[String]) -> Option<(&CommandSpec, usize)> {
        (1..=tokens.len())
            .rev()
            .find_map(|n| self.lookup(&tokens[..n].join(" ")).map(|spec| (spec, n)))
    }

    /// Command names that extend the longest leading run of `tokens` that
    /// begins any name. Used to suggest completions for unknown input.
    pub fn suggestions(&self, tokens: &[String]) -> Vec<&'static str> {
        for n in (1..=tokens.len()).rev() {
            let attempt = tokens[..n].join(" ").to_ascii_lowercase();
            let mut found: Vec<&'static str> = self
                .commands
                .iter()
                .flat_map(|c| c.names())
                .filter(|name| name.starts_with(attempt.as_str()))
                .collect();
            if !found.is_empty() {
                found.sort_unstable();
                found.dedup();
                return found;
            }
        }
        Vec::new()
    }

    /// Pairs (short, long) where `short` is a strict word-prefix of `long`
    /// and the two names do not belong to the same command.
    pub fn prefix_collisions(&self) -> Vec<(String, String)> {
        let names: Vec<(&'static str, usize)> = self
            .commands
            .iter()
            .enumerate()
            .flat_map(|(idx, c)| c.names().map(move |n| (n, idx)))
            .collect();
        let mut out = Vec::new();
        for (short, a) in &names {
            let short_words: Vec<String> = short
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect();
            for (long, b) in &names {
                if a == b {
                    continue;
                }
                let long_words: Vec<String> = long
                    .split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect();
                if long_words.len() > short_words.len()
                    && long_words[..short_words.len()] == short_words[..]
                {
                    out.push((short.to_string(), long.to_string()));
                }
            }
        }
        out
    }
}
