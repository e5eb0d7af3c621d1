//! Free-text name resolution for exits and items.
//!
//! ## Search order
//! 1. Exact name (case-insensitive, whitespace-normalized). Hidden entries match here only.
//! 2. Unique prefix of a visible entry's name.
//! 3. Unique substring of a visible entry's name.
//!
//! Several matches within the first tier that has any produce
//! [`ResolveResult::Ambiguous`] so the caller can list the candidates.

/// One addressable entry: an item id or an exit index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    /// "inventory", "room" or "exit", shown in disambiguation lists.
    pub location: &'static str,
    pub hidden: bool,
}

impl Candidate {
    pub fn new(id: u64, name: &str, location: &'static str, hidden: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            location,
            hidden,
        }
    }

    /// Format for display in disambiguation list
    pub fn format_for_display(&self, index: usize) -> String {
        format!("{}) {} [#{}] ({})", index, self.name, self.id, self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    Found(Candidate),
    Ambiguous(Vec<Candidate>),
    NotFound,
}

/// Lowercase, trim and collapse internal whitespace.
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn settle(mut matches: Vec<Candidate>) -> Option<ResolveResult> {
    match matches.len() {
        0 => None,
        1 => matches.pop().map(ResolveResult::Found),
        _ => Some(ResolveResult::Ambiguous(matches)),
    }
}

pub fn resolve_name(query: &str, candidates: &[Candidate]) -> ResolveResult {
    let query = normalize_name(query);
    if query.is_empty() {
        return ResolveResult::NotFound;
    }
    let normalized: Vec<(String, &Candidate)> = candidates
        .iter()
        .map(|c| (normalize_name(&c.name), c))
        .collect();

    let exact = normalized
        .iter()
        .filter(|(n, _)| *n == query)
        .map(|(_, c)| (*c).clone())
        .collect();
    if let Some(result) = settle(exact) {
        return result;
    }

    let prefix = normalized
        .iter()
        .filter(|(n, c)| !c.hidden && n.starts_with(&query))
        .map(|(_, c)| (*c).clone())
        .collect();
    if let Some(result) = settle(prefix) {
        return result;
    }

    let substring = normalized
        .iter()
        .filter(|(n, c)| !c.hidden && n.contains(&query))
        .map(|(_, c)| (*c).clone())
        .collect();
    settle(substring).unwrap_or(ResolveResult::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<Candidate> {
        vec![
            Candidate::new(1, "Brass Key", "inventory", false),
            Candidate::new(2, "Brass Lamp", "room", false),
            Candidate::new(3, "Secret  Letter", "room", true),
            Candidate::new(4, "Iron Key", "room", false),
        ]
    }

    #[test]
    fn exact_beats_prefix() {
        let found = resolve_name("brass key", &items());
        assert!(matches!(found, ResolveResult::Found(c) if c.id == 1));
    }

    #[test]
    fn ambiguous_prefix_lists_candidates() {
        match resolve_name("brass", &items()) {
            ResolveResult::Ambiguous(list) => {
                let ids: Vec<u64> = list.iter().map(|c| c.id).collect();
                assert_eq!(ids, vec![1, 2]);
                assert_eq!(list[0].format_for_display(1), "1) Brass Key [#1] (inventory)");
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn unique_substring_resolves() {
        assert!(matches!(resolve_name("iron", &items()), ResolveResult::Found(c) if c.id == 4));
        assert!(matches!(resolve_name("lamp", &items()), ResolveResult::Found(c) if c.id == 2));
    }

    #[test]
    fn hidden_entries_need_exact_name() {
        assert_eq!(resolve_name("secret", &items()), ResolveResult::NotFound);
        assert!(matches!(
            resolve_name("SECRET LETTER", &items()),
            ResolveResult::Found(c) if c.id == 3
        ));
    }
}
