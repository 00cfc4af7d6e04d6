use std::collections::HashSet;

use ilopt_core::Name;

/// Hands out names that are not in its used set.
///
/// Every name it returns is added to the set, so the set only ever grows and
/// no name is handed out twice.
#[derive(Debug, Default, Clone)]
pub struct NameDispenser {
    used: HashSet<Name>,
}

impl NameDispenser {
    pub fn new(used: impl IntoIterator<Item = Name>) -> Self {
        Self {
            used: used.into_iter().collect(),
        }
    }

    pub fn is_used(&self, name: Name) -> bool {
        self.used.contains(&name)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Returns an unused name derived from `prefix` and records it as used.
    ///
    /// `prefix` itself is returned when it is free and carries no `_<digits>`
    /// suffix. Otherwise the suffix is stripped and `stem_1`, `stem_2`, ...
    /// are tried in order, which keeps repeated renaming from stacking
    /// suffixes (`a_1` yields `a_2`, never `a_1_1`).
    pub fn new_name(&mut self, prefix: &str) -> Name {
        let stem = strip_numeric_suffix(prefix);
        if stem.len() == prefix.len() && !prefix.is_empty() {
            let candidate = Name::intern(prefix);
            if !self.used.contains(&candidate) {
                self.used.insert(candidate);
                return candidate;
            }
        }
        let mut counter = 1usize;
        loop {
            let text = format!("{stem}_{counter}");
            // A string that was never interned cannot be in the used set.
            let taken = Name::get(&text).is_some_and(|name| self.used.contains(&name));
            if !taken {
                let name = Name::intern(&text);
                self.used.insert(name);
                return name;
            }
            counter += 1;
        }
    }
}

/// `a_12` -> `a`, `a_b` -> `a_b`, `_1` -> `_1`.
fn strip_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((stem, digits))
            if !stem.is_empty()
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => name,
    }
}
