use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// Global name interner
// ---------------------------------------------------------------------------

struct InternerInner {
    map: HashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

static GLOBAL_INTERNER: OnceLock<RwLock<InternerInner>> = OnceLock::new();

fn interner() -> &'static RwLock<InternerInner> {
    GLOBAL_INTERNER.get_or_init(|| {
        RwLock::new(InternerInner {
            map: HashMap::new(),
            strings: Vec::new(),
        })
    })
}

/// A compact, `Copy`-able handle to an interned identifier or type name.
///
/// Two `Name`s compare equal if and only if they refer to the same interned
/// string, so scope lookups and used-name checks never compare text.
/// Ordering, however, follows the text so that sorted output is stable
/// across runs.
///
/// The interned strings are leaked (`'static`) so `Name::as_str()` returns
/// `&'static str` without holding a borrow on the interner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(u32);

impl Name {
    /// Intern the given string, returning a `Name` handle.
    ///
    /// If the string was already interned, the existing handle is returned.
    pub fn intern(s: &str) -> Self {
        if let Some(name) = Self::get(s) {
            return name;
        }
        let mut inner = interner().write();
        // Double-check after acquiring write lock.
        if let Some(&name) = inner.map.get(s) {
            return name;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let name = Name(inner.strings.len() as u32);
        inner.strings.push(leaked);
        inner.map.insert(leaked, name);
        name
    }

    /// Look `s` up without interning it.
    ///
    /// A string that was never interned cannot be the text of any `Name`,
    /// which lets callers check candidate names without growing the table.
    pub fn get(s: &str) -> Option<Self> {
        interner().read().map.get(s).copied()
    }

    /// Resolve this name back to its string slice.
    #[inline]
    pub fn as_str(self) -> &'static str {
        let inner = interner().read();
        inner.strings[self.0 as usize]
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::intern(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::intern(&s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> String {
        name.as_str().to_owned()
    }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Name::intern(&text))
    }
}
