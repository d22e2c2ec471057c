use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for element IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Stable identity of an element. Doubles as the CSS class of the element's
/// generated rules, so it must be unique within one template.
///
/// Internally a 4-byte `Spur` index, so comparison and hashing are O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern a string as an ElementId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a new ID with a kind prefix (e.g. `section-4`, `block-17`).
    ///
    /// Candidates that were already interned are skipped, so a minted ID
    /// never collides with an ID that arrived through imported JSON.
    pub fn fresh(prefix: &str) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        #[cfg(test)]
        FRESH_CALLS.with(|calls| calls.set(calls.get() + 1));
        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{prefix}-{n}");
            if INTERNER.get(&candidate).is_none() {
                return Self::intern(&candidate);
            }
        }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ElementId::intern(&s))
    }
}

// Per test thread, so parallel tests do not see each other's mints.
#[cfg(test)]
thread_local! {
    pub(crate) static FRESH_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Ephemeral list-rendering identity. Never serialized; a new key is
/// handed out on every construction, clone and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey(u64);

impl ElementKey {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ElementKey(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("hero_section");
        let b = ElementId::intern("hero_section");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hero_section");
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = ElementId::fresh("block");
        let b = ElementId::fresh("block");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("block-"));
    }

    #[test]
    fn fresh_skips_already_interned_candidates() {
        // Intern a long run of plausible candidates, then mint.
        let taken: Vec<ElementId> = (0..64)
            .map(|n| ElementId::intern(&format!("taken-{n}")))
            .collect();
        let minted = ElementId::fresh("taken");
        assert!(!taken.contains(&minted));
    }

    #[test]
    fn keys_are_distinct() {
        assert_ne!(ElementKey::next(), ElementKey::next());
    }
}
