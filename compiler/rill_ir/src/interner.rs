//! String interner backing [`Name`] handles.
//!
//! Provides O(1) interning and lookup. Interned strings are leaked into
//! `'static` storage; the interner lives for the whole compilation, so the
//! leak is bounded by the set of distinct identifiers in the program.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::raw()`.
    strings: Vec<&'static str>,
}

/// String interner for identifier and field names.
///
/// # Thread Safety
/// Uses an `RwLock` so a host that compiles distinct declarations on
/// different threads can share one interner.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        let empty: &'static str = "";
        map.insert(empty, 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its canonical [`Name`].
    ///
    /// Interning the same content twice returns the same handle.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&idx) = self.inner.read().map.get(s) {
            return Name::from_raw(idx);
        }

        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have won.
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).expect("interner overflow");
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Resolve a [`Name`] back to its string content.
    ///
    /// # Panics
    /// Panics if `name` was not produced by this interner.
    pub fn resolve(&self, name: Name) -> &'static str {
        self.inner.read().strings[name.raw() as usize]
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.inner.read().map.get(s).copied().map(Name::from_raw)
    }

    /// Number of interned strings (including the empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// True if only the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Compare two names by string content.
    ///
    /// Name ids are allocated in interning order, which is unrelated to
    /// lexicographic order; record field lists must be sorted with this.
    pub fn cmp_names(&self, a: Name, b: Name) -> std::cmp::Ordering {
        if a == b {
            return std::cmp::Ordering::Equal;
        }
        self.resolve(a).cmp(self.resolve(b))
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
