//! CPU architecture identifiers and sets.

/// Ordered, duplicate-free list of architecture names.
///
/// Order is insertion order so that flags passed to the compiler match what
/// the user asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchitectureSet(Vec<String>);

impl ArchitectureSet {
    /// Builds a set, dropping empty names and repeats.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            set.insert(name.into());
        }
        set
    }

    /// Adds `name` unless it is empty or already present.
    pub fn insert(&mut self, name: String) {
        let name = name.trim().to_string();
        if !name.is_empty() && !self.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Splits `self` into the names also in `supported` and the ones that are not.
    ///
    /// Both halves keep the order of `self`.
    pub fn partition(&self, supported: &ArchitectureSet) -> (ArchitectureSet, Vec<String>) {
        let (kept, dropped): (Vec<String>, Vec<String>) =
            self.0.iter().cloned().partition(|a| supported.contains(a));
        (ArchitectureSet(kept), dropped)
    }
}

impl std::fmt::Display for ArchitectureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
