//! Fresh identifier generation.

use rustc_hash::{FxHashMap, FxHashSet};

/// Generates `<prefix><n>` names that never collide with a reserved name
/// or with each other.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    reserved: FxHashSet<String>,
    counters: FxHashMap<String, usize>,
}

impl NameGenerator {
    /// Generator avoiding `reserved`
    pub fn new(reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            reserved: reserved.into_iter().collect(),
            counters: FxHashMap::default(),
        }
    }

    /// Reserve one more name
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    /// True when `name` is taken
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Next free name with `prefix`
    pub fn generate(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let name = format!("{}{}", prefix, counter);
            *counter += 1;
            if self.reserved.insert(name.clone()) {
                return name;
            }
        }
    }
}
