use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::FieldShape;

/// State of one named field group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Resolved(Arc<[FieldShape]>),
    /// Referenced before its declaration was extracted.
    Pending,
}

/// Field groups keyed by declared type name.
///
/// Each extraction run owns one cache; the shared base file has its own and
/// is consulted read-only when a resource's forward references are settled.
#[derive(Debug, Clone, Default)]
pub struct FieldCache {
    entries: BTreeMap<String, CacheEntry>,
    /// First line that referenced each pending name, for diagnostics.
    first_use: BTreeMap<String, usize>,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the extracted fields of a declaration, settling any pending reference.
    pub fn resolve(&mut self, name: &str, fields: &[FieldShape]) -> Arc<[FieldShape]> {
        let shared: Arc<[FieldShape]> = Arc::from(fields);
        self.entries
            .insert(name.to_string(), CacheEntry::Resolved(Arc::clone(&shared)));
        self.first_use.remove(name);
        shared
    }

    /// Notes a reference to `name`, returning the shared fields when they are already known.
    pub fn reference(&mut self, name: &str, line: usize) -> Option<Arc<[FieldShape]>> {
        match self.entries.get(name) {
            Some(CacheEntry::Resolved(fields)) => Some(Arc::clone(fields)),
            Some(CacheEntry::Pending) => None,
            None => {
                self.entries.insert(name.to_string(), CacheEntry::Pending);
                self.first_use.insert(name.to_string(), line);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Resolved fields for `name`, if any.
    pub fn fields(&self, name: &str) -> Option<Arc<[FieldShape]>> {
        match self.entries.get(name) {
            Some(CacheEntry::Resolved(fields)) => Some(Arc::clone(fields)),
            _ => None,
        }
    }

    /// Names still waiting for a declaration, with the line that first used them.
    pub fn pending(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, CacheEntry::Pending))
            .map(|(name, _)| {
                let line = self.first_use.get(name).copied().unwrap_or_default();
                (name.clone(), line)
            })
            .collect()
    }

    /// Settles package-qualified pending names (`alias.Name`) from the shared
    /// base cache, sharing rather than copying.
    ///
    /// ## Returns
    /// Returns the names that remain unresolved.
    pub fn resolve_pending(&mut self, fallback: Option<&FieldCache>) -> Vec<(String, usize)> {
        let mut unresolved = Vec::new();

        for (name, line) in self.pending() {
            let found = name
                .split_once('.')
                .and_then(|(_, plain)| fallback.and_then(|cache| cache.fields(plain)));
            match found {
                Some(fields) => {
                    self.entries.insert(name.clone(), CacheEntry::Resolved(fields));
                    self.first_use.remove(&name);
                }
                None => unresolved.push((name, line)),
            }
        }

        unresolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
