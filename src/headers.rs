use crate::util::normalize_lower;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Ordered header multimap with case-insensitive names.
///
/// Names keep the spelling of their first insertion and iteration follows
/// first-insertion order; repeated values for one name stay grouped under it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderList {
    entries: IndexMap<String, HeaderEntry>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Adds a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = normalize_lower(&name);
        self.entries
            .entry(key)
            .or_insert_with(|| HeaderEntry {
                name,
                values: Vec::with_capacity(1),
            })
            .values
            .push(value.into());
    }

    /// Replaces every value stored for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = normalize_lower(&name);
        match self.entries.get_mut(&key) {
            Some(entry) => entry.values = vec![value.into()],
            None => {
                self.entries.insert(
                    key,
                    HeaderEntry {
                        name,
                        values: vec![value.into()],
                    },
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&normalize_lower(name))
            .map(|entry| entry.values.as_slice())
            .unwrap_or_default()
    }

    /// All values for `name` joined with `", "`, the way a combined field line reads.
    pub fn get_combined(&self, name: &str) -> Option<String> {
        let values = self.get_all(name);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_lower(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .shift_remove(&normalize_lower(name))
            .map(|entry| entry.values)
    }

    /// Keeps the names for which `keep` returns true.
    pub fn retain_names<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.entries.retain(|_, entry| keep(&entry.name));
    }

    /// Header names as first inserted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.name.as_str())
    }

    /// Every `(name, value)` pair, grouped by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().flat_map(|entry| {
            entry
                .values
                .iter()
                .map(move |value| (entry.name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderList
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderList::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl<N, V> Extend<(N, V)> for HeaderList
where
    N: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod headers_test;
