use crate::origin::SecurityOrigin;
use std::collections::HashSet;

/// Parsed `Timing-Allow-Origin` value of a cross-origin response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimingAllowOrigin {
    /// `*`: timing information may be shared with any origin.
    Any,
    /// Serialized origins that may receive timing information.
    List(Vec<String>),
}

impl TimingAllowOrigin {
    pub fn any() -> Self {
        Self::Any
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut deduped: Vec<String> = Vec::new();

        for value in values.into_iter() {
            let trimmed = value.into().trim().to_string();
            if trimmed.is_empty() {
                continue;
            }
            let key = trimmed.to_ascii_lowercase();
            if seen.insert(key) {
                deduped.push(trimmed);
            }
        }

        Self::List(deduped)
    }

    /// Entries may be separated by commas or whitespace; repeated header
    /// lines are merged.
    pub fn parse<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries: Vec<&str> = values
            .into_iter()
            .flat_map(|value| value.split(|c: char| c == ',' || c.is_ascii_whitespace()))
            .filter(|entry| !entry.is_empty())
            .collect();

        if entries.contains(&"*") {
            return Self::Any;
        }

        Self::list(entries)
    }

    pub fn allows(&self, origin: &SecurityOrigin) -> bool {
        match self {
            Self::Any => true,
            Self::List(values) => {
                let serialized = origin.serialize();
                values.iter().any(|value| *value == serialized)
            }
        }
    }
}

#[cfg(test)]
#[path = "timing_allow_origin_test.rs"]
mod timing_allow_origin_test;
