use std::collections::HashSet;

/// The set of browser origins the gateway serves.
///
/// Built once at startup and shared read-only between request tasks.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowlist {
    origins: HashSet<String>,
}

impl OriginAllowlist {
    /// Build from configured entries. Surrounding whitespace is trimmed and
    /// blank entries are ignored, so `"a, b,"` yields `{a, b}`.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|o| o.as_ref().trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { origins }
    }

    /// Parse a comma-separated list such as the `ALLOWED_ORIGINS` variable.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Entries in sorted order, for logging and CORS configuration.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut origins: Vec<String> = self.origins.iter().cloned().collect();
        origins.sort();
        origins
    }
}
