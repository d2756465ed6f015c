use opentelemetry::logs::AnyValue;
use opentelemetry::Key;

/// A key/value collection with an upper bound on the number of entries and on
/// the length of string values.
///
/// Keys are unique: putting an existing key overwrites its value in place.
/// Once the collection holds `max_entries` keys, further new keys are dropped
/// and counted. String values (including strings inside a list value) longer
/// than `max_value_length` characters are truncated; other value types are
/// stored as is.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedAttributes {
    entries: Vec<(Key, AnyValue)>,
    max_entries: usize,
    max_value_length: Option<usize>,
    total_added: usize,
    dropped: usize,
}

impl BoundedAttributes {
    /// Creates an empty collection holding at most `max_entries` keys, with
    /// string values limited to `max_value_length` characters (`None` for no
    /// limit).
    pub fn new(max_entries: usize, max_value_length: Option<usize>) -> Self {
        BoundedAttributes {
            entries: Vec::new(),
            max_entries,
            max_value_length,
            total_added: 0,
            dropped: 0,
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// An empty key is ignored and not counted. A new key arriving when the
    /// collection is full is dropped, but still counts towards
    /// [`total_added_values`](Self::total_added_values).
    pub fn put(&mut self, key: impl Into<Key>, value: impl Into<AnyValue>) {
        let key = key.into();
        if key.as_str().is_empty() {
            return;
        }
        self.total_added += 1;

        let value = self.apply_value_limit(value.into());
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return;
        }
        if self.entries.len() >= self.max_entries {
            self.dropped += 1;
            return;
        }
        self.entries.push((key, value));
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &Key) -> Option<&AnyValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of keys retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the retained entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &AnyValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// A frozen copy of the retained entries.
    pub fn to_vec(&self) -> Vec<(Key, AnyValue)> {
        self.entries.clone()
    }

    /// Number of `put` calls that were counted, including overwrites and
    /// dropped keys.
    pub fn total_added_values(&self) -> usize {
        self.total_added
    }

    /// Number of new keys rejected because the collection was full.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// The maximum number of keys this collection retains.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn apply_value_limit(&self, value: AnyValue) -> AnyValue {
        match self.max_value_length {
            Some(limit) => truncate_value(value, limit),
            None => value,
        }
    }
}

fn truncate_value(value: AnyValue, limit: usize) -> AnyValue {
    match value {
        AnyValue::String(s) => match truncate_str(s.as_str(), limit) {
            Some(truncated) => AnyValue::String(truncated.to_owned().into()),
            None => AnyValue::String(s),
        },
        AnyValue::ListAny(values) => AnyValue::ListAny(Box::new(
            (*values)
                .into_iter()
                .map(|v| match v {
                    AnyValue::String(_) => truncate_value(v, limit),
                    other => other,
                })
                .collect(),
        )),
        other => other,
    }
}

/// Returns the prefix of `s` holding `limit` characters, or `None` if `s` is
/// already short enough.
fn truncate_str(s: &str, limit: usize) -> Option<&str> {
    s.char_indices().nth(limit).map(|(idx, _)| &s[..idx])
}
