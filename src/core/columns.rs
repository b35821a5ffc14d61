//! Column name normalization and the row annotation model
//!
//! Spreadsheet headers arrive as `Phone Number`, `phone_number`,
//! `PHONE-NUMBER` and so on. Every lookup in this crate goes through
//! [`normalize`], which lowercases a name and drops spaces, underscores and
//! hyphens, so all of those spellings land on the same [`NormalizedKey`].
//!
//! # Components
//!
//! - [`NormalizedKey`] / [`normalize`] - canonical column names (memoized)
//! - [`Columns`] - an ordered map whose every lookup is normalized first
//! - [`Cell`] - one annotated value: raw data, validation error, ignore flag
//! - [`Row`] - the cells of one CSV row plus row-level flags

use crate::core::cache::{memoize, BoundedCache};
use crate::core::template::Template;
use crate::types::RecipientError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

/// Headers repeat on every row, so a small cache covers a whole file
const KEY_CACHE_CAPACITY: usize = 256;

static KEY_CACHE: Lazy<Mutex<BoundedCache<String, NormalizedKey>>> =
    Lazy::new(|| Mutex::new(BoundedCache::new(KEY_CACHE_CAPACITY)));

/// A column or placeholder name in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a column name: lowercase, with spaces, underscores and hyphens removed
///
/// Idempotent: normalizing a [`NormalizedKey`]'s text gives the same key back.
pub fn normalize(key: &str) -> NormalizedKey {
    memoize(&KEY_CACHE, key, || {
        NormalizedKey(
            key.chars()
                .filter(|c| !matches!(c, ' ' | '_' | '-'))
                .flat_map(char::to_lowercase)
                .collect(),
        )
    })
}

/// Normalize a name that may be absent
///
/// An absent name stays `None`, which is distinct from the normalized empty
/// string.
pub fn normalize_optional(key: Option<&str>) -> Option<NormalizedKey> {
    key.map(normalize)
}

/// Ordered map keyed by normalized column names
///
/// Built once from `(name, value)` pairs. When two names normalize to the
/// same key the later value wins, keeping the position and spelling of the
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns<V> {
    order: Vec<NormalizedKey>,
    names: HashMap<NormalizedKey, String>,
    values: HashMap<NormalizedKey, V>,
}

impl<V> Columns<V> {
    pub fn new() -> Self {
        Columns {
            order: Vec::new(),
            names: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Build from `(name, value)` pairs, normalizing every name
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let mut columns = Columns::new();
        for (key, value) in pairs {
            let name = key.as_ref();
            columns.insert_named(name, normalize(name), value);
        }
        columns
    }

    pub(crate) fn insert(&mut self, key: NormalizedKey, value: V) {
        let name = key.as_str().to_string();
        self.insert_named(&name, key, value);
    }

    /// Insert under `key`, remembering `name` as written if the key is new
    pub(crate) fn insert_named(&mut self, name: &str, key: NormalizedKey, value: V) {
        if self.values.insert(key.clone(), value).is_none() {
            self.names.insert(key.clone(), name.to_string());
            self.order.push(key);
        }
    }

    /// The spelling `key` was first inserted with
    pub fn name(&self, key: &NormalizedKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(&normalize(key))
    }

    pub fn get_key(&self, key: &NormalizedKey) -> Option<&V> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.order.iter()
    }

    /// Entries in the order their names were first seen
    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedKey, &V)> {
        self.order
            .iter()
            .filter_map(move |key| self.values.get(key).map(|value| (key, value)))
    }

    /// Keep only the entries whose key satisfies `keep`
    pub fn filter<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&NormalizedKey) -> bool,
    {
        let Columns {
            order,
            mut names,
            mut values,
        } = self;
        let mut filtered = Columns::new();
        for key in order {
            if keep(&key) {
                if let Some(value) = values.remove(&key) {
                    let name = names.remove(&key).unwrap_or_else(|| key.to_string());
                    filtered.insert_named(&name, key, value);
                }
            }
        }
        filtered
    }

    /// Look up each of `keys`, pairing the caller's original spelling with the value
    pub fn with_keys<'a, I>(&'a self, keys: I) -> Vec<(&'a str, Option<&'a V>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().map(|key| (key, self.get(key))).collect()
    }
}

impl Columns<String> {
    /// Map each name to itself, so the original spelling is kept as the value
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Columns::from_pairs(keys.into_iter().map(|key| {
            let original = key.as_ref().to_string();
            (key, original)
        }))
    }
}

impl<V> Default for Columns<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for Columns<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Columns::from_pairs(iter)
    }
}

/// One annotated `(column, row)` value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    /// Raw value, absent when the row was shorter than the header
    pub data: Option<String>,
    /// Validation message, if the value failed validation
    pub error: Option<String>,
    /// True when the column is neither the recipient column nor a placeholder
    pub ignore: bool,
}

impl Cell {
    /// Annotate a raw value
    ///
    /// `validate` decides the error for the value; `relevant_keys` lists the
    /// columns that are not ignored.
    pub fn annotate<F>(
        key: &NormalizedKey,
        data: Option<String>,
        validate: F,
        relevant_keys: &[NormalizedKey],
    ) -> Self
    where
        F: FnOnce(&NormalizedKey, Option<&str>) -> Option<String>,
    {
        let error = validate(key, data.as_deref());
        Cell {
            data,
            error,
            ignore: !relevant_keys.contains(key),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The annotated cells of one CSV row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Zero-based position in parse order
    pub index: usize,
    cells: Columns<Cell>,
    message_too_long: bool,
    unrendered_placeholders: Vec<String>,
}

impl Row {
    /// Annotate every value of a parsed row
    ///
    /// When a template is given, the row's raw values are bound into it and
    /// the rendered length is checked. A template placeholder with no value in
    /// this row is recorded in [`Row::unrendered_placeholders`] rather than
    /// failing the whole list.
    pub fn new<F>(
        index: usize,
        values: Columns<Option<String>>,
        mut validate: F,
        relevant_keys: &[NormalizedKey],
        template: Option<&mut Template>,
    ) -> Self
    where
        F: FnMut(&NormalizedKey, Option<&str>) -> Option<String>,
    {
        let (message_too_long, unrendered_placeholders) = match template {
            Some(template) => {
                template.set_values(values.clone());
                check_length(index, template)
            }
            None => (false, Vec::new()),
        };

        let Columns { order, mut values, .. } = values;
        let mut cells = Columns::new();
        for key in order {
            let data = values.remove(&key).flatten();
            let cell = Cell::annotate(&key, data, &mut validate, relevant_keys);
            cells.insert(key, cell);
        }

        Row {
            index,
            cells,
            message_too_long,
            unrendered_placeholders,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn cells(&self) -> &Columns<Cell> {
        &self.cells
    }

    pub fn message_too_long(&self) -> bool {
        self.message_too_long
    }

    /// Template placeholders that had no value in this row
    pub fn unrendered_placeholders(&self) -> &[String] {
        &self.unrendered_placeholders
    }

    pub fn has_error(&self) -> bool {
        self.message_too_long
            || !self.unrendered_placeholders.is_empty()
            || self.cells.iter().any(|(_, cell)| cell.has_error())
    }
}

fn check_length(index: usize, template: &Template) -> (bool, Vec<String>) {
    match template.content_too_long() {
        Ok(too_long) => (too_long, template.missing_data()),
        Err(RecipientError::NeededByTemplate { placeholders }) => (false, placeholders),
        Err(error) => {
            warn!(row = index, %error, "could not measure rendered message");
            (false, Vec::new())
        }
    }
}
