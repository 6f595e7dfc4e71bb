//! Filter selections and fuzzy search for list views
//!
//! A [`FilterSelection`] keeps five independent value lists (categories,
//! cities, sectors, regions, companies). Every change produces a fresh
//! [`FilterSnapshot`]; snapshots handed out earlier are never modified, so a
//! view can keep rendering an old snapshot while the selection moves on.

use std::sync::Arc;

use nucleo_matcher::{Config, Matcher, Utf32Str};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::core::sorting::collation_key;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterKind {
    Categories,
    Cities,
    Sectors,
    Regions,
    Companies,
}

/// Records that can be narrowed down by a [`FilterSelection`]
pub trait Filterable {
    /// Value of the record for the given filter, if it has one
    fn filter_value(&self, kind: FilterKind) -> Option<&str>;

    /// Text matched by [`fuzzy_search`]
    fn search_text(&self) -> String;
}

/// Immutable view of the selected filter values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub sectors: Vec<String>,
    pub regions: Vec<String>,
    pub companies: Vec<String>,
    /// Incremented on every change of the owning selection
    #[serde(skip)]
    pub version: u64,
}

impl FilterSnapshot {
    pub fn values(&self, kind: FilterKind) -> &[String] {
        match kind {
            FilterKind::Categories => &self.categories,
            FilterKind::Cities => &self.cities,
            FilterKind::Sectors => &self.sectors,
            FilterKind::Regions => &self.regions,
            FilterKind::Companies => &self.companies,
        }
    }

    fn values_mut(&mut self, kind: FilterKind) -> &mut Vec<String> {
        match kind {
            FilterKind::Categories => &mut self.categories,
            FilterKind::Cities => &mut self.cities,
            FilterKind::Sectors => &mut self.sectors,
            FilterKind::Regions => &mut self.regions,
            FilterKind::Companies => &mut self.companies,
        }
    }

    pub fn contains(&self, kind: FilterKind, value: &str) -> bool {
        self.values(kind).iter().any(|v| v == value)
    }

    /// True when no filter constrains anything
    pub fn is_empty(&self) -> bool {
        <FilterKind as strum::IntoEnumIterator>::iter().all(|k| self.values(k).is_empty())
    }

    /// A record matches when, for every non-empty list, its value is one of
    /// the selected values, compared case- and accent-insensitively. Records
    /// without a value for a constrained filter do not match.
    pub fn matches<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        <FilterKind as strum::IntoEnumIterator>::iter().all(|kind| {
            let selected = self.values(kind);
            if selected.is_empty() {
                return true;
            }
            record.filter_value(kind).is_some_and(|value| {
                let value = collation_key(value.trim());
                selected.iter().any(|s| collation_key(s.trim()) == value)
            })
        })
    }

    /// Records matching this snapshot, in input order
    pub fn apply<'a, R: Filterable>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }
}

/// Owner of the filter state of one view
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    current: Arc<FilterSnapshot>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the list for `kind`. Duplicates are kept.
    pub fn select(&mut self, kind: FilterKind, value: impl Into<String>) -> Arc<FilterSnapshot> {
        let value = value.into();
        tracing::trace!("Filter {} += {}", kind, value);
        self.mutate(|snapshot| snapshot.values_mut(kind).push(value))
    }

    /// Removes every occurrence of `value` from the list for `kind`.
    pub fn remove(&mut self, kind: FilterKind, value: &str) -> Arc<FilterSnapshot> {
        if !self.current.contains(kind, value) {
            return self.snapshot();
        }
        tracing::trace!("Filter {} -= {}", kind, value);
        self.mutate(|snapshot| snapshot.values_mut(kind).retain(|v| v != value))
    }

    pub fn clear(&mut self, kind: FilterKind) -> Arc<FilterSnapshot> {
        if self.current.values(kind).is_empty() {
            return self.snapshot();
        }
        self.mutate(|snapshot| snapshot.values_mut(kind).clear())
    }

    pub fn clear_all(&mut self) -> Arc<FilterSnapshot> {
        if self.current.is_empty() {
            return self.snapshot();
        }
        self.mutate(|snapshot| {
            let version = snapshot.version;
            *snapshot = FilterSnapshot {
                version,
                ..FilterSnapshot::default()
            };
        })
    }

    pub fn snapshot(&self) -> Arc<FilterSnapshot> {
        Arc::clone(&self.current)
    }

    fn mutate(&mut self, change: impl FnOnce(&mut FilterSnapshot)) -> Arc<FilterSnapshot> {
        // Copy-on-write: snapshots already handed out stay untouched
        let snapshot = Arc::make_mut(&mut self.current);
        change(snapshot);
        snapshot.version += 1;
        self.snapshot()
    }
}

/// Fuzzy filters records by their search text using the nucleo matcher.
///
/// Returns records sorted by match quality (best matches first); records with
/// equal scores keep their input order. Empty queries return every record
/// with a score of 0, in input order.
pub fn fuzzy_search<'a, R: Filterable>(records: &'a [R], query: &str) -> Vec<(&'a R, u16)> {
    let query = query.trim();
    if query.is_empty() {
        return records.iter().map(|r| (r, 0)).collect();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let query_lowercase = query.to_lowercase();
    let mut needle_buf = Vec::new();
    let needle = Utf32Str::new(&query_lowercase, &mut needle_buf);

    // Reuse buffer across all records to reduce allocations
    let mut haystack_buf = Vec::new();

    let mut results: Vec<_> = records
        .iter()
        .filter_map(|record| {
            let text = record.search_text().to_lowercase();
            haystack_buf.clear();
            let haystack = Utf32Str::new(&text, &mut haystack_buf);
            matcher
                .fuzzy_match(haystack, needle)
                .map(|score| (record, score))
        })
        .collect();

    // Stable sort so equally relevant records stay in table order
    results.sort_by(|a, b| b.1.cmp(&a.1));
    results
}
