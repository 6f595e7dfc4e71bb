//! Sortable-list state and derived sorted views
//!
//! A [`SortableList`] holds the current [`SortConfig`] of a table and derives
//! a sorted copy of whatever collection it is handed. The input is never
//! mutated, and equal keys keep their input order.
//!
//! Records opt in by implementing [`Sortable`]: each sortable column is a
//! variant of the record's `Field` enum, and [`Sortable::field_value`] tells
//! the comparator whether the column holds text, a number or a date.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::dates::parse_timestamp;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    #[strum(to_string = "asc", serialize = "ascending")]
    Ascending,
    #[strum(to_string = "desc", serialize = "descending")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig<F> {
    pub key: F,
    pub direction: SortDirection,
}

impl<F> SortConfig<F> {
    pub fn ascending(key: F) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }
}

/// Value of one column of a record, as seen by the comparator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    /// Raw date text; `None` or unparseable values sort after every valid date
    Date(Option<&'a str>),
}

pub trait Sortable {
    type Field: Copy + Eq + std::fmt::Debug;

    fn field_value(&self, field: Self::Field) -> FieldValue<'_>;
}

/// Pre-computed comparison key, built once per record per sort
#[derive(Debug)]
enum SortKey {
    Text { folded: String, raw: String },
    Number(f64),
    Date(Option<i64>),
}

impl SortKey {
    fn from_value(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Text(s) => SortKey::Text {
                folded: collation_key(s),
                raw: s.to_string(),
            },
            FieldValue::Number(n) => SortKey::Number(n),
            FieldValue::Date(raw) => SortKey::Date(
                raw.and_then(parse_timestamp)
                    .map(|dt| dt.timestamp_millis()),
            ),
        }
    }

    fn is_invalid_date(&self) -> bool {
        matches!(self, SortKey::Date(None))
    }

    fn compare(&self, other: &Self, direction: SortDirection) -> Ordering {
        let directed = |ord: Ordering| match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };

        match (self, other) {
            (
                SortKey::Text { folded: a, raw: ra },
                SortKey::Text {
                    folded: b,
                    raw: rb,
                },
            ) => directed(a.cmp(b).then_with(|| ra.cmp(rb))),
            (SortKey::Number(a), SortKey::Number(b)) => directed(a.total_cmp(b)),
            // Invalid dates go last regardless of direction
            (SortKey::Date(Some(a)), SortKey::Date(Some(b))) => directed(a.cmp(b)),
            (SortKey::Date(None), SortKey::Date(Some(_))) => Ordering::Greater,
            (SortKey::Date(Some(_)), SortKey::Date(None)) => Ordering::Less,
            _ => Ordering::Equal,
        }
    }
}

/// Case-insensitive, accent-folded form used for locale-aware ordering
/// ("école" sorts next to "ecole", not after "zèbre").
pub fn collation_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
            'ç' => out.push('c'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ñ' => out.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'ý' | 'ÿ' => out.push('y'),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            other => out.push(other),
        }
    }
    out
}

/// Returns the input positions in sorted order.
pub fn sorted_indices<T: Sortable>(items: &[T], config: &SortConfig<T::Field>) -> Vec<usize> {
    let keys: Vec<SortKey> = items
        .iter()
        .map(|item| SortKey::from_value(item.field_value(config.key)))
        .collect();

    let invalid_dates = keys.iter().filter(|k| k.is_invalid_date()).count();
    if invalid_dates > 0 {
        tracing::debug!(
            "Sorting by {:?}: {} record(s) without a valid date placed last",
            config.key,
            invalid_dates
        );
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    // sort_by is stable: equal keys keep their input order
    order.sort_by(|&a, &b| keys[a].compare(&keys[b], config.direction));
    order
}

/// Sorted copy of `items`; the input slice is left untouched.
pub fn sorted<T: Sortable + Clone>(items: &[T], config: &SortConfig<T::Field>) -> Vec<T> {
    sorted_indices(items, config)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

/// Sorted view borrowing from `items`
pub fn sorted_refs<'a, T: Sortable>(items: &'a [T], config: &SortConfig<T::Field>) -> Vec<&'a T> {
    sorted_indices(items, config)
        .into_iter()
        .map(|i| &items[i])
        .collect()
}

/// Groups records by `key`, keeping groups in order of first appearance and
/// records in input order inside each group. Feed it a sorted view to get
/// grouped tables.
pub fn group_by<'a, T, K, F>(items: &'a [T], key: F) -> Vec<(K, Vec<&'a T>)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

struct CachedView<T: Sortable> {
    input: Arc<Vec<T>>,
    config: SortConfig<T::Field>,
    output: Arc<Vec<T>>,
}

impl<T: Sortable> CachedView<T> {
    fn is_fresh(&self, input: &Arc<Vec<T>>, config: &SortConfig<T::Field>) -> bool {
        Arc::ptr_eq(&self.input, input)
            && self.config.key == config.key
            && self.config.direction == config.direction
    }
}

/// Sort state of one table plus its last derived view
pub struct SortableList<T: Sortable> {
    config: SortConfig<T::Field>,
    cache: Option<CachedView<T>>,
}

impl<T: Sortable + Clone> SortableList<T> {
    pub fn new(default_key: T::Field) -> Self {
        Self::with_config(SortConfig::ascending(default_key))
    }

    pub fn with_config(config: SortConfig<T::Field>) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn config(&self) -> &SortConfig<T::Field> {
        &self.config
    }

    /// Same column flips the direction; a new column sorts ascending.
    pub fn request_sort(&mut self, field: T::Field) {
        if self.config.key == field {
            self.config.direction = self.config.direction.toggled();
        } else {
            self.config = SortConfig::ascending(field);
        }
        tracing::trace!(
            "Sort changed to {:?} {}",
            self.config.key,
            self.config.direction
        );
    }

    /// Sorted view of `input`. Recomputed only when `input` is a different
    /// allocation or the configuration changed since the last call.
    pub fn view(&mut self, input: &Arc<Vec<T>>) -> Arc<Vec<T>> {
        if let Some(cache) = &self.cache
            && cache.is_fresh(input, &self.config)
        {
            return Arc::clone(&cache.output);
        }

        let output = Arc::new(sorted(input, &self.config));
        self.cache = Some(CachedView {
            input: Arc::clone(input),
            config: self.config,
            output: Arc::clone(&output),
        });
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        nom: &'static str,
        montant: f64,
        date: Option<&'static str>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum RowField {
        Nom,
        Montant,
        Date,
    }

    impl Sortable for Row {
        type Field = RowField;

        fn field_value(&self, field: RowField) -> FieldValue<'_> {
            match field {
                RowField::Nom => FieldValue::Text(self.nom),
                RowField::Montant => FieldValue::Number(self.montant),
                RowField::Date => FieldValue::Date(self.date),
            }
        }
    }

    fn row(nom: &'static str, montant: f64, date: Option<&'static str>) -> Row {
        Row { nom, montant, date }
    }

    fn names(rows: &[Row]) -> Vec<&'static str> {
        rows.iter().map(|r| r.nom).collect()
    }

    #[test]
    fn test_request_sort_toggles_same_field() {
        let mut list: SortableList<Row> = SortableList::new(RowField::Nom);
        assert_eq!(list.config().direction, SortDirection::Ascending);

        list.request_sort(RowField::Nom);
        assert_eq!(list.config().direction, SortDirection::Descending);

        list.request_sort(RowField::Nom);
        assert_eq!(list.config().direction, SortDirection::Ascending);
    }

    #[test]
    fn test_request_sort_new_field_resets_direction() {
        let mut list: SortableList<Row> = SortableList::new(RowField::Nom);
        list.request_sort(RowField::Nom);
        assert_eq!(list.config().direction, SortDirection::Descending);

        list.request_sort(RowField::Montant);
        assert_eq!(list.config().key, RowField::Montant);
        assert_eq!(list.config().direction, SortDirection::Ascending);
    }

    #[test]
    fn test_text_sort_is_accent_and_case_insensitive() {
        let rows = vec![
            row("zèbre", 0.0, None),
            row("École", 0.0, None),
            row("ananas", 0.0, None),
            row("ecole", 0.0, None),
        ];
        let out = sorted(&rows, &SortConfig::ascending(RowField::Nom));
        assert_eq!(names(&out), vec!["ananas", "ecole", "École", "zèbre"]);
    }

    #[test]
    fn test_number_sort_descending() {
        let rows = vec![row("a", 10.0, None), row("b", 300.0, None), row("c", 25.5, None)];
        let config = SortConfig {
            key: RowField::Montant,
            direction: SortDirection::Descending,
        };
        assert_eq!(names(&sorted(&rows, &config)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_dates_compare_by_timestamp_not_text() {
        let rows = vec![
            row("later", 0.0, Some("02/01/2024")),
            row("earlier", 0.0, Some("2023-12-31")),
        ];
        let out = sorted(&rows, &SortConfig::ascending(RowField::Date));
        assert_eq!(names(&out), vec!["earlier", "later"]);
    }

    #[test]
    fn test_invalid_dates_sort_last_in_both_directions() {
        let rows = vec![
            row("broken", 0.0, Some("not a date")),
            row("old", 0.0, Some("2020-01-01")),
            row("missing", 0.0, None),
            row("new", 0.0, Some("2024-01-01")),
        ];

        let asc = sorted(&rows, &SortConfig::ascending(RowField::Date));
        assert_eq!(names(&asc), vec!["old", "new", "broken", "missing"]);

        let desc = sorted(
            &rows,
            &SortConfig {
                key: RowField::Date,
                direction: SortDirection::Descending,
            },
        );
        assert_eq!(names(&desc), vec!["new", "old", "broken", "missing"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let rows = vec![row("first", 5.0, None), row("second", 5.0, None), row("third", 1.0, None)];
        let out = sorted(&rows, &SortConfig::ascending(RowField::Montant));
        assert_eq!(names(&out), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let rows = vec![row("b", 2.0, None), row("a", 1.0, None)];
        let before = rows.clone();
        let _ = sorted_refs(&rows, &SortConfig::ascending(RowField::Nom));
        assert_eq!(rows, before);
    }

    #[test]
    fn test_view_reuses_cache_for_same_input() {
        let input = Arc::new(vec![row("b", 2.0, None), row("a", 1.0, None)]);
        let mut list: SortableList<Row> = SortableList::new(RowField::Nom);

        let first = list.view(&input);
        let second = list.view(&input);
        assert!(Arc::ptr_eq(&first, &second));

        list.request_sort(RowField::Nom);
        let third = list.view(&input);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(names(&third), vec!["b", "a"]);
    }

    #[test]
    fn test_view_recomputes_for_new_allocation() {
        let mut list: SortableList<Row> = SortableList::new(RowField::Nom);
        let first = list.view(&Arc::new(vec![row("a", 1.0, None)]));
        let second = list.view(&Arc::new(vec![row("a", 1.0, None)]));
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_group_by_keeps_first_appearance_order() {
        let rows = vec![
            row("a", 1.0, None),
            row("b", 2.0, None),
            row("c", 1.0, None),
        ];
        let groups = group_by(&rows, |r| r.montant.to_string());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "1");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1].nom, "c");
        assert_eq!(groups[1].0, "2");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Ascending);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
