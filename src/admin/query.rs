//! Search and filtering over admin rows
//!
//! Every record type is flattened into a [`Row`] of named cells before it
//! reaches the admin list. Search and filters work on those cells only, so
//! the same code serves every registered record type.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::{FilterKind, ModelAdmin};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Bool(bool),
    DateTime(DateTime<Utc>),
    /// Hosted image reference, if any
    Image(Option<String>),
}

impl Cell {
    /// Plain-text form used for search and choice filters
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Bool(true) => "yes".to_string(),
            Cell::Bool(false) => "no".to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            Cell::Image(image) => image.clone().unwrap_or_default(),
        }
    }
}

/// One record flattened for the admin
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: i64,
    pub cells: HashMap<&'static str, Cell>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, field: &'static str, cell: Cell) -> Self {
        self.cells.insert(field, cell);
        self
    }

    pub fn text(self, field: &'static str, value: impl Into<String>) -> Self {
        self.with(field, Cell::Text(value.into()))
    }

    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.cells.get(field)
    }
}

/// Date filter choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Any,
    Today,
    PastSevenDays,
    ThisMonth,
    ThisYear,
}

impl DateRange {
    pub const ALL: [DateRange; 5] = [
        DateRange::Any,
        DateRange::Today,
        DateRange::PastSevenDays,
        DateRange::ThisMonth,
        DateRange::ThisYear,
    ];

    pub fn param(&self) -> &'static str {
        match self {
            DateRange::Any => "",
            DateRange::Today => "today",
            DateRange::PastSevenDays => "past_7_days",
            DateRange::ThisMonth => "this_month",
            DateRange::ThisYear => "this_year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Any => "Any date",
            DateRange::Today => "Today",
            DateRange::PastSevenDays => "Past 7 days",
            DateRange::ThisMonth => "This month",
            DateRange::ThisYear => "This year",
        }
    }

    /// Unknown values mean no filtering
    pub fn from_param(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|range| range.param() == value)
            .unwrap_or(DateRange::Any)
    }

    /// Half-open `[start, end)` window relative to `now`, `None` for `Any`
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let tomorrow = midnight(today + Duration::days(1));
        match self {
            DateRange::Any => None,
            DateRange::Today => Some((midnight(today), tomorrow)),
            DateRange::PastSevenDays => Some((midnight(today - Duration::days(7)), tomorrow)),
            DateRange::ThisMonth => {
                let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
                let end = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
                };
                Some((midnight(start), midnight(end)))
            }
            DateRange::ThisYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
                let end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?;
                Some((midnight(start), midnight(end)))
            }
        }
    }

    pub fn contains(&self, value: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.bounds(now) {
            None => true,
            Some((start, end)) => value >= start && value < end,
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Search text and active filters of one list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminQuery {
    pub search: String,
    /// Filter field → selected value
    pub filters: HashMap<String, String>,
}

impl AdminQuery {
    /// Build from raw query parameters; `q` is the search box, filter
    /// fields of `model` are picked by name, everything else is ignored.
    pub fn from_params(model: &ModelAdmin, params: &HashMap<String, String>) -> Self {
        let search = params.get("q").map(|q| q.trim().to_string()).unwrap_or_default();
        let filters = model
            .list_filter
            .iter()
            .filter_map(|filter| {
                params
                    .get(filter.field)
                    .filter(|value| !value.is_empty())
                    .map(|value| (filter.field.to_string(), value.clone()))
            })
            .collect();
        Self { search, filters }
    }

    pub fn selected(&self, field: &str) -> &str {
        self.filters.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Case-insensitive substring match over `fields`
pub fn matches_search(row: &Row, fields: &[&str], search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    fields.iter().any(|field| {
        row.get(field)
            .map(|cell| cell.as_text().to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

fn matches_filter(row: &Row, field: &str, kind: FilterKind, value: &str, now: DateTime<Utc>) -> bool {
    let cell = match row.get(field) {
        Some(cell) => cell,
        None => return false,
    };
    match (kind, cell) {
        (FilterKind::Bool, Cell::Bool(b)) => match value {
            "yes" => *b,
            "no" => !*b,
            _ => true,
        },
        (FilterKind::Date, Cell::DateTime(dt)) => DateRange::from_param(value).contains(*dt, now),
        (FilterKind::Choice, cell) => cell.as_text() == value,
        _ => false,
    }
}

/// Apply search and filters of `query` to `rows`, keeping their order
pub fn apply(model: &ModelAdmin, rows: Vec<Row>, query: &AdminQuery, now: DateTime<Utc>) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| matches_search(row, &model.search_fields, &query.search))
        .filter(|row| {
            model.list_filter.iter().all(|filter| match query.filters.get(filter.field) {
                Some(value) => matches_filter(row, filter.field, filter.kind, value, now),
                None => true,
            })
        })
        .collect()
}

/// A selectable filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Options offered for one filter, given all unfiltered rows
pub fn filter_options(kind: FilterKind, field: &str, rows: &[Row], selected: &str) -> Vec<FilterOption> {
    let option = |value: &str, label: &str| FilterOption {
        value: value.to_string(),
        label: label.to_string(),
        selected: value == selected,
    };
    match kind {
        FilterKind::Bool => vec![option("", "All"), option("yes", "Yes"), option("no", "No")],
        FilterKind::Date => DateRange::ALL
            .iter()
            .map(|range| option(range.param(), range.label()))
            .collect(),
        FilterKind::Choice => {
            let distinct: BTreeSet<String> = rows
                .iter()
                .filter_map(|row| row.get(field))
                .map(Cell::as_text)
                .collect();
            std::iter::once(option("", "All"))
                .chain(distinct.iter().map(|value| option(value, value)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{default_registry, RecordKind};
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn comments_admin() -> ModelAdmin {
        default_registry()
            .into_iter()
            .find(|m| m.kind == RecordKind::Comment)
            .unwrap()
    }

    fn comment_row(id: i64, title: &str, user: &str, body: &str, approved: bool, on: DateTime<Utc>) -> Row {
        Row::new(id)
            .text("exercise", title)
            .text("user", user)
            .text("body", body)
            .with("approved", Cell::Bool(approved))
            .with("created_on", Cell::DateTime(on))
    }

    #[test]
    fn test_date_ranges() {
        let now = at(2024, 3, 15, 12);
        assert!(DateRange::Today.contains(at(2024, 3, 15, 0), now));
        assert!(!DateRange::Today.contains(at(2024, 3, 14, 23), now));
        assert!(DateRange::PastSevenDays.contains(at(2024, 3, 8, 1), now));
        assert!(!DateRange::PastSevenDays.contains(at(2024, 3, 7, 23), now));
        assert!(DateRange::ThisMonth.contains(at(2024, 3, 1, 0), now));
        assert!(!DateRange::ThisMonth.contains(at(2024, 2, 29, 23), now));
        assert!(DateRange::ThisYear.contains(at(2024, 1, 1, 0), now));
        assert!(!DateRange::ThisYear.contains(at(2023, 12, 31, 23), now));
        assert!(DateRange::Any.contains(at(1999, 1, 1, 0), now));
    }

    #[test]
    fn test_december_month_bounds() {
        let now = at(2024, 12, 31, 22);
        let (start, end) = DateRange::ThisMonth.bounds(now).unwrap();
        assert_eq!(start, at(2024, 12, 1, 0));
        assert_eq!(end, at(2025, 1, 1, 0));
    }

    #[test]
    fn test_unknown_date_param_is_any() {
        assert_eq!(DateRange::from_param("yesterday"), DateRange::Any);
        assert_eq!(DateRange::from_param("this_year"), DateRange::ThisYear);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let model = comments_admin();
        let now = at(2024, 3, 15, 12);
        let rows = vec![
            comment_row(1, "Deadlift", "alice", "Brace first", true, now),
            comment_row(2, "Squat", "bob", "Knees out", false, now),
        ];

        let query = AdminQuery {
            search: "DEAD".to_string(),
            ..Default::default()
        };
        let found = apply(&model, rows.clone(), &query, now);
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);

        let query = AdminQuery {
            search: "knees".to_string(),
            ..Default::default()
        };
        assert_eq!(apply(&model, rows.clone(), &query, now)[0].id, 2);

        let query = AdminQuery {
            search: "BOB".to_string(),
            ..Default::default()
        };
        assert_eq!(apply(&model, rows, &query, now)[0].id, 2);
    }

    #[test]
    fn test_bool_and_date_filters_combine() {
        let model = comments_admin();
        let now = at(2024, 3, 15, 12);
        let rows = vec![
            comment_row(1, "A", "alice", "x", true, now),
            comment_row(2, "B", "bob", "y", false, now),
            comment_row(3, "C", "carol", "z", true, at(2023, 6, 1, 0)),
        ];

        let mut params = HashMap::new();
        params.insert("approved".to_string(), "yes".to_string());
        params.insert("created_on".to_string(), "this_year".to_string());
        params.insert("unrelated".to_string(), "1".to_string());
        let query = AdminQuery::from_params(&model, &params);
        assert_eq!(query.filters.len(), 2);

        let found = apply(&model, rows, &query, now);
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_choice_options_are_distinct_and_sorted() {
        let rows = vec![
            Row::new(1).text("name", "Zoe"),
            Row::new(2).text("name", "Adam"),
            Row::new(3).text("name", "Zoe"),
        ];
        let options = filter_options(FilterKind::Choice, "name", &rows, "Zoe");
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["", "Adam", "Zoe"]);
        assert!(options[2].selected);
        assert!(!options[0].selected);
    }

    proptest! {
        #[test]
        fn search_never_adds_rows(search in "[a-zA-Z ]{0,6}", bodies in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..8)) {
            let model = comments_admin();
            let now = at(2024, 3, 15, 12);
            let rows: Vec<Row> = bodies
                .iter()
                .enumerate()
                .map(|(i, body)| comment_row(i as i64, "T", "u", body, false, now))
                .collect();
            let query = AdminQuery { search: search.trim().to_string(), ..Default::default() };
            let found = apply(&model, rows.clone(), &query, now);
            prop_assert!(found.len() <= rows.len());
            for row in &found {
                prop_assert!(matches_search(row, &model.search_fields, &query.search));
            }
        }
    }
}
