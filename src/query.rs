use std::cmp::{Ordering, Reverse};

use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, tuple},
    IResult,
};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::model::Record;
use crate::parser::{self, Condition, Direction, OrderBy, Query};

/// Shown whenever a query cannot be evaluated and the full set is returned instead.
pub const SYNTAX_NOTICE: &str = "The query syntax could not be understood. Showing every record.";

/// How unrecognized conditions are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Unrecognized conditions pass every record; stray ORDER BY tokens are ignored.
    #[default]
    Lenient,
    /// Unrecognized conditions and stray ORDER BY tokens fail the whole query.
    Strict,
}

/// The filtered and ordered records currently on display.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub records: Vec<Record>,
    pub notice: Option<String>,
}

impl View {
    pub fn all(records: &[Record]) -> Self {
        Self { records: records.to_vec(), notice: None }
    }
}

/// Evaluate `text` against `records` in lenient mode.
pub fn evaluate(records: &[Record], text: &str) -> View {
    evaluate_with(records, text, QueryMode::Lenient)
}

/// Never fails: a query that cannot be understood yields every record plus a notice.
pub fn evaluate_with(records: &[Record], text: &str, mode: QueryMode) -> View {
    if text.trim().is_empty() {
        return View::all(records);
    }

    match compile(text, mode) {
        Ok(query) => View { records: apply(&query, records), notice: None },
        Err(e) => {
            warn!("falling back to unfiltered view: {}", e);
            View { records: records.to_vec(), notice: Some(SYNTAX_NOTICE.to_string()) }
        }
    }
}

/// Parse and check a query against `mode`.
pub fn compile(text: &str, mode: QueryMode) -> Result<Query> {
    let query = parser::parse_query(text)?;
    debug!(conditions = query.conditions.len(), ordered = query.order_by.is_some(), "parsed query");

    if mode == QueryMode::Strict {
        if let Some(condition) = query.unrecognized().next() {
            return Err(CatalogError::Query(format!("unsupported condition '{}'", condition)));
        }
        if let Some(OrderBy { ignored, .. }) = &query.order_by {
            if !ignored.is_empty() {
                return Err(CatalogError::Query(format!("unexpected ORDER BY tokens '{}'", ignored.join(" "))));
            }
        }
    }
    Ok(query)
}

/// Filter, then sort. The input slice is left untouched.
pub fn apply(query: &Query, records: &[Record]) -> Vec<Record> {
    let mut result: Vec<Record> = records
        .iter()
        .filter(|record| query.conditions.iter().all(|c| c.matches(record)))
        .cloned()
        .collect();

    if let Some(order_by) = &query.order_by {
        let key = |record: &Record| SortKey::of(&record.field(&order_by.field).unwrap_or_default());
        match order_by.direction {
            Direction::Asc => result.sort_by_cached_key(key),
            Direction::Desc => result.sort_by_cached_key(|record| Reverse(key(record))),
        }
    }
    result
}

impl Condition {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Like { field, value } => {
                record.field(field).map_or(false, |v| v.to_lowercase().contains(value.as_str()))
            }
            Condition::Equals { field, value } => {
                record.field(field).map_or(false, |v| v.to_lowercase() == *value)
            }
            Condition::GreaterThan { field, value } => {
                record.field(field).and_then(|v| leading_number(&v)).map_or(false, |n| n > *value)
            }
            Condition::LessThan { field, value } => {
                record.field(field).and_then(|v| leading_number(&v)).map_or(false, |n| n < *value)
            }
            Condition::Unrecognized(_) => true,
        }
    }
}

/// Numeric prefix of a field value, like `parseFloat`: `"8/10"` reads as 8, `"9excellent"` as 9.
fn leading_number(text: &str) -> Option<f64> {
    let (_, digits) = number_prefix(text.trim_start()).ok()?;
    digits.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_prefix(input: &str) -> IResult<&str, &str> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), opt(digit1))),
        opt(exponent),
    )))(input)
}

/// Sort key: numbers first in numeric order, then text in case-sensitive order.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: &str) -> Self {
        match as_number(value) {
            Some(n) => SortKey::Number(n),
            None => SortKey::Text(value.to_string()),
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

fn as_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordDraft, RecordId};

    fn record(name: &str, category: &str, score: &str) -> Record {
        RecordDraft {
            name: name.into(),
            category: category.into(),
            origin: "Spain".into(),
            color: "Gold".into(),
            score: score.into(),
            ..Default::default()
        }
        .into_record(RecordId::generate())
    }

    fn names(view: &View) -> Vec<&str> {
        view.records.iter().map(|r| r.name.as_str()).collect()
    }

    fn cellar() -> Vec<Record> {
        vec![
            record("Mocha Stout", "Stout", "9"),
            record("Pale IPA", "IPA", "7"),
            record("Hazy Double IPA", "IPA", "8.5"),
            record("Pilsner", "Lager", "5"),
        ]
    }

    #[test]
    fn empty_query_is_identity() {
        let records = cellar();
        for text in ["", "   ", "\t\n"] {
            let view = evaluate(&records, text);
            assert_eq!(view.records, records);
            assert_eq!(view.notice, None);
        }
    }

    #[test]
    fn like_is_case_insensitive_substring() {
        let view = evaluate(&cellar(), "WHERE name LIKE '%ipa%'");
        assert_eq!(names(&view), vec!["Pale IPA", "Hazy Double IPA"]);
    }

    #[test]
    fn equals_is_case_insensitive_exact() {
        let view = evaluate(&cellar(), "where category = 'ipa'");
        assert_eq!(names(&view), vec!["Pale IPA", "Hazy Double IPA"]);

        let view = evaluate(&cellar(), "where name = 'pale'");
        assert!(view.records.is_empty());
    }

    #[test]
    fn numeric_comparisons_parse_scores() {
        let view = evaluate(&cellar(), "WHERE score > 7");
        assert_eq!(names(&view), vec!["Mocha Stout", "Hazy Double IPA"]);

        let view = evaluate(&cellar(), "WHERE score < 7");
        assert_eq!(names(&view), vec!["Pilsner"]);
    }

    #[test]
    fn score_with_trailing_text_uses_numeric_prefix() {
        let records = vec![record("Rated", "Ale", "8/10"), record("Unrated", "Ale", "n/a")];
        let view = evaluate(&records, "where score > 7");
        assert_eq!(names(&view), vec!["Rated"]);
        let view = evaluate(&records, "where score < 100");
        assert_eq!(names(&view), vec!["Rated"]);
    }

    #[test]
    fn missing_fields_never_match() {
        let records = cellar();
        assert!(evaluate(&records, "where brewery like '%x%'").records.is_empty());
        assert!(evaluate(&records, "where photo = 'x'").records.is_empty());
        assert!(evaluate(&records, "where brewery > 0").records.is_empty());
    }

    #[test]
    fn conjunction_is_intersection() {
        let records = cellar();
        let a = evaluate(&records, "WHERE category = 'ipa'").records;
        let b = evaluate(&records, "WHERE score > 8").records;
        let both = evaluate(&records, "WHERE category = 'ipa' AND score > 8").records;

        let expected: Vec<Record> = a.into_iter().filter(|r| b.contains(r)).collect();
        assert_eq!(both, expected);
        assert_eq!(names(&View { records: both, notice: None }), vec!["Hazy Double IPA"]);
    }

    #[test]
    fn unsupported_operators_filter_nothing() {
        let records = cellar();
        for text in ["WHERE score != 5", "WHERE score >= 9", "WHERE score <= 1", "WHERE name IN ('x')", "WHERE a = 'b' OR c = 'd'"] {
            let view = evaluate(&records, text);
            assert_eq!(view.records, records, "{}", text);
            assert_eq!(view.notice, None);
        }
    }

    #[test]
    fn order_by_score_desc() {
        let records = vec![record("A", "Ale", "5"), record("B", "Ale", "8"), record("C", "Ale", "3")];
        let view = evaluate(&records, "ORDER BY score DESC");
        let scores: Vec<&str> = view.records.iter().map(|r| r.score.as_str()).collect();
        assert_eq!(scores, vec!["8", "5", "3"]);
    }

    #[test]
    fn order_by_compares_numbers_numerically() {
        let records = vec![record("A", "Ale", "10"), record("B", "Ale", "9"), record("C", "Ale", "9.5")];
        let view = evaluate(&records, "order by score");
        let scores: Vec<&str> = view.records.iter().map(|r| r.score.as_str()).collect();
        assert_eq!(scores, vec!["9", "9.5", "10"]);
    }

    #[test]
    fn order_by_name_is_lexicographic_ascending() {
        let view = evaluate(&cellar(), "ORDER BY name");
        assert_eq!(names(&view), vec!["Hazy Double IPA", "Mocha Stout", "Pale IPA", "Pilsner"]);
    }

    #[test]
    fn text_ordering_is_case_sensitive() {
        let records = vec![record("b", "Ale", "1"), record("B", "Ale", "1"), record("a", "Ale", "1")];
        let view = evaluate(&records, "order by name");
        assert_eq!(names(&view), vec!["B", "a", "b"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let records = vec![record("First", "IPA", "7"), record("Second", "IPA", "7"), record("Third", "IPA", "7")];
        let view = evaluate(&records, "order by score desc");
        assert_eq!(names(&view), vec!["First", "Second", "Third"]);
    }

    #[test]
    fn input_is_not_reordered() {
        let records = cellar();
        let before = records.clone();
        let view = evaluate(&records, "order by name desc");
        assert_eq!(records, before);
        assert_ne!(view.records, before);
    }

    #[test]
    fn scenario_mocha_and_pale() {
        let records = vec![record("Mocha Stout", "Stout", "9"), record("Pale IPA", "IPA", "7")];

        let view = evaluate(&records, "WHERE name LIKE '%IPA%'");
        assert_eq!(names(&view), vec!["Pale IPA"]);

        let view = evaluate(&records, "WHERE score > 8 ORDER BY score DESC");
        assert_eq!(names(&view), vec!["Mocha Stout"]);
    }

    #[test]
    fn unparseable_query_falls_back_with_notice() {
        let records = cellar();
        let view = evaluate(&records, "where score > 1 order by");
        assert_eq!(view.records, records);
        assert_eq!(view.notice.as_deref(), Some(SYNTAX_NOTICE));
    }

    #[test]
    fn strict_mode_rejects_unrecognized_conditions() {
        let records = cellar();
        let view = evaluate_with(&records, "where score != 5", QueryMode::Strict);
        assert_eq!(view.records, records);
        assert!(view.notice.is_some());

        let view = evaluate_with(&records, "order by score sideways", QueryMode::Strict);
        assert!(view.notice.is_some());

        let view = evaluate_with(&records, "where score > 8", QueryMode::Strict);
        assert_eq!(names(&view), vec!["Mocha Stout", "Hazy Double IPA"]);
        assert_eq!(view.notice, None);
    }

    #[test]
    fn leading_number_reads_prefixes() {
        assert_eq!(leading_number(" 7.5 stars"), Some(7.5));
        assert_eq!(leading_number("-2"), Some(-2.0));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("9excellent"), Some(9.0));
        assert_eq!(leading_number("7extra"), Some(7.0));
        assert_eq!(leading_number("8e"), Some(8.0));
        assert_eq!(leading_number("1e2 points"), Some(100.0));
        assert_eq!(leading_number("8."), Some(8.0));
        assert_eq!(leading_number("1e999"), None);
    }

    #[test]
    fn score_followed_by_words_compares_numerically() {
        let records = vec![record("Great", "Ale", "9excellent"), record("Fine", "Ale", "7e")];
        let view = evaluate(&records, "where score > 8");
        assert_eq!(names(&view), vec!["Great"]);
    }

    #[test]
    fn mixed_scores_sort_numbers_before_text() {
        let pool = ["10", "9", "1a", "2", "x", "100", "3b", "20", "5", "05a", "8", "1", "inf", ""];
        let records: Vec<Record> = (0..240)
            .map(|i| record(&format!("R{}", i), "Ale", pool[(i * 7 + i / 3) % pool.len()]))
            .collect();

        let view = evaluate(&records, "order by score");
        assert_eq!(view.records.len(), records.len());
        let keys: Vec<SortKey> = view.records.iter().map(|r| SortKey::of(&r.score)).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let first_text = keys.iter().position(|k| matches!(k, SortKey::Text(_))).unwrap();
        assert!(keys[..first_text].iter().all(|k| matches!(k, SortKey::Number(_))));
        assert!(keys[first_text..].iter().all(|k| matches!(k, SortKey::Text(_))));

        let view = evaluate(&records, "order by score desc");
        let keys: Vec<SortKey> = view.records.iter().map(|r| SortKey::of(&r.score)).collect();
        assert!(keys.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn infinity_words_sort_as_text() {
        assert_eq!(SortKey::of("inf"), SortKey::Text("inf".into()));
        assert_eq!(SortKey::of("Infinity"), SortKey::Text("Infinity".into()));
        assert_eq!(SortKey::of(" 8 "), SortKey::Number(8.0));
    }
}
