//! Text clean-up for column names and cell values, and numeric casting.
//!
//! The rules are heuristics tuned against successive workbook versions. They
//! are written as small single-purpose steps so each can be tested on its
//! own, and [`Sanitiser`] strings them together in a fixed order.

use std::sync::LazyLock;

use regex::Regex;

use crate::isp::workbook::model::{CellValue, Value};

/// Known misspellings and unwanted notes, replaced wherever they occur.
pub const TYPO_CORRECTIONS: &[(&str, &str)] = &[
    ("Tranmission", "Transmission"),
    ("Capabilty", "Capability"),
    ("Retirment", "Retirement"),
    ("Genertor", "Generator"),
    (" (refer to notes)", ""),
];

static DUPLICATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[.\d]+$").expect("valid duplicate suffix pattern"));
static NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").expect("valid newline pattern"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));
static TRAILING_ASTERISKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*+$").expect("valid asterisk pattern"));
static NOTE_IN_PARENTHESES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9.]+)\s(?:\([\w\s.<=\-]+\)?\s?)+").expect("valid parenthetical note pattern")
});
static NOTE_AFTER_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9.]+)\s?(?:-[\w\s.<=\-()]+)+").expect("valid hyphen note pattern")
});
static LEADING_HYPHEN_NOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s?(?:\([\w\s.<=\-()]+)+").expect("valid leading note pattern")
});
static FINANCIAL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2,4}").expect("valid financial year pattern"));
static MILLIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?\s?([0-9][0-9,]*(?:\.[0-9]+)?)\s?M$").expect("valid millions pattern")
});

/// Applies the column-name and value clean-up rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitiser {
    corrections: Vec<(String, String)>,
}

impl Default for Sanitiser {
    fn default() -> Self {
        Self::new(
            TYPO_CORRECTIONS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
        )
    }
}

impl Sanitiser {
    /// A sanitiser using `corrections` in place of the built-in table.
    pub fn new(corrections: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            corrections: corrections.into_iter().collect(),
        }
    }

    /// Adds one more substring correction, applied after the existing ones.
    pub fn with_correction(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.corrections.push((from.into(), to.into()));
        self
    }

    pub fn corrections(&self) -> &[(String, String)] {
        &self.corrections
    }

    fn apply_corrections(&self, value: &str) -> String {
        self.corrections
            .iter()
            .fold(value.to_string(), |acc, (from, to)| {
                if from.is_empty() {
                    acc
                } else {
                    acc.replace(from.as_str(), to)
                }
            })
    }

    /// Cleans one column-name fragment.
    pub fn column_name(&self, raw: &str) -> String {
        let value = strip_duplicate_suffix(raw);
        let value = self.apply_corrections(&value);
        let value = replace_newlines(value.trim());
        let value = collapse_whitespace(&value);
        strip_column_footnote(&value)
    }

    /// Cleans one text value from a column that did not cast to numbers.
    pub fn value(&self, raw: &str) -> String {
        let value = replace_newlines(raw);
        let value = collapse_whitespace(&value);
        let value = self.apply_corrections(&value);
        let value = strip_trailing_asterisks(value.trim());
        let value = remove_thousands_commas(&value);
        let value = strip_notes_after_values(&value);
        let value = strip_value_footnote(&value);
        expand_millions(&value)
    }

    /// Casts a column to numbers when every non-blank cell allows it. If it
    /// does not, text cells are cleaned and the cast is tried once more;
    /// a second failure keeps the cleaned values as they are.
    pub fn cast_column(&self, cells: Vec<CellValue>) -> Vec<Value> {
        if let Some(numbers) = coerce_numeric(&cells) {
            return numbers;
        }
        let cleaned: Vec<CellValue> = cells
            .into_iter()
            .map(|cell| match cell {
                CellValue::String(text) => {
                    let text = self.value(&text);
                    if text.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::String(text)
                    }
                }
                other => other,
            })
            .collect();
        coerce_numeric(&cleaned)
            .unwrap_or_else(|| cleaned.into_iter().map(Value::from).collect())
    }
}

/// A lone hyphen means "no data", not a minus sign; it becomes an empty cell.
pub fn replace_hyphen_sentinels(rows: &mut [Vec<CellValue>]) {
    for cell in rows.iter_mut().flatten() {
        if matches!(cell, CellValue::String(text) if text == "-") {
            *cell = CellValue::Empty;
        }
    }
}

/// Drops a `.1`, `.2.1`-style suffix left behind by duplicate renaming.
pub fn strip_duplicate_suffix(value: &str) -> String {
    DUPLICATE_SUFFIX.replace(value, "").into_owned()
}

pub fn replace_newlines(value: &str) -> String {
    NEWLINES.replace_all(value, " ").into_owned()
}

pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUNS.replace_all(value, " ").into_owned()
}

pub fn strip_trailing_asterisks(value: &str) -> String {
    TRAILING_ASTERISKS
        .replace(value, "")
        .trim_end()
        .to_string()
}

/// Removes commas sitting between two digits, e.g. `1,234,567`.
pub fn remove_thousands_commas(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|(index, ch)| {
            !(**ch == ','
                && *index > 0
                && chars[index - 1].is_ascii_digit()
                && chars.get(index + 1).is_some_and(char::is_ascii_digit))
        })
        .map(|(_, ch)| *ch)
        .collect()
}

/// Drops notes written after a leading number: `35.5 (comment)`,
/// `50.0 - note`, `- (note)`. A financial year such as `2024-25` at the
/// start of the value is left alone.
pub fn strip_notes_after_values(value: &str) -> String {
    let value = NOTE_IN_PARENTHESES.replace(value, "${1}").into_owned();
    let value = if FINANCIAL_YEAR.is_match(&value) {
        value
    } else {
        NOTE_AFTER_HYPHEN.replace(&value, "${1}").into_owned()
    };
    LEADING_HYPHEN_NOTE.replace(&value, "").into_owned()
}

/// Strips a single trailing footnote digit from a value. Digits after
/// whitespace, another digit, an uppercase letter or one of `. _ - # ^` are
/// kept: they belong to names such as `Snowy 2.0`, `DUID7` or `x^2`.
pub fn strip_value_footnote(value: &str) -> String {
    strip_footnote(value, |prev| {
        prev.is_whitespace()
            || prev.is_ascii_digit()
            || prev.is_ascii_uppercase()
            || matches!(prev, '.' | '_' | '-' | '#' | '^')
    })
}

/// Column-name variant of [`strip_value_footnote`]; `+` and `/` also protect
/// the digit, as in `N+1` or `1/2`.
pub fn strip_column_footnote(value: &str) -> String {
    strip_footnote(value, |prev| {
        prev.is_whitespace()
            || prev.is_ascii_digit()
            || prev.is_ascii_uppercase()
            || matches!(prev, '.' | '_' | '-' | '#' | '^' | '+' | '/')
    })
}

fn strip_footnote(value: &str, protected: impl Fn(char) -> bool) -> String {
    let mut chars = value.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(last), Some(prev)) if last.is_ascii_digit() && !protected(prev) => {
            value[..value.len() - last.len_utf8()].to_string()
        }
        _ => value.to_string(),
    }
}

/// Expands `$12.5 M` style shorthand to the full number.
pub fn expand_millions(value: &str) -> String {
    let Some(captures) = MILLIONS.captures(value) else {
        return value.to_string();
    };
    let digits = captures[1].replace(',', "");
    match digits.parse::<f64>() {
        Ok(number) => format_number(number * 1_000_000.0),
        Err(_) => value.to_string(),
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 9.0e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

enum Parsed {
    Null,
    Number { value: f64, integral: Option<i64> },
}

fn parse_cell(cell: &CellValue) -> Option<Parsed> {
    match cell {
        CellValue::Empty => Some(Parsed::Null),
        CellValue::Int(value) => Some(Parsed::Number {
            value: *value as f64,
            integral: Some(*value),
        }),
        CellValue::Float(value) => Some(Parsed::Number {
            value: *value,
            integral: whole_number(*value),
        }),
        CellValue::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Some(Parsed::Null);
            }
            if !text.chars().any(|ch| ch.is_ascii_digit()) {
                return None;
            }
            if let Ok(value) = text.parse::<i64>() {
                return Some(Parsed::Number {
                    value: value as f64,
                    integral: Some(value),
                });
            }
            text.parse::<f64>().ok().map(|value| Parsed::Number {
                value,
                integral: None,
            })
        }
        CellValue::Bool(_) | CellValue::DateTime(_) | CellValue::Error(_) => None,
    }
}

fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e18).then_some(value as i64)
}

/// Whole-column numeric cast: `None` unless every cell is blank or numeric.
/// The column is integral when every number is, floating point otherwise.
pub fn coerce_numeric(cells: &[CellValue]) -> Option<Vec<Value>> {
    let parsed = cells.iter().map(parse_cell).collect::<Option<Vec<_>>>()?;
    let all_integral = parsed.iter().all(|cell| match cell {
        Parsed::Null => true,
        Parsed::Number { integral, .. } => integral.is_some(),
    });
    Some(
        parsed
            .into_iter()
            .map(|cell| match cell {
                Parsed::Null => Value::Null,
                Parsed::Number {
                    integral: Some(whole),
                    ..
                } if all_integral => Value::Integer(whole),
                Parsed::Number { value, .. } => Value::Float(value),
            })
            .collect(),
    )
}
