//! Per-cell pseudonymization driven by column classification

use crate::classifier::{ColumnClassifier, ColumnKind};
use crate::faker::SyntheticSource;
use crate::table::{Row, Table};
use anyhow::Result;
use regex::Regex;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone)]
pub struct FieldAnonymizer {
    classifier: ColumnClassifier,
    email_pattern: Regex,
}

impl FieldAnonymizer {
    pub fn new() -> Result<Self> {
        // Anchored at the start only, so trailing text after the domain is accepted.
        let email_pattern = Regex::new(r"^[^@]+@[^@]+\.[^@]+")
            .map_err(|e| anyhow::anyhow!("Invalid email pattern: {}", e))?;

        Ok(Self {
            classifier: ColumnClassifier::new()?,
            email_pattern,
        })
    }

    pub fn anonymize_value(
        &self,
        column: &str,
        value: &Value,
        source: &mut dyn SyntheticSource,
    ) -> Value {
        self.transform(self.classifier.classify(column), value, source)
    }

    /// Applies the transform for an already classified column.
    pub fn transform(
        &self,
        kind: ColumnKind,
        value: &Value,
        source: &mut dyn SyntheticSource,
    ) -> Value {
        if value.is_null() {
            return Value::Null;
        }

        match kind {
            ColumnKind::Name => Value::String(source.full_name()),
            ColumnKind::Email => self.clean_email(value, source),
            ColumnKind::Website => clean_website(value, source),
            ColumnKind::Phone => clean_phone_number(value).map_or(Value::Null, Value::String),
            ColumnKind::WorkedDirectly => Value::String(source.yes_no().to_string()),
            ColumnKind::Generic => match value {
                Value::String(s) => Value::String(clean_string(s)),
                other => clean_numerical(other),
            },
        }
    }

    /// Pseudonymizes every cell of every row. Row order and each row's own
    /// column set are preserved; missing columns are not filled in.
    pub fn pseudonymize_table(&self, table: &Table, source: &mut dyn SyntheticSource) -> Table {
        let mut kinds: HashMap<&str, ColumnKind> = HashMap::new();
        let mut output = Table::default();

        for row in table.rows() {
            let mut pseudonymized = Row::new();
            for (column, value) in row {
                let kind = *kinds.entry(column.as_str()).or_insert_with(|| {
                    let kind = self.classifier.classify(column);
                    debug!("Column '{}' classified as {}", column, kind);
                    kind
                });
                pseudonymized.insert(column.clone(), self.transform(kind, value, source));
            }
            output.push(pseudonymized);
        }

        output
    }

    fn clean_email(&self, value: &Value, source: &mut dyn SyntheticSource) -> Value {
        if self.email_pattern.is_match(&cell_text(value)) {
            value.clone()
        } else {
            Value::String(source.email())
        }
    }
}

fn clean_website(value: &Value, source: &mut dyn SyntheticSource) -> Value {
    match value {
        Value::String(s) if !s.trim().is_empty() => Value::String(s.trim().to_string()),
        _ => Value::String(source.url()),
    }
}

/// Normalizes a phone number to `DDD-DDD-DDDD`. Anything that does not reduce
/// to exactly ten digits is rejected.
pub fn clean_phone_number(value: &Value) -> Option<String> {
    let digits: String = cell_text(value).chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        Some(format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]))
    } else {
        None
    }
}

/// Trims and title-cases a string: a cased letter is upper-cased when it
/// follows an uncased character and lower-cased otherwise.
pub fn clean_string(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_cased = false;

    for c in value.trim().chars() {
        if c.is_lowercase() || c.is_uppercase() {
            if previous_cased {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            result.push(c);
            previous_cased = false;
        }
    }

    result
}

/// Rounds floats to two decimal places. Integers and non-numeric values pass
/// through unchanged.
pub fn clean_numerical(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(round_to_cents)
            .and_then(Number::from_f64)
            .map_or_else(|| value.clone(), Value::Number),
        other => other.clone(),
    }
}

/// Rounds to two decimals against the exact decimal value of `f`, with exact
/// halves going to the even neighbour (`2.675` is below the half, `0.125` is not).
fn round_to_cents(f: f64) -> f64 {
    // A double sits exactly on a half-cent only when it is an odd multiple of 1/8.
    if (f * 8.0).fract() == 0.0 && (f * 4.0).fract() != 0.0 {
        return (f * 100.0).round_ties_even() / 100.0;
    }
    format!("{:.2}", f).parse().unwrap_or(f)
}

// Text form of a cell as used by pattern checks.
fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Bool(true) => Cow::Borrowed("True"),
        Value::Bool(false) => Cow::Borrowed("False"),
        Value::Null => Cow::Borrowed("None"),
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Deterministic stand-in for the faker: counts calls so tests can tell
    /// fresh values apart.
    #[derive(Default)]
    struct StubSource {
        calls: usize,
        answers: Vec<&'static str>,
    }

    impl SyntheticSource for StubSource {
        fn full_name(&mut self) -> String {
            self.calls += 1;
            format!("Synthetic Person {}", self.calls)
        }

        fn email(&mut self) -> String {
            self.calls += 1;
            format!("user{}@example.org", self.calls)
        }

        fn url(&mut self) -> String {
            self.calls += 1;
            format!("https://www.site{}.com/", self.calls)
        }

        fn yes_no(&mut self) -> &'static str {
            self.calls += 1;
            self.answers.pop().unwrap_or("Yes")
        }
    }

    fn anonymize(column: &str, value: Value) -> Value {
        let anonymizer = FieldAnonymizer::new().unwrap();
        let mut source = StubSource::default();
        anonymizer.anonymize_value(column, &value, &mut source)
    }

    #[test]
    fn test_null_preserved_for_every_column_kind() {
        for column in ["Full Name", "Email", "Website", "Phone", "Worked Directly?", "Score"] {
            assert_eq!(anonymize(column, Value::Null), Value::Null, "column {}", column);
        }
    }

    #[test]
    fn test_null_does_not_consume_randomness() {
        let anonymizer = FieldAnonymizer::new().unwrap();
        let mut source = StubSource::default();

        anonymizer.anonymize_value("Name", &Value::Null, &mut source);
        anonymizer.anonymize_value("Worked Directly", &Value::Null, &mut source);

        assert_eq!(source.calls, 0);
    }

    #[test]
    fn test_name_is_synthetic_and_fresh() {
        let anonymizer = FieldAnonymizer::new().unwrap();
        let mut source = StubSource::default();
        let input = json!("John Doe");

        let first = anonymizer.anonymize_value("Full Name", &input, &mut source);
        let second = anonymizer.anonymize_value("Full Name", &input, &mut source);

        assert_eq!(first, json!("Synthetic Person 1"));
        assert_eq!(second, json!("Synthetic Person 2"));
        assert_eq!(anonymize("Name", json!(42)), json!("Synthetic Person 1"));
    }

    #[test]
    fn test_valid_email_kept() {
        assert_eq!(anonymize("Contact Email", json!("a@b.com")), json!("a@b.com"));
        assert_eq!(
            anonymize("email", json!("first.last@mail.example.co")),
            json!("first.last@mail.example.co")
        );
    }

    #[test]
    fn test_invalid_email_replaced() {
        let replaced = anonymize("Contact Email", json!("not-an-email"));
        let text = replaced.as_str().unwrap();
        let (_, domain) = text.split_once('@').unwrap();
        assert!(domain.contains('.'));

        assert_eq!(anonymize("Email", json!("a@b")), json!("user1@example.org"));
        assert_eq!(anonymize("Email", json!(12345)), json!("user1@example.org"));
    }

    #[test]
    fn test_website_trimmed_or_replaced() {
        assert_eq!(anonymize("Website", json!("  acme.io  ")), json!("acme.io"));
        assert_eq!(anonymize("Website", json!("   ")), json!("https://www.site1.com/"));
        assert_eq!(anonymize("Website", json!(7)), json!("https://www.site1.com/"));
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(anonymize("Phone", json!("(555) 123-4567")), json!("555-123-4567"));
        assert_eq!(anonymize("Phone", json!("555.123.4567")), json!("555-123-4567"));
        assert_eq!(anonymize("Phone", json!(5551234567u64)), json!("555-123-4567"));
    }

    #[test]
    fn test_phone_wrong_digit_count_dropped() {
        assert_eq!(anonymize("Phone", json!("12345")), Value::Null);
        assert_eq!(anonymize("Phone", json!("+1 (555) 123-4567")), Value::Null);
        assert_eq!(anonymize("Phone", json!(5551234567.0)), Value::Null);
        assert_eq!(anonymize("Phone", json!(true)), Value::Null);
    }

    #[test]
    fn test_worked_directly_is_yes_or_no() {
        let anonymizer = FieldAnonymizer::new().unwrap();
        let mut source = StubSource {
            calls: 0,
            answers: vec!["No", "Yes"],
        };

        let first = anonymizer.anonymize_value("Worked Directly?", &json!("maybe"), &mut source);
        let second = anonymizer.anonymize_value("Worked Directly?", &json!(1), &mut source);

        assert_eq!(first, json!("Yes"));
        assert_eq!(second, json!("No"));
    }

    #[test]
    fn test_generic_string_cleanup() {
        assert_eq!(anonymize("City", json!("  hello world  ")), json!("Hello World"));
        assert_eq!(anonymize("Notes", json!("o'neil and sons")), json!("O'Neil And Sons"));
        assert_eq!(anonymize("Code", json!("abc123def")), json!("Abc123Def"));
        assert_eq!(anonymize("Title", json!("SHOUTING")), json!("Shouting"));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_generic_numeric_rounding() {
        assert_eq!(anonymize("Score", json!(3.14159)), json!(3.14));
        assert_eq!(anonymize("Score", json!(-2.005001)), json!(-2.01));
        assert_eq!(anonymize("Count", json!(7)), json!(7));
    }

    #[test]
    fn test_rounding_follows_exact_decimal_value() {
        assert_eq!(clean_numerical(&json!(2.675)), json!(2.67));
        assert_eq!(clean_numerical(&json!(1.115)), json!(1.11));
        assert_eq!(clean_numerical(&json!(0.125)), json!(0.12));
        assert_eq!(clean_numerical(&json!(0.375)), json!(0.38));
        assert_eq!(clean_numerical(&json!(-0.125)), json!(-0.12));
        assert_eq!(clean_numerical(&json!(1.005001)), json!(1.01));
        assert_eq!(clean_numerical(&json!(12345678.9)), json!(12345678.9));
    }

    #[test]
    fn test_generic_structured_values_unchanged() {
        assert_eq!(anonymize("Active", json!(true)), json!(true));
        assert_eq!(anonymize("Tags", json!(["a", "b"])), json!(["a", "b"]));
        assert_eq!(anonymize("Meta", json!({"k": "v"})), json!({"k": "v"}));
    }

    #[test]
    fn test_clean_string_edge_cases() {
        assert_eq!(clean_string(""), "");
        assert_eq!(clean_string("   "), "");
        assert_eq!(clean_string("élan vital"), "Élan Vital");
        assert_eq!(clean_string("中abc"), "中Abc");
        assert_eq!(clean_string("x中y"), "X中Y");
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_table_preserves_shape() {
        let anonymizer = FieldAnonymizer::new().unwrap();
        let mut source = StubSource::default();
        let data = json!([
            {"Name": "John Doe", "Phone": "555-123-4567", "Score": 3.14159},
            {"Phone": null, "City": " paris "},
            {}
        ]);
        let table = Table::from_json_data(Some(&data)).unwrap();

        let output = anonymizer.pseudonymize_table(&table, &mut source);

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!([
                {"Name": "Synthetic Person 1", "Phone": "555-123-4567", "Score": 3.14},
                {"Phone": null, "City": "Paris"},
                {}
            ])
        );
        let keys: Vec<&String> = output.rows()[0].keys().collect();
        assert_eq!(keys, vec!["Name", "Phone", "Score"]);
    }
}
