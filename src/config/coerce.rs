//! Conversions from resolved JSON values into primitives.
//!
//! Every conversion goes through the plain textual form of a value (see
//! [Plain]) so that `"8"`, `8` and `8.0` all coerce to the same integer and
//! `"true"` and `true` to the same boolean. Malformed input never fails, the
//! `Option` returning functions yield `None` and callers pick the default.

use serde_json::{Number, Value};
use std::fmt::{Display, Formatter};

/// Human readable rendering of a JSON value. Not JSON.
///
/// Strings are written verbatim, `null` as `<nil>`, integral numbers without
/// fraction, arrays as `[a b c]` and objects as `{key:value other:value}`
/// with sorted keys.
pub struct Plain<'a>(pub &'a Value);

impl Display for Plain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Value::Null => write!(f, "<nil>"),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::Number(number) => write_number(f, number),
            Value::String(string) => write!(f, "{}", string),
            Value::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", Plain(item))?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                let mut entries: Vec<_> = fields.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));

                write!(f, "{{")?;
                for (index, (key, value)) in entries.into_iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{}", key, Plain(value))?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_number(f: &mut Formatter<'_>, number: &Number) -> std::fmt::Result {
    if let Some(value) = number.as_i64() {
        write!(f, "{}", value)
    } else if let Some(value) = number.as_u64() {
        write!(f, "{}", value)
    } else if let Some(value) = number.as_f64() {
        // f64's Display already drops the fraction of integral values.
        write!(f, "{}", value)
    } else {
        write!(f, "{}", number)
    }
}

/// Parses the boolean literals `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parses a signed base-10 integer.
pub fn parse_int(text: &str) -> Option<i64> {
    text.parse::<i64>().ok()
}

/// Strings verbatim, `null` and absent values as `None`, everything else in
/// its [Plain] form.
pub fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(string) => Some(string.clone()),
        other => Some(Plain(other).to_string()),
    }
}

pub fn as_bool(value: Option<&Value>) -> Option<bool> {
    parse_bool(&Plain(value?).to_string())
}

pub fn as_int(value: Option<&Value>) -> Option<i64> {
    parse_int(&Plain(value?).to_string())
}

/// Arrays yield one string per element, strings are split at commas.
pub fn as_strings(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().map(|item| Plain(item).to_string()).collect()),
        Value::String(string) => Some(
            string
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect(),
        ),
        other => Some(vec![Plain(other).to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_rendering() {
        assert_eq!(Plain(&json!("yes")).to_string(), "yes");
        assert_eq!(Plain(&Value::Null).to_string(), "<nil>");
        assert_eq!(Plain(&json!(true)).to_string(), "true");
        assert_eq!(Plain(&json!(20)).to_string(), "20");
        assert_eq!(Plain(&json!(-3)).to_string(), "-3");
        assert_eq!(Plain(&json!(1.5)).to_string(), "1.5");
        assert_eq!(Plain(&json!(["a", 1, null])).to_string(), "[a 1 <nil>]");
        assert_eq!(
            Plain(&json!({"z": 1, "a": {"b": [true]}})).to_string(),
            "{a:{b:[true]} z:1}"
        );
    }

    #[test]
    fn integral_floats_render_as_integers() {
        let value: Value = serde_json::from_str("20.0").unwrap();
        assert_eq!(Plain(&value).to_string(), "20");
        assert_eq!(as_int(Some(&value)), Some(20));

        let value: Value = serde_json::from_str("1e3").unwrap();
        assert_eq!(as_int(Some(&value)), Some(1000));
    }

    #[test]
    fn bool_literals() {
        for literal in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(literal), Some(true), "{literal}");
        }
        for literal in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(literal), Some(false), "{literal}");
        }
        for literal in ["yes", "no", "tRUE", "", " true"] {
            assert_eq!(parse_bool(literal), None, "{literal}");
        }
    }

    #[test]
    fn bools_from_values() {
        assert_eq!(as_bool(Some(&json!(true))), Some(true));
        assert_eq!(as_bool(Some(&json!("false"))), Some(false));
        assert_eq!(as_bool(Some(&json!(1))), Some(true));
        assert_eq!(as_bool(Some(&json!("yes"))), None);
        assert_eq!(as_bool(Some(&json!([true]))), None);
        assert_eq!(as_bool(Some(&Value::Null)), None);
        assert_eq!(as_bool(None), None);
    }

    #[test]
    fn ints_from_values() {
        assert_eq!(as_int(Some(&json!(42))), Some(42));
        assert_eq!(as_int(Some(&json!("-7"))), Some(-7));
        assert_eq!(as_int(Some(&json!("+7"))), Some(7));
        assert_eq!(as_int(Some(&json!(1.5))), None);
        assert_eq!(as_int(Some(&json!("12abc"))), None);
        assert_eq!(as_int(Some(&json!(true))), None);
        assert_eq!(as_int(Some(&json!({"a": 1}))), None);
        assert_eq!(as_int(Some(&Value::Null)), None);
        assert_eq!(as_int(None), None);
    }

    #[test]
    fn strings_from_values() {
        assert_eq!(as_string(Some(&json!("yes"))), Some("yes".to_owned()));
        assert_eq!(as_string(Some(&json!(8))), Some("8".to_owned()));
        assert_eq!(as_string(Some(&json!([1, 2]))), Some("[1 2]".to_owned()));
        assert_eq!(as_string(Some(&Value::Null)), None);
        assert_eq!(as_string(None), None);
    }

    #[test]
    fn string_lists_from_values() {
        assert_eq!(
            as_strings(Some(&json!(["http://a:9200", "http://b:9200"]))),
            Some(vec!["http://a:9200".to_owned(), "http://b:9200".to_owned()])
        );
        assert_eq!(
            as_strings(Some(&json!("a, b,,c"))),
            Some(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
        );
        assert_eq!(as_strings(Some(&json!(5))), Some(vec!["5".to_owned()]));
        assert_eq!(as_strings(None), None);
    }
}
