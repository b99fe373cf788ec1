//! Typed evaluation of string query values.
//!
//! URL query values arrive as strings. [`eval_query`] turns the ones that are
//! unambiguously booleans, nulls or numbers into typed values and leaves
//! everything else untouched.

use crate::query::Params;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use url::form_urlencoded;

/// Largest integer a JS number holds exactly.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Split a URL or bare query string into decoded pairs. Later keys win.
pub fn parse_query(input: &str) -> IndexMap<String, String> {
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None if input.contains('=') => input,
        None => "",
    };
    let query = query.split('#').next().unwrap_or_default();

    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Convert every value to its most specific primitive.
///
/// Each key is evaluated on its own; a value that cannot be converted is kept
/// as a string.
pub fn eval_query(query: &IndexMap<String, String>) -> Params {
    query
        .iter()
        .map(|(key, raw)| (key.clone(), eval_value(raw)))
        .collect()
}

/// Convert one value, falling back to the original string.
pub fn eval_value(raw: &str) -> Value {
    match eval_primitive(raw) {
        Some(value) => value,
        None => Value::String(raw.to_string()),
    }
}

fn eval_primitive(raw: &str) -> Option<Value> {
    match raw.trim() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        "" => None,
        text => eval_number(text).map(Value::Number),
    }
}

/// Parse a JSON-grammar number into its canonical value.
///
/// Integral values come back as integers (`1e2` is `100`, `2.0` is `2`) and
/// fractions in shortest form (`1.50` is `1.5`).
fn eval_number(text: &str) -> Option<Number> {
    let number: Number = text.parse().ok()?;

    if let Some(int) = number.as_i64() {
        return (int.unsigned_abs() <= MAX_SAFE_INTEGER).then(|| Number::from(int));
    }
    if number.as_u64().is_some() {
        return None;
    }

    // Integers too wide for i64/u64 would be rounded by any float consumer.
    if !text.contains(['.', 'e', 'E']) {
        return None;
    }
    let float: f64 = text.parse().ok()?;
    if !float.is_finite() {
        return None;
    }
    if float.fract() == 0.0 && float.abs() <= MAX_SAFE_INTEGER as f64 {
        return Some(Number::from(float as i64));
    }
    Number::from_f64(float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_eval_query_basic() {
        let evaluated = eval_query(&query(&[("a", "true"), ("b", "42"), ("c", "hello")]));
        assert_eq!(Value::Object(evaluated), json!({"a": true, "b": 42, "c": "hello"}));
    }

    #[test]
    fn test_bad_value_does_not_affect_others() {
        let evaluated = eval_query(&query(&[
            ("ok", "false"),
            ("broken", "{\"unterminated"),
            ("n", "-3.5"),
        ]));
        assert_eq!(evaluated["ok"], json!(false));
        assert_eq!(evaluated["broken"], json!("{\"unterminated"));
        assert_eq!(evaluated["n"], json!(-3.5));
    }

    #[test]
    fn test_ambiguous_numbers_stay_strings() {
        for raw in ["007", "0x10", "NaN", "Infinity", "+5", "1e400", "1.", ".5"] {
            assert_eq!(eval_value(raw), json!(raw), "{raw}");
        }
    }

    #[test]
    fn test_numbers_are_canonical() {
        assert_eq!(eval_value("1e2"), json!(100));
        assert_eq!(eval_value("1e2").as_i64(), Some(100));
        assert_eq!(eval_value("2.0"), json!(2));
        assert_eq!(eval_value("-0.0"), json!(0));
        assert_eq!(eval_value("1.50"), json!(1.5));
        assert_eq!(eval_value("2.5E-1"), json!(0.25));
        assert_eq!(eval_value("1.50").to_string(), "1.5");
    }

    #[test]
    fn test_unsafe_integers_stay_strings() {
        assert_eq!(eval_value("9007199254740991"), json!(9007199254740991u64));
        assert_eq!(eval_value("9007199254740992"), json!("9007199254740992"));
        assert_eq!(eval_value("-9007199254740992"), json!("-9007199254740992"));
        assert_eq!(
            eval_value("123456789012345678901234567890"),
            json!("123456789012345678901234567890")
        );
    }

    #[test]
    fn test_whitespace_and_null() {
        assert_eq!(eval_value(" 12 "), json!(12));
        assert_eq!(eval_value("null"), Value::Null);
        assert_eq!(eval_value(""), json!(""));
        assert_eq!(eval_value("True"), json!("True"));
    }

    #[test]
    fn test_structured_values_stay_strings() {
        assert_eq!(eval_value("[1,2]"), json!("[1,2]"));
        assert_eq!(eval_value("{}"), json!("{}"));
        assert_eq!(eval_value("\"quoted\""), json!("\"quoted\""));
    }

    #[test]
    fn test_parse_query_from_url() {
        let parsed = parse_query("https://x/y?page=2&name=a%20b&page=3#frag");
        assert_eq!(parsed.get("page").map(String::as_str), Some("3"));
        assert_eq!(parsed.get("name").map(String::as_str), Some("a b"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_query_bare() {
        let parsed = parse_query("a=1&b=true");
        let evaluated = eval_query(&parsed);
        assert_eq!(Value::Object(evaluated), json!({"a": 1, "b": true}));
        assert!(parse_query("https://x/y").is_empty());
    }
}
