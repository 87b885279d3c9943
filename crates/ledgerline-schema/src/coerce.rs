//! # Query-String Coercion
//!
//! Query parameters arrive as text. Before validation each value is turned
//! into the JSON type it most plausibly denotes:
//!
//! | Raw value            | Coerced to                 |
//! |----------------------|----------------------------|
//! | contains `,`         | list of strings            |
//! | `true` / `false`     | boolean                    |
//! | `-?[0-9]+`           | integer (if it fits `i64`) |
//! | `-?[0-9]*.[0-9]+`    | number                     |
//! | anything else        | string                     |
//!
//! A key given more than once becomes a list of its coerced values.

use serde_json::{Map, Number, Value};

/// Coerce one raw query value.
pub fn coerce_query_value(raw: &str) -> Value {
    if raw.contains(',') {
        return Value::Array(
            raw.split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        );
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if is_integer_literal(raw) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    if is_float_literal(raw) {
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Parse and coerce a raw query string (without the leading `?`) into a
/// JSON object.
pub fn parse_query(query: &str) -> Value {
    let mut object = Map::new();
    for (key, raw) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = coerce_query_value(&raw);
        match object.remove(key.as_ref()) {
            None => {
                object.insert(key.into_owned(), value);
            }
            Some(Value::Array(mut existing)) => {
                extend(&mut existing, value);
                object.insert(key.into_owned(), Value::Array(existing));
            }
            Some(previous) => {
                let mut list = vec![previous];
                extend(&mut list, value);
                object.insert(key.into_owned(), Value::Array(list));
            }
        }
    }
    Value::Object(object)
}

fn extend(list: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(items) => list.extend(items),
        other => list.push(other),
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let Some((int_part, frac_part)) = unsigned.split_once('.') else {
        return false;
    };
    !frac_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}
