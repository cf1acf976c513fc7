use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Data carried by an open overlay. Keys are kept sorted so the encoded
/// fragment of a given payload is always the same string.
pub type Payload = BTreeMap<String, PayloadValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PayloadValue {
    Text(String),
    Number(f64),
    Object(Payload),
}

impl PartialEq for PayloadValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b).is_eq(),
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PayloadValue {}

impl PayloadValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PayloadValue::Number(n) => Some(*n),
            PayloadValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Payload> {
        match self {
            PayloadValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Flat string form used in query strings. Objects become `k:v,k:v`.
    pub fn to_query_value(&self) -> String {
        match self {
            PayloadValue::Text(s) => s.clone(),
            PayloadValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            PayloadValue::Number(n) => n.to_string(),
            PayloadValue::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{k}:{}", v.to_query_value()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Text(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Text(s)
    }
}

impl From<f64> for PayloadValue {
    fn from(n: f64) -> Self {
        PayloadValue::Number(n)
    }
}

/// Build a payload from `(key, value)` pairs.
pub fn payload<K, V, I>(pairs: I) -> Payload
where
    K: Into<String>,
    V: Into<PayloadValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

pub fn text<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(PayloadValue::as_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_total_order() {
        assert_eq!(PayloadValue::Number(f64::NAN), PayloadValue::Number(f64::NAN));
        assert_ne!(PayloadValue::Number(1.0), PayloadValue::Text("1".into()));
    }

    #[test]
    fn query_value_forms() {
        assert_eq!(PayloadValue::Number(3.0).to_query_value(), "3");
        assert_eq!(PayloadValue::Number(2.5).to_query_value(), "2.5");
        let nested = PayloadValue::Object(payload([("a", "x"), ("b", "y")]));
        assert_eq!(nested.to_query_value(), "a:x,b:y");
    }

    #[test]
    fn text_numbers_parse() {
        assert_eq!(PayloadValue::from("42").as_number(), Some(42.0));
        assert_eq!(PayloadValue::from("forty").as_number(), None);
    }
}
