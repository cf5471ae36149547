//! Canonical request parameters.
//!
//! `Params` is a nested string-keyed configuration that flattens into an
//! `application/x-www-form-urlencoded` body: nested maps become `parent[key]`,
//! lists become `parent[key][i]`. The encoded pairs are sorted, so equal
//! inputs always produce byte-identical output.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::app_error::AppError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("type mismatch for parameter {key:?}: {found} is not a map, list or scalar")]
    TypeMismatch { key: String, found: &'static str },
}

impl From<ParamsError> for AppError {
    fn from(err: ParamsError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParamValue>),
    Map(Params),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode into the canonical form used for request bodies.
    pub fn encode(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        self.flatten_into("", &mut pairs);
        pairs.sort();
        pairs.join("&")
    }

    fn flatten_into(&self, parent: &str, out: &mut Vec<String>) {
        for (key, value) in &self.0 {
            let key = if parent.is_empty() {
                key.clone()
            } else {
                format!("{}[{}]", parent, key)
            };
            value.flatten_into(&key, out);
        }
    }
}

impl ParamValue {
    fn flatten_into(&self, key: &str, out: &mut Vec<String>) {
        match self {
            ParamValue::Map(params) => params.flatten_into(key, out),
            ParamValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.flatten_into(&format!("{}[{}]", key, i), out);
                }
            }
            scalar => out.push(format!("{}={}", key, escape(&scalar.scalar_text()))),
        }
    }

    fn scalar_text(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::List(_) | ParamValue::Map(_) => String::new(),
        }
    }
}

fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// `path` is the bracketed key of `value`, used to name it in errors.
fn value_from_json(path: &str, value: serde_json::Value) -> Result<ParamValue, ParamsError> {
    Ok(match value {
        serde_json::Value::String(s) => ParamValue::Str(s),
        serde_json::Value::Bool(b) => ParamValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => ParamValue::Int(i),
            None => ParamValue::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::Array(items) => ParamValue::List(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| value_from_json(&format!("{}[{}]", path, i), item))
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(map) => ParamValue::Map(params_from_json(Some(path), map)?),
        serde_json::Value::Null => {
            return Err(ParamsError::TypeMismatch {
                key: path.to_string(),
                found: "null",
            });
        }
    })
}

fn params_from_json(
    parent: Option<&str>,
    map: serde_json::Map<String, serde_json::Value>,
) -> Result<Params, ParamsError> {
    let mut params = Params::new();
    for (key, value) in map {
        let path = match parent {
            Some(parent) => format!("{}[{}]", parent, key),
            None => key.clone(),
        };
        let converted = value_from_json(&path, value)?;
        params.insert(key, converted);
    }
    Ok(params)
}

impl TryFrom<serde_json::Value> for Params {
    type Error = ParamsError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => params_from_json(None, map),
            other => Err(ParamsError::TypeMismatch {
                key: String::new(),
                found: json_kind(&other),
            }),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Map(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}
