// Typed, path-aware access to one object node of the raw spec tree

use crate::data::Value;
use crate::error::{PlotError, Result};
use serde_json::{Map, Value as Json};
use tracing::warn;

/// Read-only view over a JSON object that reports errors with the node path
#[derive(Debug, Clone)]
pub struct Options<'a> {
    map: &'a Map<String, Json>,
    path: String,
}

impl<'a> Options<'a> {
    pub fn new(value: &'a Json, path: &str) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| PlotError::spec(display_path(path), "Expected an object"))?;
        Ok(Self { map, path: path.to_string() })
    }

    pub fn path(&self) -> &str {
        display_path(&self.path)
    }

    pub fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn error(&self, key: &str, message: impl Into<String>) -> PlotError {
        PlotError::spec(self.child_path(key), message)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a String> {
        self.map.keys()
    }

    /// Value under `key`; JSON null counts as absent
    pub fn get(&self, key: &str) -> Option<&'a Json> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(s.clone())),
            Some(Json::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(self.error(key, "Expected a string")),
        }
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Json::Number(n)) => Ok(n.as_f64()),
            Some(_) => Err(self.error(key, "Expected a number")),
        }
    }

    pub fn usize(&self, key: &str) -> Result<Option<usize>> {
        match self.f64(key)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as usize)),
            Some(n) => Err(self.error(key, format!("Expected a non-negative integer, got {}", n))),
        }
    }

    pub fn i32(&self, key: &str) -> Result<Option<i32>> {
        match self.f64(key)? {
            None => Ok(None),
            Some(n) if n.fract() == 0.0 => Ok(Some(n as i32)),
            Some(n) => Err(self.error(key, format!("Expected an integer, got {}", n))),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Json::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.error(key, "Expected true or false")),
        }
    }

    pub fn list(&self, key: &str) -> Result<Option<&'a Vec<Json>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Json::Array(items)) => Ok(Some(items)),
            Some(_) => Err(self.error(key, "Expected a list")),
        }
    }

    pub fn object(&self, key: &str) -> Result<Option<Options<'a>>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => Options::new(value, &self.child_path(key)).map(Some),
        }
    }

    /// A list of scalar values
    pub fn values(&self, key: &str) -> Result<Option<Vec<Value>>> {
        match self.list(key)? {
            None => Ok(None),
            Some(items) => items
                .iter()
                .map(|item| {
                    Value::from_json(item).ok_or_else(|| self.error(key, "Expected a list of scalar values"))
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
        }
    }

    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>> {
        match self.list(key)? {
            None => Ok(None),
            Some(items) => items
                .iter()
                .map(|item| item.as_f64().ok_or_else(|| self.error(key, "Expected a list of numbers")))
                .collect::<Result<Vec<_>>>()
                .map(Some),
        }
    }

    /// A single string or a list of strings
    pub fn strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Json::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Json::String(s) => Ok(s.clone()),
                    _ => Err(self.error(key, "Expected a list of strings")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(self.error(key, "Expected a string or a list of strings")),
        }
    }

    /// Log keys that are neither in `recognized` nor accepted by `extra`
    pub fn warn_unknown(&self, recognized: &[&str], extra: impl Fn(&str) -> bool) {
        for key in self.map.keys() {
            if !recognized.contains(&key.as_str()) && !extra(key) {
                warn!(path = %self.child_path(key), "ignoring unknown option");
            }
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
