//! The per-execution context accumulator.
//!
//! A key→value store seeded from the execution's input and grown with one
//! entry per completed step (keyed by step id), so later steps can reference
//! earlier results through `{{key}}` templating.  Owned by exactly one
//! runner and discarded when the run ends.

use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context from the submission input plus the invoking user.
    ///
    /// Object inputs contribute their top-level fields; any other non-null
    /// input is kept whole under the `input` key.
    pub fn seeded(input: &Value, user_id: Uuid) -> Self {
        let mut values = Map::new();
        match input {
            Value::Object(fields) => {
                for (key, value) in fields {
                    values.insert(key.clone(), value.clone());
                }
            }
            Value::Null => {}
            other => {
                values.insert("input".to_owned(), other.clone());
            }
        }
        values.insert("user_id".to_owned(), Value::String(user_id.to_string()));
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Stringify the value under `key`: strings verbatim, everything else
    /// as compact JSON.  `None` when the key is absent.
    pub fn render(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// The full accumulator as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
