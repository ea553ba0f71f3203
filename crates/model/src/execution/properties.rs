use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form backend options passed through to a connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    inner: HashMap<String, Value>,
}

impl Properties {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.inner.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.inner.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.inner.get(key).and_then(|v| match v {
            Value::Boolean(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.inner.get(key).and_then(|v| match v {
            Value::Int(n) => usize::try_from(*n).ok(),
            Value::Uint(n) => usize::try_from(*n).ok(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters_accept_strings() {
        let props = Properties::new()
            .with("insert_batch_size", "250")
            .with("create_table", false);

        assert_eq!(props.get_usize("insert_batch_size"), Some(250));
        assert_eq!(props.get_bool("create_table"), Some(false));
        assert_eq!(props.get_usize("missing"), None);
    }
}
