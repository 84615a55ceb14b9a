use serde::Serialize;
use serde_json::{Map, Value};

/// A key/value attribute attached to a log record or a logger.
///
/// Values are JSON; an object value behaves like a nested group.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Attribute holding any serializable value. Values that fail to
    /// serialize are recorded as their error message.
    pub fn any<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        Self::new(key, value)
    }

    /// Attribute grouping other attributes under `key`.
    pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let map: Map<String, Value> = attrs.into_iter().map(|a| (a.key, a.value)).collect();
        Self::new(key, Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors() {
        assert_eq!(Attr::new("n", 1).value, json!(1));
        assert_eq!(Attr::new("s", "x").value, json!("x"));
        assert_eq!(Attr::any("v", &vec!["a", "b"]).value, json!(["a", "b"]));
    }

    #[test]
    fn test_group() {
        let attr = Attr::group("sub", [Attr::new("test", "test value")]);
        assert_eq!(attr.key, "sub");
        assert_eq!(attr.value, json!({"test": "test value"}));
    }
}
