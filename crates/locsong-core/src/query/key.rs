use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    /// A parameter object, flattened to sorted `name → value` pairs.
    Params(BTreeMap<String, ParamValue>),
}

/// A single parameter value. Strings and other JSON values never compare
/// equal, so `{page: 1}` and `{page: "1"}` stay distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Str(String),
    /// Any non-string value, in its compact JSON form.
    Json(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Json(json) => f.write_str(json),
        }
    }
}

impl KeyPart {
    /// Normalise a serializable parameter struct.
    ///
    /// Field order never matters, and `None`/null fields are dropped, so
    /// `{page: 1, limit: 24}` and `{limit: 24, page: 1, sort: None}` are
    /// the same part.
    pub fn params<P: Serialize + ?Sized>(params: &P) -> Self {
        let value = match serde_json::to_value(params) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "query params are not serializable");
                Value::Null
            }
        };

        let mut map = BTreeMap::new();
        if let Value::Object(fields) = value {
            for (name, value) in fields {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        map.insert(name, ParamValue::Str(s));
                    }
                    other => {
                        map.insert(name, ParamValue::Json(other.to_string()));
                    }
                }
            }
        }
        Self::Params(map)
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for KeyPart {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Params(map) => {
                write!(f, "{{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Cache identity of a query: namespace, resource, then the identifying
/// arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(namespace: impl Into<KeyPart>) -> Self {
        Self(vec![namespace.into()])
    }

    pub fn push(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn with_params<P: Serialize + ?Sized>(mut self, params: &P) -> Self {
        self.0.push(KeyPart::params(params));
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Whether `prefix` matches this key's leading parts.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, "]")
    }
}
