//! Key-value preference backends.
//!
//! A backend stores a small set of native kinds ([`PreferenceValue`]) under
//! string keys. Richer types are mapped onto those kinds by
//! [`PreferenceCodec`](super::codec::PreferenceCodec).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// A value in one of the kinds every backend can store natively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PreferenceValue {
    Text(String),
    Bool(bool),
    Int(i32),
    Long(i64),
    #[serde(with = "real")]
    Float(f32),
    #[serde(with = "real")]
    Double(f64),
}

/// JSON has no `inf` or `NaN`, so non-finite floats are stored as text.
mod real {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::de::{self, DeserializeOwned, Unexpected};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub trait Real: Copy + Display + FromStr + Serialize + DeserializeOwned {
        fn finite(self) -> bool;
    }

    impl Real for f32 {
        fn finite(self) -> bool {
            self.is_finite()
        }
    }

    impl Real for f64 {
        fn finite(self) -> bool {
            self.is_finite()
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<F> {
        Number(F),
        Text(String),
    }

    pub fn serialize<F: Real, S: Serializer>(value: &F, serializer: S) -> Result<S::Ok, S::Error> {
        if value.finite() {
            value.serialize(serializer)
        } else {
            serializer.collect_str(value)
        }
    }

    pub fn deserialize<'de, F: Real, D: Deserializer<'de>>(deserializer: D) -> Result<F, D::Error> {
        match Repr::<F>::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => text.parse().map_err(|_| {
                de::Error::invalid_value(Unexpected::Str(&text), &"a number, inf, -inf or NaN")
            }),
        }
    }
}

impl PreferenceValue {
    /// Kind name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for PreferenceValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

impl_from!(String => Text, bool => Bool, i32 => Int, i64 => Long, f32 => Float, f64 => Double);

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

/// Durable key-value storage consumed by persisted subjects.
pub trait PreferenceBackend: Send + Sync {
    /// The stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError>;

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError>;

    /// Remove `key`; returns whether it was present.
    fn remove(&self, key: &str) -> Result<bool, BackendError>;

    fn clear(&self) -> Result<(), BackendError>;

    /// Every stored key, in no particular order.
    fn keys(&self) -> Result<Vec<String>, BackendError>;

    fn contains_key(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.get(key)?.is_some())
    }

    /// The stored value, or `default` when the key is absent.
    fn get_or(&self, key: &str, default: PreferenceValue) -> Result<PreferenceValue, BackendError> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

impl<B: PreferenceBackend + ?Sized> PreferenceBackend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), BackendError> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        (**self).keys()
    }

    fn contains_key(&self, key: &str) -> Result<bool, BackendError> {
        (**self).contains_key(key)
    }
}

// ─── MemoryPreferences ───────────────────────────────────────────────────────

/// In-process backend. Values live as long as the instance.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    entries: Mutex<HashMap<String, PreferenceValue>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl PreferenceBackend for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError> {
        self.entries.lock().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.entries.lock().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn contains_key(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.lock().contains_key(key))
    }
}

// ─── Namespaced ──────────────────────────────────────────────────────────────

/// Scopes every key under `"{namespace}."` on an inner backend.
///
/// `clear` and `keys` only see keys inside the namespace.
#[derive(Debug)]
pub struct Namespaced<B> {
    namespace: String,
    inner: B,
}

impl<B: PreferenceBackend> Namespaced<B> {
    pub fn new(namespace: impl Into<String>, inner: B) -> Self {
        Self {
            namespace: namespace.into(),
            inner,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}.{key}", self.namespace)
    }

    fn unscoped<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.namespace.as_str())?.strip_prefix('.')
    }
}

impl<B: PreferenceBackend> PreferenceBackend for Namespaced<B> {
    fn get(&self, key: &str) -> Result<Option<PreferenceValue>, BackendError> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), BackendError> {
        self.inner.set(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.remove(&self.scoped(key))
    }

    fn clear(&self) -> Result<(), BackendError> {
        for key in self.keys()? {
            self.inner.remove(&self.scoped(&key))?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self
            .inner
            .keys()?
            .iter()
            .filter_map(|key| self.unscoped(key).map(str::to_owned))
            .collect())
    }

    fn contains_key(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.contains_key(&self.scoped(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_basic_operations() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.is_empty());
        assert_eq!(prefs.get("k").unwrap(), None);
        assert_eq!(
            prefs.get_or("k", PreferenceValue::Int(3)).unwrap(),
            PreferenceValue::Int(3)
        );

        prefs.set("k", PreferenceValue::Bool(true)).unwrap();
        assert!(prefs.contains_key("k").unwrap());
        assert_eq!(prefs.get("k").unwrap(), Some(PreferenceValue::Bool(true)));
        assert_eq!(prefs.len(), 1);

        assert!(prefs.remove("k").unwrap());
        assert!(!prefs.remove("k").unwrap());
        prefs.set("a", PreferenceValue::Long(1)).unwrap();
        prefs.clear().unwrap();
        assert!(prefs.is_empty());
    }

    #[test]
    fn namespaced_keys_do_not_collide() {
        let shared = Arc::new(MemoryPreferences::new());
        let left = Namespaced::new("left", Arc::clone(&shared));
        let right = Namespaced::new("right", Arc::clone(&shared));

        left.set("theme", PreferenceValue::Text("dark".into())).unwrap();
        right.set("theme", PreferenceValue::Text("light".into())).unwrap();

        assert_eq!(
            left.get("theme").unwrap(),
            Some(PreferenceValue::Text("dark".into()))
        );
        assert_eq!(
            shared.get("right.theme").unwrap(),
            Some(PreferenceValue::Text("light".into()))
        );
        assert_eq!(left.namespace(), "left");
        assert_eq!(left.keys().unwrap(), vec!["theme".to_string()]);

        left.clear().unwrap();
        assert_eq!(left.get("theme").unwrap(), None);
        assert!(right.contains_key("theme").unwrap());
    }

    #[test]
    fn value_serializes_with_kind_tag() {
        let json = serde_json::to_string(&PreferenceValue::Long(7)).unwrap();
        assert_eq!(json, r#"{"kind":"long","value":7}"#);
        let back: PreferenceValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PreferenceValue::Long(7));
    }

    #[test]
    fn non_finite_floats_serialize_as_text() {
        let json = serde_json::to_string(&PreferenceValue::Double(f64::NEG_INFINITY)).unwrap();
        assert_eq!(json, r#"{"kind":"double","value":"-inf"}"#);
        let back: PreferenceValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PreferenceValue::Double(f64::NEG_INFINITY));

        let json = serde_json::to_string(&PreferenceValue::Float(f32::NAN)).unwrap();
        assert_eq!(json, r#"{"kind":"float","value":"NaN"}"#);
        let back: PreferenceValue = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, PreferenceValue::Float(v) if v.is_nan()));

        let bad = serde_json::from_str::<PreferenceValue>(r#"{"kind":"double","value":"lots"}"#);
        assert!(bad.is_err());
    }
}
