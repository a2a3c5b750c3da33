//! Runtime-adjustable device configuration.
//!
//! Each device owns a [`ConfigurationRegistry`] of named, typed fields that
//! a remote client may read and update while the device is running. Fields
//! are declared once, at device construction, with an explicit type tag;
//! updates are validated against the declared type before acceptance and
//! are never partially applied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::DeviceError;

/// Declared type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Integer,
    LongInteger,
    String,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::LongInteger => write!(f, "long-integer"),
            Self::String => write!(f, "string"),
        }
    }
}

/// Value of a configuration field.
///
/// The variant fixes the field's [`FieldType`] at declaration time; the
/// type of a field never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Integer(i32),
    Long(i64),
    String(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::Long(_) => FieldType::LongInteger,
            Self::String(_) => FieldType::String,
        }
    }
}

/// String form, used when building executor argument lists.
impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// Description of one field, for remote display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Declared type
    pub field_type: FieldType,
    /// Current value
    pub value: FieldValue,
}

/// Callback invoked synchronously after a field update is accepted.
///
/// The callback receives the field name and the new value. Updating a field
/// never touches acknowledged device state on its own; a component that
/// needs to reconcile state in response must do so explicitly from here
/// (typically by handing the change to its controller).
pub type ChangeCallback = Arc<dyn Fn(&str, &FieldValue) + Send + Sync>;

struct ConfigField {
    name: String,
    description: String,
    value: FieldValue,
}

/// Registry of a device's configuration fields.
///
/// Fields keep their declaration order; snapshots and executor argument
/// lists are built in that order.
#[derive(Default)]
pub struct ConfigurationRegistry {
    fields: Vec<ConfigField>,
    index: HashMap<String, usize>,
    on_change: Option<ChangeCallback>,
}

impl ConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with its description and default value.
    ///
    /// The default's variant fixes the field's type for its lifetime.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<FieldValue>,
    ) -> Result<(), DeviceError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DeviceError::AlreadyExists(name));
        }
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(ConfigField {
            name,
            description: description.into(),
            value: default.into(),
        });
        Ok(())
    }

    /// Get the current value of a field.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.index.get(name).map(|&i| self.fields[i].value.clone())
    }

    /// Update a field.
    ///
    /// Fails with [`DeviceError::UnknownField`] or
    /// [`DeviceError::TypeMismatch`] without touching the stored value. On
    /// success the registered change-callback (if any) runs synchronously
    /// before this returns.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), DeviceError> {
        let value = value.into();
        let Some(&i) = self.index.get(name) else {
            return Err(DeviceError::UnknownField(name.to_string()));
        };
        let field = &mut self.fields[i];
        let expected = field.value.field_type();
        if value.field_type() != expected {
            return Err(DeviceError::TypeMismatch {
                field: name.to_string(),
                expected,
                actual: value.field_type(),
            });
        }
        field.value = value;
        if let Some(callback) = &self.on_change {
            callback(&self.fields[i].name, &self.fields[i].value);
        }
        Ok(())
    }

    /// Register the change-callback. Replaces any previous one.
    pub fn set_change_callback(&mut self, callback: ChangeCallback) {
        self.on_change = Some(callback);
    }

    /// Snapshot all values in declaration order.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            values: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect(),
        }
    }

    /// Describe all fields for remote display, in declaration order.
    pub fn describe(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.name.clone(),
                description: f.description.clone(),
                field_type: f.value.field_type(),
                value: f.value.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Frozen copy of a device's configuration, taken when a request is issued.
///
/// Config changes made while an executor call is in flight never leak into
/// it; the snapshot is what the executor sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    values: Vec<(String, FieldValue)>,
}

impl ConfigSnapshot {
    /// Values as strings, in declaration order (script argument form).
    pub fn args(&self) -> Vec<String> {
        self.values.iter().map(|(_, v)| v.to_string()).collect()
    }

    /// Look up one value by field name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over (name, value) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> ConfigurationRegistry {
        let mut config = ConfigurationRegistry::new();
        config
            .declare("parameter", "Parameter passed to the script", "12")
            .unwrap();
        config.declare("retries", "Attempt count", 3i32).unwrap();
        config
    }

    #[test]
    fn test_declare_and_get() {
        let config = registry();
        assert_eq!(config.get("parameter"), Some(FieldValue::String("12".to_string())));
        assert_eq!(config.get("retries"), Some(FieldValue::Integer(3)));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn test_duplicate_declare_rejected() {
        let mut config = registry();
        assert!(matches!(
            config.declare("parameter", "again", "13"),
            Err(DeviceError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_set_validates_type() {
        let mut config = registry();
        // Wrong type leaves the stored value unchanged
        let err = config.set("retries", "three").unwrap_err();
        assert!(matches!(
            err,
            DeviceError::TypeMismatch {
                expected: FieldType::Integer,
                actual: FieldType::String,
                ..
            }
        ));
        assert_eq!(config.get("retries"), Some(FieldValue::Integer(3)));

        config.set("retries", 5i32).unwrap();
        assert_eq!(config.get("retries"), Some(FieldValue::Integer(5)));
    }

    #[test]
    fn test_set_unknown_field() {
        let mut config = registry();
        assert!(matches!(
            config.set("missing", 1i32),
            Err(DeviceError::UnknownField(_))
        ));
    }

    #[test]
    fn test_change_callback_runs_synchronously() {
        let mut config = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        config.set_change_callback(Arc::new(move |name, value| {
            assert_eq!(name, "parameter");
            assert_eq!(value, &FieldValue::String("42".to_string()));
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        config.set("parameter", "42").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A rejected update must not fire the callback
        let _ = config.set("retries", "oops");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snapshot_keeps_declaration_order() {
        let config = registry();
        let snapshot = config.snapshot();
        assert_eq!(snapshot.args(), vec!["12".to_string(), "3".to_string()]);
        assert_eq!(snapshot.get("retries"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn test_describe_for_remote_display() {
        let config = registry();
        let fields = config.describe();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "parameter");
        assert_eq!(fields[0].field_type, FieldType::String);
        assert_eq!(fields[1].description, "Attempt count");
    }
}
