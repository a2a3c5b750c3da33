//! Typed device values.
//!
//! A [`DeviceValue`] is the unit of state exchanged between the hub and a
//! device: the hub requests one, the executor applies it, and the device
//! acknowledges it (possibly adjusted).

use serde::{Deserialize, Serialize};

/// A value that can be requested from or acknowledged by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl DeviceValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
        }
    }
}

/// Canonical string form, used as the final argument of script invocations.
impl std::fmt::Display for DeviceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for DeviceValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for DeviceValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for DeviceValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for DeviceValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for DeviceValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let int_val = DeviceValue::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));

        let string_val = DeviceValue::from("on");
        assert_eq!(string_val.as_str(), Some("on"));
        assert_eq!(string_val.as_i64(), None);

        assert_eq!(DeviceValue::Boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn test_string_form() {
        assert_eq!(DeviceValue::Integer(5).to_string(), "5");
        assert_eq!(DeviceValue::Float(21.5).to_string(), "21.5");
        assert_eq!(DeviceValue::Boolean(false).to_string(), "false");
        assert_eq!(DeviceValue::from("dim").to_string(), "dim");
    }
}
