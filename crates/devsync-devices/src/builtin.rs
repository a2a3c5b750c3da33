//! Well-known device kinds.
//!
//! The hub's remote clients group and render devices by type id; these are
//! the pairs they understand out of the box. Drivers are free to register
//! other type ids, they just render generically.

use crate::model::DeviceIdentity;

/// A known device type id and its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinKind {
    pub device_type: &'static str,
    pub name: &'static str,
}

/// Device kinds known to remote clients.
pub const BUILTIN_KINDS: &[BuiltinKind] = &[
    BuiltinKind {
        device_type: "humidity-sensor",
        name: "Humidity sensor",
    },
    BuiltinKind {
        device_type: "light-sensor",
        name: "Light sensor",
    },
    BuiltinKind {
        device_type: "movement-sensor",
        name: "Motion sensor",
    },
    BuiltinKind {
        device_type: "pressure-sensor",
        name: "Pressure sensor",
    },
    BuiltinKind {
        device_type: "temperature-sensor",
        name: "Temperature sensor",
    },
];

/// Look up the display name for a known device type id.
pub fn display_name(device_type: &str) -> Option<&'static str> {
    BUILTIN_KINDS
        .iter()
        .find(|kind| kind.device_type == device_type)
        .map(|kind| kind.name)
}

/// Build an identity for a known device type, labeled with the physical
/// part name.
pub fn identity(device_type: &str, label: impl Into<String>) -> Option<DeviceIdentity> {
    display_name(device_type)
        .map(|name| DeviceIdentity::new(device_type, name).with_label(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_lookup() {
        assert_eq!(display_name("light-sensor"), Some("Light sensor"));
        assert_eq!(display_name("movement-sensor"), Some("Motion sensor"));
        assert_eq!(display_name("flux-capacitor"), None);
    }

    #[test]
    fn test_identity_for_builtin() {
        let identity = identity("light-sensor", "BH1750").unwrap();
        assert_eq!(identity.name, "Light sensor");
        assert_eq!(identity.label.as_deref(), Some("BH1750"));
    }
}
