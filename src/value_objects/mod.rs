//! Graph value objects
//!
//! Value objects are immutable types that represent concepts of the on-chain graph.
//! They are compared by value rather than identity and encapsulate domain validation.

mod address;

pub use address::ChecksumAddress;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier returned by a contract
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the contract handed back an empty or zero identifier
            pub fn is_unset(&self) -> bool {
                is_zero_id(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a node registered in a GraphNode contract
    NodeId
);
string_id!(
    /// Identifier of an edge created by a GraphNode contract
    EdgeId
);
string_id!(
    /// Identifier of a node type in the registry
    NodeTypeId
);
string_id!(
    /// Identifier of an edge type in the registry
    EdgeTypeId
);
string_id!(
    /// Registry-assigned identifier of a property key for one node type
    PropertyId
);
string_id!(
    /// Identifier of a document attached to a node or edge
    DocumentId
);

/// Contracts return `""`, `"0"` or a zero-filled `bytes32` for "nothing here".
fn is_zero_id(raw: &str) -> bool {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    digits.chars().all(|c| c == '0')
}

/// Declared type of a property value
///
/// Discriminants match the contract enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PropertyType {
    /// No declared type, the registry or contract infers or rejects
    #[default]
    Invalid = 0,
    String = 1,
    Number = 2,
    Boolean = 3,
    Address = 4,
    Bytes = 5,
}

impl From<PropertyType> for u8 {
    fn from(value: PropertyType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for PropertyType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PropertyType::Invalid),
            1 => Ok(PropertyType::String),
            2 => Ok(PropertyType::Number),
            3 => Ok(PropertyType::Boolean),
            4 => Ok(PropertyType::Address),
            5 => Ok(PropertyType::Bytes),
            other => Err(format!("unknown property type discriminant {other}")),
        }
    }
}

/// Lifecycle status of an edge
///
/// `Pending` is the only non-terminal state. `Invalid` never gets stored, it is
/// what a lookup reports when no edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EdgeStatus {
    #[default]
    Invalid = 0,
    Pending = 1,
    Accepted = 2,
    Rejected = 3,
}

impl EdgeStatus {
    /// Accepted and Rejected edges can no longer be answered
    pub fn is_terminal(&self) -> bool {
        matches!(self, EdgeStatus::Accepted | EdgeStatus::Rejected)
    }
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeStatus::Invalid => "invalid",
            EdgeStatus::Pending => "pending",
            EdgeStatus::Rejected => "rejected",
            EdgeStatus::Accepted => "accepted",
        };
        f.write_str(name)
    }
}

impl From<EdgeStatus> for u8 {
    fn from(value: EdgeStatus) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for EdgeStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EdgeStatus::Invalid),
            1 => Ok(EdgeStatus::Pending),
            2 => Ok(EdgeStatus::Accepted),
            3 => Ok(EdgeStatus::Rejected),
            other => Err(format!("unknown edge status discriminant {other}")),
        }
    }
}

/// A typed key/value attribute of a node or edge
///
/// `property_id` stays unset until the owning builder resolves the key against
/// the registry for a concrete node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: serde_json::Value,
    pub declared_type: PropertyType,
    #[serde(default)]
    pub property_id: Option<PropertyId>,
}

impl Property {
    /// A property with no declared type
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::typed(key, value, PropertyType::Invalid)
    }

    /// A property with an explicit declared type
    pub fn typed(
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
        declared_type: PropertyType,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            declared_type,
            property_id: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.property_id.is_some()
    }

    /// Contract argument tuple `[propertyId, value, type]`
    pub(crate) fn to_resolved_arg(&self) -> Option<serde_json::Value> {
        let id = self.property_id.as_ref()?;
        Some(serde_json::json!([
            id.as_str(),
            self.value,
            u8::from(self.declared_type)
        ]))
    }

    /// Contract argument tuple `[key, value, type]`, used for edge properties
    /// which the contract keys by edge name instead of a registry id
    pub(crate) fn to_keyed_arg(&self) -> serde_json::Value {
        serde_json::json!([self.key, self.value, u8::from(self.declared_type)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_status_discriminants() {
        assert_eq!(u8::from(EdgeStatus::Invalid), 0);
        assert_eq!(u8::from(EdgeStatus::Pending), 1);
        assert_eq!(u8::from(EdgeStatus::Accepted), 2);
        assert_eq!(u8::from(EdgeStatus::Rejected), 3);
        assert_eq!(EdgeStatus::try_from(2).unwrap(), EdgeStatus::Accepted);
        assert_eq!(EdgeStatus::try_from(3).unwrap(), EdgeStatus::Rejected);
        assert!(EdgeStatus::try_from(4).is_err());
    }

    #[test]
    fn test_edge_status_terminal_states() {
        assert!(EdgeStatus::Accepted.is_terminal());
        assert!(EdgeStatus::Rejected.is_terminal());
        assert!(!EdgeStatus::Pending.is_terminal());
        assert!(!EdgeStatus::Invalid.is_terminal());
    }

    #[test]
    fn test_status_serializes_as_number() {
        let json = serde_json::to_value(EdgeStatus::Accepted).unwrap();
        assert_eq!(json, serde_json::json!(2));

        let status: EdgeStatus = serde_json::from_value(serde_json::json!(1)).unwrap();
        assert_eq!(status, EdgeStatus::Pending);
    }

    #[test]
    fn test_property_defaults_to_invalid_type() {
        let property = Property::new("name", "alice");
        assert_eq!(property.declared_type, PropertyType::Invalid);
        assert!(!property.is_resolved());
        assert!(property.to_resolved_arg().is_none());
    }

    #[test]
    fn test_resolved_property_argument() {
        let mut property = Property::typed("age", 42, PropertyType::Number);
        property.property_id = Some(PropertyId::new("0x01"));

        let arg = property.to_resolved_arg().unwrap();
        assert_eq!(arg, serde_json::json!(["0x01", 42, 2]));
    }

    #[test]
    fn test_zero_ids_are_unset() {
        assert!(PropertyId::new("").is_unset());
        assert!(PropertyId::new("0x0000").is_unset());
        assert!(PropertyId::new("0").is_unset());
        assert!(!PropertyId::new("0x0a").is_unset());
    }
}
