//! Entity record model.
//!
//! # Responsibility
//! - Define the key/value pair shape returned by enumeration APIs.
//!
//! # Invariants
//! - `key` and `value` are owned copies; mutating a returned entity never
//!   touches stored data.

use serde::{Deserialize, Serialize};

/// Opaque key/value pair stored in the entity repository.
///
/// Both halves are raw bytes. Callers that store text or serialized
/// structures own the encoding on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entity {
    /// Creates an entity from any byte-owning inputs.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Entity;

    #[test]
    fn new_copies_both_halves() {
        let entity = Entity::new("user:1", vec![0xde, 0xad]);
        assert_eq!(entity.key, b"user:1");
        assert_eq!(entity.value, vec![0xde, 0xad]);
    }

    #[test]
    fn serde_roundtrip_preserves_bytes() {
        let entity = Entity::new(vec![0x00, 0xff], b"payload".to_vec());
        let json = serde_json::to_string(&entity).expect("entity should serialize");
        let back: Entity = serde_json::from_str(&json).expect("entity should deserialize");
        assert_eq!(back, entity);
    }
}
