//! Demo entities.

use crate::codec::{from_cbor, to_cbor, RecordCodec};
use crate::error::CoreResult;
use crate::lazy::Lazy;
use crate::record::RecordId;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use txlab_store::Version;

/// The single mutable entity the demonstrations race over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Store-assigned identifier, immutable after insert.
    pub id: RecordId,
    /// Mutable display name.
    pub name: String,
    /// Mutable age.
    pub age: u32,
}

impl Person {
    /// Creates a person with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            age,
        }
    }
}

impl RecordCodec for Person {
    fn encode(&self) -> CoreResult<Bytes> {
        to_cbor(self)
    }

    fn decode(bytes: &[u8]) -> CoreResult<Self> {
        from_cbor(bytes)
    }
}

/// Dependent association of a person, stored as its own record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    /// Contact email address.
    pub email: String,
    /// City of residence.
    pub city: String,
}

impl RecordCodec for ContactCard {
    fn encode(&self) -> CoreResult<Bytes> {
        to_cbor(self)
    }

    fn decode(bytes: &[u8]) -> CoreResult<Self> {
        from_cbor(bytes)
    }
}

/// A person as returned by a read: the record, the version observed (for
/// optimistic writes), and its contact association, loaded or deferred
/// depending on the fetch variant.
#[derive(Debug)]
pub struct FetchedPerson {
    /// The person record.
    pub person: Person,
    /// Row version at read time.
    pub version: Version,
    /// Dependent contact card.
    pub contact: Lazy<ContactCard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_payload_roundtrip() {
        let person = Person::new("Alice", 30);
        let bytes = person.encode().unwrap();
        let back = Person::decode(&bytes).unwrap();
        assert_eq!(back, person);
    }

    #[test]
    fn contact_card_payload_roundtrip() {
        let card = ContactCard {
            email: "alice@example.com".into(),
            city: "Dodoma".into(),
        };
        let bytes = card.encode().unwrap();
        assert_eq!(ContactCard::decode(&bytes).unwrap(), card);
    }
}
