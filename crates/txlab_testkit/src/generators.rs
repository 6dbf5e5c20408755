//! Property-based test generators using proptest.

use proptest::prelude::*;
use txlab_core::{ContactCard, Person, RecordId};
use txlab_store::RowKey;

/// Strategy for generating row keys.
pub fn row_key_strategy() -> impl Strategy<Value = RowKey> {
    prop::array::uniform16(any::<u8>()).prop_map(RowKey::from_bytes)
}

/// Strategy for generating person names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,11}").expect("valid regex")
}

/// Strategy for generating ages.
pub fn age_strategy() -> impl Strategy<Value = u32> {
    0u32..130
}

/// Strategy for generating persons with fresh identifiers.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (name_strategy(), age_strategy()).prop_map(|(name, age)| Person {
        id: RecordId::new(),
        name,
        age,
    })
}

/// Strategy for generating contact cards.
pub fn contact_card_strategy() -> impl Strategy<Value = ContactCard> {
    (
        prop::string::string_regex("[a-z]{1,8}@[a-z]{1,8}\\.com").expect("valid regex"),
        prop::string::string_regex("[A-Z][a-z]{1,11}").expect("valid regex"),
    )
        .prop_map(|(email, city)| ContactCard { email, city })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_ages_stay_in_range(age in age_strategy()) {
            prop_assert!(age < 130);
        }

        #[test]
        fn generated_persons_have_nonempty_names(person in person_strategy()) {
            prop_assert!(!person.name.is_empty());
        }
    }
}
