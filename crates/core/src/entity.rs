//! Entity trait: identity + continuity across state changes.

use std::collections::HashSet;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Returns the first identifier that appears more than once, if any.
///
/// Used when rebuilding state from persisted records, where identity must be
/// unique across the whole collection.
pub fn first_duplicate_id<'a, E>(entities: impl IntoIterator<Item = &'a E>) -> Option<E::Id>
where
    E: Entity + 'a,
{
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .map(Entity::id)
        .find(|id| !seen.insert(*id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Entity for Named {
        type Id = &'static str;

        fn id(&self) -> &Self::Id {
            &self.0
        }
    }

    #[test]
    fn finds_repeated_identity() {
        let items = [Named("a"), Named("b"), Named("a")];
        assert_eq!(first_duplicate_id(&items), Some("a"));
    }

    #[test]
    fn unique_identities_yield_none() {
        let items = [Named("a"), Named("b")];
        assert_eq!(first_duplicate_id(&items), None);
    }
}
