//! Generic field access.
//!
//! Entity instances are opaque to this crate. A property is read through
//! one of two strategies, tried in fixed order: the accessor the entity
//! exposes for it, then direct member storage.

use crate::{model::descriptor::AccessPaths, value::Value};

///
/// AccessStrategy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessStrategy {
    Accessor,
    Member,
}

impl AccessStrategy {
    /// Fixed fallback order.
    pub const ORDER: [Self; 2] = [Self::Accessor, Self::Member];

    /// Strategies a property declares, in fallback order.
    pub fn available(paths: AccessPaths) -> impl Iterator<Item = Self> {
        Self::ORDER.into_iter().filter(move |strategy| match strategy {
            Self::Accessor => paths.accessor,
            Self::Member => paths.member,
        })
    }
}

///
/// ValueAccessor
///
/// Capability implemented by entity instances. `read` returns `None` when
/// the property is unset under that strategy.
///

pub trait ValueAccessor {
    fn read(&self, strategy: AccessStrategy, property: &str) -> Option<Value>;
}

/// Read `property` using the first strategy `paths` makes available.
///
/// The first available strategy decides: an unset value is returned as
/// absent rather than retried with the next strategy.
pub fn read_value(
    accessor: &dyn ValueAccessor,
    paths: AccessPaths,
    property: &str,
) -> Option<Value> {
    let strategy = AccessStrategy::available(paths).next()?;

    accessor.read(strategy, property)
}
