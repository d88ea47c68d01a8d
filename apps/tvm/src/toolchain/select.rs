//! Ordering and constraint-based selection over versioned records.
//!
//! Both remote release candidates and locally installed versions go through
//! the same selection rule: scan in descending version order and take the
//! first entry the constraint accepts, so the newest compatible version wins.

use super::constraint::{Constraint, Version};

/// Anything that carries a [`Version`] and can be ordered by it.
pub trait Versioned {
    /// The version this record describes.
    fn version(&self) -> &Version;
}

impl Versioned for Version {
    fn version(&self) -> &Version {
        self
    }
}

impl<T: Versioned> Versioned for &T {
    fn version(&self) -> &Version {
        (*self).version()
    }
}

/// Returns the records ordered oldest first. The sort is stable.
#[must_use]
pub fn sort_ascending<T: Versioned>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| a.version().cmp(b.version()));
    items
}

/// Returns the records ordered newest first. The sort is stable.
#[must_use]
pub fn sort_descending<T: Versioned>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| b.version().cmp(a.version()));
    items
}

/// Returns every record the constraint accepts, newest first.
#[must_use]
pub fn matching<'a, T: Versioned>(items: &'a [T], constraint: &Constraint) -> Vec<&'a T> {
    sort_descending(
        items
            .iter()
            .filter(|item| constraint.matches(item.version()))
            .collect(),
    )
}

/// Returns the newest record the constraint accepts.
///
/// `None` means no record matched; this is an expected outcome, not an error.
#[must_use]
pub fn select<'a, T: Versioned>(items: &'a [T], constraint: &Constraint) -> Option<&'a T> {
    matching(items, constraint).into_iter().next()
}
