//! # Swap-and-Truncate Compaction
//!
//! Dense lists whose entries are referenced by recorded index (selector lists,
//! facet address lists) cannot shift on removal without invalidating every
//! index after the hole. Instead the last entry moves into the hole and the
//! list shrinks by one; exactly one recorded index needs updating.

use crate::errors::ListError;

/// Outcome of [`swap_remove_reindex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRemoval<T> {
    /// The entry that was removed.
    pub removed: T,
    /// The entry that now lives at the removed index, if one was moved there.
    ///
    /// `None` when the removed entry was the last one. Callers must rewrite
    /// the recorded index of this entry to the removed index.
    pub moved: Option<T>,
}

/// Removes `items[index]` by moving the last entry into its slot.
///
/// # Errors
///
/// Returns [`ListError::IndexOutOfBounds`] if `index` is not a live entry;
/// `items` is untouched in that case.
pub fn swap_remove_reindex<T: Clone>(
    items: &mut Vec<T>,
    index: usize,
) -> Result<SwapRemoval<T>, ListError> {
    let len = items.len();
    if index >= len {
        return Err(ListError::IndexOutOfBounds { index, len });
    }

    let last = len - 1;
    let removed = items.swap_remove(index);
    let moved = if index == last {
        None
    } else {
        Some(items[index].clone())
    };

    Ok(SwapRemoval { removed, moved })
}
