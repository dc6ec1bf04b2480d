use std::collections::BTreeMap;

use super::{GameplayTag, TagError};

/// Reference-counted tag container owned by an entity.
///
/// A tag is present while its count is above zero. Counts never go negative:
/// removing more than is present is rejected and leaves the count untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCounts {
    counts: BTreeMap<GameplayTag, u32>,
}

/// A committed change to one tag's count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCountChange {
    pub tag: GameplayTag,
    pub old_count: u32,
    pub new_count: u32,
}

impl TagCountChange {
    /// True if the tag appeared or disappeared with this change.
    pub const fn is_new_or_removed(&self) -> bool {
        (self.old_count == 0) != (self.new_count == 0)
    }

    pub const fn added(&self) -> bool {
        self.old_count == 0 && self.new_count > 0
    }

    pub const fn removed(&self) -> bool {
        self.old_count > 0 && self.new_count == 0
    }
}

impl TagCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reference count of `tag`.
    pub fn count(&self, tag: GameplayTag) -> u32 {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    /// True if exactly `tag` is present.
    pub fn has(&self, tag: GameplayTag) -> bool {
        self.count(tag) > 0
    }

    /// True if any present tag matches `parent` hierarchically.
    pub fn has_matching(&self, parent: GameplayTag) -> bool {
        self.counts.keys().any(|tag| tag.matches(parent))
    }

    /// Returns the present tags that match any of `parents`.
    pub fn matching_any(&self, parents: &[GameplayTag]) -> Vec<GameplayTag> {
        self.counts
            .keys()
            .copied()
            .filter(|tag| tag.matches_any(parents))
            .collect()
    }

    /// Adds `amount` references to `tag`.
    pub fn add(&mut self, tag: GameplayTag, amount: u32) -> Option<TagCountChange> {
        if amount == 0 {
            return None;
        }
        let old_count = self.count(tag);
        let new_count = old_count.saturating_add(amount);
        self.counts.insert(tag, new_count);
        Some(TagCountChange {
            tag,
            old_count,
            new_count,
        })
    }

    /// Removes `amount` references from `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Underflow`] without mutating anything if fewer than
    /// `amount` references are present.
    pub fn remove(&mut self, tag: GameplayTag, amount: u32) -> Result<Option<TagCountChange>, TagError> {
        if amount == 0 {
            return Ok(None);
        }
        let old_count = self.count(tag);
        if old_count < amount {
            return Err(TagError::Underflow {
                tag,
                count: old_count,
                requested: amount,
            });
        }
        let new_count = old_count - amount;
        if new_count == 0 {
            self.counts.remove(&tag);
        } else {
            self.counts.insert(tag, new_count);
        }
        Ok(Some(TagCountChange {
            tag,
            old_count,
            new_count,
        }))
    }

    /// Overwrites the count of `tag`; used when applying replicated state.
    pub fn set_count(&mut self, tag: GameplayTag, count: u32) -> Option<TagCountChange> {
        let old_count = self.count(tag);
        if old_count == count {
            return None;
        }
        if count == 0 {
            self.counts.remove(&tag);
        } else {
            self.counts.insert(tag, count);
        }
        Some(TagCountChange {
            tag,
            old_count,
            new_count: count,
        })
    }

    /// Iterates present tags with their counts, in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (GameplayTag, u32)> + '_ {
        self.counts.iter().map(|(tag, count)| (*tag, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
