//! Granted abilities and their activation rules.
//!
//! This is the minimal ability layer the life cycle and weapon code depends
//! on: abilities are granted from a source, blocked by tags, own tags while
//! active, and can be cancelled wholesale or by tag.

use crate::error::{ErrorSeverity, GameError};
use crate::tags::{GameplayTag, TagCountChange, TagCounts};
use crate::types::WeaponId;

/// Handle to a granted ability, unique within one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityHandle(pub u32);

/// What an ability does once activation succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbilityKind {
    NextWeapon,
    PreviousWeapon,
    /// Being revived: held while an interaction is in progress.
    Revive,
    /// Owned by a weapon; firing is resolved outside this crate.
    WeaponFire,
}

impl AbilityKind {
    /// Weapon-change abilities are predicted by the owning client.
    pub const fn changes_weapon(self) -> bool {
        matches!(self, Self::NextWeapon | Self::PreviousWeapon)
    }

    /// Instant abilities end as soon as they have run.
    pub const fn is_instant(self) -> bool {
        matches!(self, Self::NextWeapon | Self::PreviousWeapon)
    }
}

/// Static description of an ability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityDef {
    pub name: String,
    pub kind: AbilityKind,
    /// Tags identifying the ability, used by cancel-by-tag.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Vec<GameplayTag>,
    /// Activation fails while the owner has any of these.
    #[cfg_attr(feature = "serde", serde(default))]
    pub blocked_by: Vec<GameplayTag>,
    /// Added to the owner while the ability is active.
    #[cfg_attr(feature = "serde", serde(default))]
    pub owned_tags: Vec<GameplayTag>,
}

impl AbilityDef {
    pub fn new(name: impl Into<String>, kind: AbilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: Vec::new(),
            blocked_by: Vec::new(),
            owned_tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: GameplayTag) -> Self {
        self.tags.push(tag);
        self
    }

    #[must_use]
    pub fn blocked_by(mut self, tag: GameplayTag) -> Self {
        self.blocked_by.push(tag);
        self
    }

    #[must_use]
    pub fn owning(mut self, tag: GameplayTag) -> Self {
        self.owned_tags.push(tag);
        self
    }

    pub fn has_tag_matching(&self, parent: GameplayTag) -> bool {
        self.tags.iter().any(|tag| tag.matches(parent))
    }

    /// Built-in next-weapon ability.
    pub fn next_weapon() -> Self {
        Self::new("NextWeapon", AbilityKind::NextWeapon)
            .tagged(GameplayTag::AbilityWeaponIsChanging)
            .blocked_by(GameplayTag::WeaponChanging)
            .blocked_by(GameplayTag::Dead)
            .blocked_by(GameplayTag::KnockedDown)
    }

    /// Built-in previous-weapon ability.
    pub fn previous_weapon() -> Self {
        Self::new("PreviousWeapon", AbilityKind::PreviousWeapon)
            .tagged(GameplayTag::AbilityWeaponIsChanging)
            .blocked_by(GameplayTag::WeaponChanging)
            .blocked_by(GameplayTag::Dead)
            .blocked_by(GameplayTag::KnockedDown)
    }

    /// Built-in revive ability, activated on the knocked-down entity.
    pub fn revive() -> Self {
        Self::new("Revive", AbilityKind::Revive)
            .tagged(GameplayTag::AbilityRevive)
            .blocked_by(GameplayTag::Dead)
    }
}

/// Where a granted ability came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbilitySource {
    Character,
    Weapon(WeaponId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GrantedAbility {
    pub handle: AbilityHandle,
    pub def: AbilityDef,
    pub source: AbilitySource,
    pub active: bool,
}

/// Why an activation attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbilityError {
    #[error("ability {handle:?} is not granted")]
    NotGranted { handle: AbilityHandle },

    #[error("ability {handle:?} is blocked by {fail_tags:?}")]
    Blocked {
        handle: AbilityHandle,
        fail_tags: Vec<GameplayTag>,
    },

    #[error("ability {handle:?} is already active")]
    AlreadyActive { handle: AbilityHandle },
}

impl AbilityError {
    /// Tags that caused the failure, empty for non-tag failures.
    pub fn fail_tags(&self) -> &[GameplayTag] {
        match self {
            Self::Blocked { fail_tags, .. } => fail_tags,
            Self::NotGranted { .. } | Self::AlreadyActive { .. } => &[],
        }
    }
}

impl GameError for AbilityError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Blocked { .. } | Self::AlreadyActive { .. } => ErrorSeverity::Recoverable,
            Self::NotGranted { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotGranted { .. } => "ABILITY_NOT_GRANTED",
            Self::Blocked { .. } => "ABILITY_BLOCKED",
            Self::AlreadyActive { .. } => "ABILITY_ALREADY_ACTIVE",
        }
    }
}

/// Every ability granted to one entity.
#[derive(Clone, Debug, Default)]
pub struct Abilities {
    granted: Vec<GrantedAbility>,
    next_handle: u32,
}

impl Abilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, def: AbilityDef, source: AbilitySource) -> AbilityHandle {
        self.next_handle += 1;
        let handle = AbilityHandle(self.next_handle);
        self.granted.push(GrantedAbility {
            handle,
            def,
            source,
            active: false,
        });
        handle
    }

    /// Grants `def` unless an ability of the same kind from `source` exists.
    pub fn grant_once(&mut self, def: AbilityDef, source: AbilitySource) -> AbilityHandle {
        let existing = self
            .granted
            .iter()
            .find(|a| a.source == source && a.def.kind == def.kind)
            .map(|a| a.handle);
        existing.unwrap_or_else(|| self.grant(def, source))
    }

    pub fn get(&self, handle: AbilityHandle) -> Option<&GrantedAbility> {
        self.granted.iter().find(|a| a.handle == handle)
    }

    /// First granted ability of `kind`.
    pub fn find_kind(&self, kind: AbilityKind) -> Option<AbilityHandle> {
        self.granted
            .iter()
            .find(|a| a.def.kind == kind)
            .map(|a| a.handle)
    }

    pub fn is_active(&self, handle: AbilityHandle) -> bool {
        self.get(handle).is_some_and(|a| a.active)
    }

    /// Activates `handle`, adding its owned tags to `tags`.
    ///
    /// # Errors
    ///
    /// Fails without side effects if the ability is missing, already active,
    /// or blocked by a present tag.
    pub fn try_activate(
        &mut self,
        handle: AbilityHandle,
        tags: &mut TagCounts,
    ) -> Result<(AbilityKind, Vec<TagCountChange>), AbilityError> {
        let ability = self
            .granted
            .iter_mut()
            .find(|a| a.handle == handle)
            .ok_or(AbilityError::NotGranted { handle })?;
        if ability.active {
            return Err(AbilityError::AlreadyActive { handle });
        }
        let fail_tags = tags.matching_any(&ability.def.blocked_by);
        if !fail_tags.is_empty() {
            return Err(AbilityError::Blocked { handle, fail_tags });
        }

        // Instant abilities run and end in the same step, so their owned
        // tags are never held.
        if ability.def.kind.is_instant() {
            return Ok((ability.def.kind, Vec::new()));
        }
        let changes = ability
            .def
            .owned_tags
            .iter()
            .filter_map(|tag| tags.add(*tag, 1))
            .collect();
        ability.active = true;
        Ok((ability.def.kind, changes))
    }

    /// Ends or cancels `handle`, removing its owned tags.
    pub fn end(&mut self, handle: AbilityHandle, tags: &mut TagCounts) -> Vec<TagCountChange> {
        let Some(ability) = self.granted.iter_mut().find(|a| a.handle == handle) else {
            return Vec::new();
        };
        if !ability.active {
            return Vec::new();
        }
        ability.active = false;
        ability
            .def
            .owned_tags
            .iter()
            .filter_map(|tag| match tags.remove(*tag, 1) {
                Ok(change) => change,
                Err(err) => {
                    tracing::error!(target: "arena::abilities", %err, "owned tag already gone");
                    None
                }
            })
            .collect()
    }

    /// Cancels every active ability.
    pub fn cancel_all(&mut self, tags: &mut TagCounts) -> Vec<TagCountChange> {
        let active: Vec<_> = self.active_handles(|_| true);
        active
            .into_iter()
            .flat_map(|handle| self.end(handle, tags))
            .collect()
    }

    /// Cancels active abilities tagged with anything matching `parent`.
    pub fn cancel_with_tag(
        &mut self,
        parent: GameplayTag,
        tags: &mut TagCounts,
    ) -> Vec<TagCountChange> {
        let active = self.active_handles(|a| a.def.has_tag_matching(parent));
        active
            .into_iter()
            .flat_map(|handle| self.end(handle, tags))
            .collect()
    }

    /// Removes every ability granted by `source`, cancelling active ones.
    pub fn remove_source(
        &mut self,
        source: AbilitySource,
        tags: &mut TagCounts,
    ) -> Vec<TagCountChange> {
        let active = self.active_handles(|a| a.source == source);
        let changes: Vec<_> = active
            .into_iter()
            .flat_map(|handle| self.end(handle, tags))
            .collect();
        self.granted.retain(|a| a.source != source);
        changes
    }

    pub fn iter(&self) -> impl Iterator<Item = &GrantedAbility> {
        self.granted.iter()
    }

    fn active_handles(&self, filter: impl Fn(&GrantedAbility) -> bool) -> Vec<AbilityHandle> {
        self.granted
            .iter()
            .filter(|a| a.active && filter(a))
            .map(|a| a.handle)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_activation_reports_fail_tags() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        let next = abilities.grant(AbilityDef::next_weapon(), AbilitySource::Character);

        tags.add(GameplayTag::WeaponChanging, 1);
        let err = abilities.try_activate(next, &mut tags).unwrap_err();
        assert_eq!(err.fail_tags(), &[GameplayTag::WeaponChanging]);

        tags.remove(GameplayTag::WeaponChanging, 1).unwrap();
        let (kind, _) = abilities.try_activate(next, &mut tags).unwrap();
        assert_eq!(kind, AbilityKind::NextWeapon);
        assert!(!abilities.is_active(next));
    }

    #[test]
    fn owned_tags_follow_activation() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        let fire = abilities.grant(
            AbilityDef::new("Fire", AbilityKind::WeaponFire).owning(GameplayTag::WeaponIsFiring),
            AbilitySource::Weapon(WeaponId(1)),
        );

        abilities.try_activate(fire, &mut tags).unwrap();
        assert!(tags.has(GameplayTag::WeaponIsFiring));
        assert!(matches!(
            abilities.try_activate(fire, &mut tags),
            Err(AbilityError::AlreadyActive { .. })
        ));

        let changes = abilities.end(fire, &mut tags);
        assert_eq!(changes.len(), 1);
        assert!(!tags.has(GameplayTag::WeaponIsFiring));
    }

    #[test]
    fn instant_abilities_leave_no_owned_tags() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        let next = abilities.grant(
            AbilityDef::next_weapon().owning(GameplayTag::WeaponIsFiring),
            AbilitySource::Character,
        );

        let (_, changes) = abilities.try_activate(next, &mut tags).unwrap();
        assert!(changes.is_empty());
        assert!(!tags.has(GameplayTag::WeaponIsFiring));
        assert!(!abilities.is_active(next));
        // A second activation is not mistaken for an active one.
        abilities.try_activate(next, &mut tags).unwrap();
        assert_eq!(tags.count(GameplayTag::WeaponIsFiring), 0);
    }

    #[test]
    fn revive_runs_until_cancelled() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        let revive = abilities.grant(AbilityDef::revive(), AbilitySource::Character);

        abilities.try_activate(revive, &mut tags).unwrap();
        assert!(abilities.is_active(revive));
        assert!(matches!(
            abilities.try_activate(revive, &mut tags),
            Err(AbilityError::AlreadyActive { .. })
        ));

        abilities.cancel_with_tag(GameplayTag::AbilityRevive, &mut tags);
        assert!(!abilities.is_active(revive));
    }

    #[test]
    fn cancel_with_tag_uses_hierarchy() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        let fire = abilities.grant(
            AbilityDef::new("Fire", AbilityKind::WeaponFire)
                .tagged(GameplayTag::AbilityWeaponPrimaryInstant)
                .owning(GameplayTag::WeaponIsFiring),
            AbilitySource::Weapon(WeaponId(1)),
        );
        abilities.try_activate(fire, &mut tags).unwrap();
        abilities.cancel_with_tag(GameplayTag::AbilityWeapon, &mut tags);
        assert!(!abilities.is_active(fire));
        assert!(!tags.has(GameplayTag::WeaponIsFiring));
    }

    #[test]
    fn removing_a_source_drops_its_abilities() {
        let mut abilities = Abilities::new();
        let mut tags = TagCounts::new();
        abilities.grant(AbilityDef::next_weapon(), AbilitySource::Character);
        abilities.grant(
            AbilityDef::new("Fire", AbilityKind::WeaponFire),
            AbilitySource::Weapon(WeaponId(4)),
        );
        abilities.remove_source(AbilitySource::Weapon(WeaponId(4)), &mut tags);
        assert_eq!(abilities.iter().count(), 1);
        assert!(abilities.find_kind(AbilityKind::WeaponFire).is_none());
    }

    #[test]
    fn grant_once_is_idempotent() {
        let mut abilities = Abilities::new();
        let first = abilities.grant_once(AbilityDef::revive(), AbilitySource::Character);
        let second = abilities.grant_once(AbilityDef::revive(), AbilitySource::Character);
        assert_eq!(first, second);
    }
}
