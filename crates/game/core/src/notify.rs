//! One-way notifications to presentation, HUD and game-mode collaborators.
//!
//! The world never calls collaborators directly. It queues [`Notification`]s
//! that the host drains after each step and hands to [`dispatch`].

use glam::Vec3;

use crate::effects::DamageNumber;
use crate::tags::GameplayTag;
use crate::types::{ControllerId, EntityId};

/// Update for the HUD of a locally controlled entity.
#[derive(Clone, Debug, PartialEq)]
pub enum HudUpdate {
    HealthPercentage(f32),
    ManaPercentage(f32),
    ShieldPercentage(f32),
    DamageNumber(DamageNumber),
    /// `None` clears the icon.
    EquippedWeaponIcon(Option<String>),
    ClipAmmo(u32),
    ReserveAmmo(u32),
    ShowInteractionPrompt { duration: f32 },
    HideInteractionPrompt,
}

/// Side effect requested from an external collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    PlayMontage {
        entity: EntityId,
        montage: String,
    },
    PlayVisualCue {
        entity: EntityId,
        cue: GameplayTag,
        location: Vec3,
    },
    SetPerspective {
        entity: EntityId,
        first_person: bool,
    },
    Hud {
        entity: EntityId,
        update: HudUpdate,
    },
    /// Sent exactly once per death.
    EntityDied {
        entity: EntityId,
        controller: Option<ControllerId>,
    },
}

/// Animation, camera and cue playback.
pub trait Presentation {
    fn play_montage(&mut self, entity: EntityId, montage: &str);
    fn play_visual_cue(&mut self, entity: EntityId, cue: GameplayTag, location: Vec3);
    fn set_perspective(&mut self, entity: EntityId, first_person: bool);
}

/// Local player HUD.
pub trait Hud {
    fn set_health_percentage(&mut self, value: f32);
    fn set_mana_percentage(&mut self, value: f32);
    fn set_shield_percentage(&mut self, value: f32);
    fn show_damage_number(&mut self, damage: DamageNumber);
    fn set_equipped_weapon_icon(&mut self, icon: Option<&str>);
    fn set_clip_ammo(&mut self, ammo: u32);
    fn set_reserve_ammo(&mut self, ammo: u32);
    fn show_interaction_prompt(&mut self, duration: f32);
    fn hide_interaction_prompt(&mut self);
}

/// Match rules: owns respawn timing and calls back into the respawn path.
pub trait GameMode {
    fn on_entity_died(&mut self, entity: EntityId, controller: Option<ControllerId>);
}

/// Routes one notification to the collaborator that handles it.
pub fn dispatch<P, H, G>(notification: &Notification, presentation: &mut P, hud: &mut H, game_mode: &mut G)
where
    P: Presentation + ?Sized,
    H: Hud + ?Sized,
    G: GameMode + ?Sized,
{
    match notification {
        Notification::PlayMontage { entity, montage } => presentation.play_montage(*entity, montage),
        Notification::PlayVisualCue {
            entity,
            cue,
            location,
        } => presentation.play_visual_cue(*entity, *cue, *location),
        Notification::SetPerspective {
            entity,
            first_person,
        } => presentation.set_perspective(*entity, *first_person),
        Notification::Hud { update, .. } => match update {
            HudUpdate::HealthPercentage(value) => hud.set_health_percentage(*value),
            HudUpdate::ManaPercentage(value) => hud.set_mana_percentage(*value),
            HudUpdate::ShieldPercentage(value) => hud.set_shield_percentage(*value),
            HudUpdate::DamageNumber(damage) => hud.show_damage_number(*damage),
            HudUpdate::EquippedWeaponIcon(icon) => hud.set_equipped_weapon_icon(icon.as_deref()),
            HudUpdate::ClipAmmo(ammo) => hud.set_clip_ammo(*ammo),
            HudUpdate::ReserveAmmo(ammo) => hud.set_reserve_ammo(*ammo),
            HudUpdate::ShowInteractionPrompt { duration } => hud.show_interaction_prompt(*duration),
            HudUpdate::HideInteractionPrompt => hud.hide_interaction_prompt(),
        },
        Notification::EntityDied { entity, controller } => game_mode.on_entity_died(*entity, *controller),
    }
}
