//! Collaborators that forward world notifications onto the event bus.

use glam::Vec3;
use tracing::trace;

use arena_core::{
    ControllerId, DamageNumber, EntityId, GameMode, GameplayTag, Hud, HudUpdate, Presentation,
};

use crate::events::{Event, EventBus, Peer, PresentationEvent};

/// Publishes montages, cues and camera changes for one world.
pub struct PresentationRelay {
    event_bus: EventBus,
    peer: Peer,
}

impl PresentationRelay {
    pub fn new(event_bus: EventBus, peer: Peer) -> Self {
        Self { event_bus, peer }
    }
}

impl Presentation for PresentationRelay {
    fn play_montage(&mut self, entity: EntityId, montage: &str) {
        self.event_bus
            .publish(Event::Presentation(PresentationEvent::Montage {
                peer: self.peer,
                entity,
                montage: montage.to_owned(),
            }));
    }

    fn play_visual_cue(&mut self, entity: EntityId, cue: GameplayTag, location: Vec3) {
        self.event_bus
            .publish(Event::Presentation(PresentationEvent::VisualCue {
                peer: self.peer,
                entity,
                cue,
                location,
            }));
    }

    fn set_perspective(&mut self, entity: EntityId, first_person: bool) {
        self.event_bus
            .publish(Event::Presentation(PresentationEvent::Perspective {
                peer: self.peer,
                entity,
                first_person,
            }));
    }
}

/// HUD of one local player. A relay without a controller drops updates.
pub struct HudRelay {
    event_bus: EventBus,
    controller: Option<ControllerId>,
}

impl HudRelay {
    pub fn new(event_bus: EventBus, controller: Option<ControllerId>) -> Self {
        Self {
            event_bus,
            controller,
        }
    }

    fn show(&self, update: HudUpdate) {
        match self.controller {
            Some(controller) => self
                .event_bus
                .publish(Event::Presentation(PresentationEvent::Hud { controller, update })),
            None => trace!(target: "runtime::hud", ?update, "no local player"),
        }
    }
}

impl Hud for HudRelay {
    fn set_health_percentage(&mut self, value: f32) {
        self.show(HudUpdate::HealthPercentage(value));
    }

    fn set_mana_percentage(&mut self, value: f32) {
        self.show(HudUpdate::ManaPercentage(value));
    }

    fn set_shield_percentage(&mut self, value: f32) {
        self.show(HudUpdate::ShieldPercentage(value));
    }

    fn show_damage_number(&mut self, damage: DamageNumber) {
        self.show(HudUpdate::DamageNumber(damage));
    }

    fn set_equipped_weapon_icon(&mut self, icon: Option<&str>) {
        self.show(HudUpdate::EquippedWeaponIcon(icon.map(str::to_owned)));
    }

    fn set_clip_ammo(&mut self, ammo: u32) {
        self.show(HudUpdate::ClipAmmo(ammo));
    }

    fn set_reserve_ammo(&mut self, ammo: u32) {
        self.show(HudUpdate::ReserveAmmo(ammo));
    }

    fn show_interaction_prompt(&mut self, duration: f32) {
        self.show(HudUpdate::ShowInteractionPrompt { duration });
    }

    fn hide_interaction_prompt(&mut self) {
        self.show(HudUpdate::HideInteractionPrompt);
    }
}

/// Game mode seen from a client; deaths are decided by the server.
pub struct RemoteGameMode;

impl GameMode for RemoteGameMode {
    fn on_entity_died(&mut self, entity: EntityId, controller: Option<ControllerId>) {
        trace!(target: "runtime::game_mode", %entity, ?controller, "death reported on a client copy");
    }
}
