//! Routing of committed state events to their listeners.

use tracing::error;

use super::World;
use crate::attributes::{Attribute, AttributeChange};
use crate::config::GameConfig;
use crate::notify::HudUpdate;
use crate::observe::{Listener, StateEvent};
use crate::tags::GameplayTag;
use crate::types::EntityId;

impl World {
    /// Dispatches every queued event of `id`, including events raised by the
    /// listeners themselves, in commit order.
    pub(crate) fn process_events(&mut self, id: EntityId) {
        let mut processed = 0usize;
        loop {
            let Some(entity) = self.entities.get_mut(&id) else {
                return;
            };
            let Some(event) = entity.take_event() else {
                return;
            };
            processed += 1;
            if processed > GameConfig::MAX_EVENTS_PER_FLUSH {
                let dropped = entity.discard_events();
                error!(
                    target: "arena::events",
                    entity = %id,
                    dropped,
                    "event flush limit reached, dropping queued events"
                );
                return;
            }
            let listeners = match event {
                StateEvent::Attribute(change) => entity.attribute_listeners.listeners(change.attribute),
                StateEvent::Tag(change) => entity.tag_listeners.tag_listeners(change.tag, &change),
            };
            for listener in listeners {
                self.dispatch(id, listener, event);
            }
        }
    }

    fn dispatch(&mut self, id: EntityId, listener: Listener, event: StateEvent) {
        match (listener, event) {
            (Listener::LifeCycle, StateEvent::Attribute(change))
                if change.attribute == Attribute::Health =>
            {
                self.on_health_changed(id);
            }
            (Listener::LifeCycle, StateEvent::Tag(change)) if change.tag == GameplayTag::KnockedDown => {
                self.on_knock_down_tag_changed(id, change);
            }
            (Listener::Hud, StateEvent::Attribute(change)) => self.relay_attribute(id, change),
            (Listener::WeaponSync, StateEvent::Tag(change)) => {
                self.on_weapon_change_delay_tag_changed(id, change);
            }
            (Listener::EquippedAmmo { entity }, StateEvent::Attribute(change)) => {
                self.hud(entity, HudUpdate::ReserveAmmo(change.new_value.max(0.0) as u32));
            }
            _ => {}
        }
    }

    fn relay_attribute(&mut self, id: EntityId, change: AttributeChange) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        let update = match change.attribute {
            Attribute::Health | Attribute::MaxHealth => {
                HudUpdate::HealthPercentage(entity.attributes.percentage(Attribute::Health))
            }
            Attribute::Mana | Attribute::MaxMana => {
                HudUpdate::ManaPercentage(entity.attributes.percentage(Attribute::Mana))
            }
            Attribute::Shield | Attribute::MaxShield => {
                HudUpdate::ShieldPercentage(entity.attributes.percentage(Attribute::Shield))
            }
            _ => return,
        };
        self.hud(id, update);
    }
}
