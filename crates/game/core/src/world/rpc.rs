//! Entry points for RPCs arriving from the transport.

use tracing::{trace, warn};

use super::interaction::prompt_update;
use super::{NetMode, World, WorldError, WorldResult};
use crate::net::{ClientRpc, ServerRpc};
use crate::notify::HudUpdate;
use crate::types::ControllerId;

impl World {
    /// Server: handles an RPC sent by the client of `from`.
    ///
    /// RPCs naming an entity the sender does not control are dropped.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotAuthority`] if the RPC targets an entity `from` does
    /// not control, or whatever the handler returns.
    pub fn handle_server_rpc(&mut self, from: ControllerId, rpc: ServerRpc) -> WorldResult<()> {
        let id = rpc.entity();
        let controlled = self.entity_ref(id)?.controller_id() == Some(from);
        if !self.is_server() || !controlled {
            warn!(target: "arena::rpc", %from, entity = %id, "rejected rpc from non-owner");
            return Err(WorldError::NotAuthority {
                operation: "handle_server_rpc",
            });
        }
        trace!(target: "arena::rpc", %from, ?rpc, "server rpc");
        match rpc {
            ServerRpc::EquipWeapon { entity, weapon } => self.server_equip_weapon(entity, weapon),
            ServerRpc::SyncCurrentWeapon { entity } => {
                self.server_sync_current_weapon(entity);
                Ok(())
            }
            ServerRpc::ActivateAbility {
                entity,
                kind,
                target_weapon,
            } => self.server_activate_ability(entity, kind, target_weapon),
            ServerRpc::Move { entity, mv } => self.server_move(entity, mv),
        }
    }

    /// Client: handles an RPC sent by the server.
    pub fn handle_client_rpc(&mut self, rpc: ClientRpc) -> WorldResult<()> {
        trace!(target: "arena::rpc", ?rpc, "client rpc");
        match rpc {
            ClientRpc::SyncCurrentWeapon { entity, weapon } => {
                self.client_sync_current_weapon(entity, weapon);
                Ok(())
            }
            ClientRpc::AbilityActivationFailed {
                entity,
                kind,
                fail_tags,
            } => {
                self.on_ability_activation_failed(entity, kind, &fail_tags);
                Ok(())
            }
            ClientRpc::ShowDamageNumber(number) => {
                if let NetMode::Client { local } = self.mode {
                    if let Some(viewer) = self.entity_for_controller(local) {
                        self.hud(viewer, HudUpdate::DamageNumber(number));
                    }
                }
                Ok(())
            }
            ClientRpc::InteractionPrompt { entity, duration } => {
                self.hud(entity, prompt_update(duration));
                Ok(())
            }
            ClientRpc::AckMove { entity, timestamp } => self.client_ack_move(entity, timestamp),
            ClientRpc::AdjustPosition {
                entity,
                timestamp,
                location,
            } => self.client_adjust_position(entity, timestamp, location),
            ClientRpc::Snapshot(snapshot) => self.apply_snapshot(snapshot),
        }
    }
}
