//! Client-side mirror of the server's world.
//!
//! Clients never simulate. Each snapshot replaces the local copy wholesale,
//! and the local player's ship is found again in the fresh ship list by id.

use log::debug;
use shared::{Controls, Listeners, SessionEvent, Ship, ShipId, WorldState};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ClientGame {
    world: Arc<RwLock<WorldState>>,
    my_ship: Arc<OnceLock<ShipId>>,
    listeners: Arc<Listeners<SessionEvent>>,
}

impl ClientGame {
    pub fn new(listeners: Arc<Listeners<SessionEvent>>) -> Self {
        Self {
            world: Arc::new(RwLock::new(WorldState::new())),
            my_ship: Arc::new(OnceLock::new()),
            listeners,
        }
    }

    /// Shared handle for a renderer. Readers must not mutate it.
    pub fn world(&self) -> Arc<RwLock<WorldState>> {
        Arc::clone(&self.world)
    }

    pub fn listeners(&self) -> Arc<Listeners<SessionEvent>> {
        Arc::clone(&self.listeners)
    }

    /// Remembers the ship id the server handed out. Only the first call
    /// counts; returns false if an id was already set.
    pub fn set_my_ship(&self, id: ShipId) -> bool {
        self.my_ship.set(id).is_ok()
    }

    pub fn my_ship_id(&self) -> Option<ShipId> {
        self.my_ship.get().copied()
    }

    /// A copy of the local player's ship as of the last snapshot
    pub async fn my_ship(&self) -> Option<Ship> {
        let id = self.my_ship_id()?;
        self.world.read().await.ship(id).cloned()
    }

    /// Replaces the local world with `snapshot`
    ///
    /// The keys currently held are put back on the local ship so the mirror
    /// shows what the player is doing, not what the server last heard.
    /// Returns true when the server's copy of the ship is alive but steered
    /// by other keys than `controls`, i.e. the server needs the ship again.
    pub async fn install(&self, snapshot: WorldState, controls: Controls) -> bool {
        let diverged = {
            let mut world = self.world.write().await;
            world.install(snapshot);
            match self.my_ship_id() {
                Some(id) => match world.ship_mut(id) {
                    Some(ship) => {
                        let diverged = !ship.is_destroyed() && ship.controls != controls;
                        ship.controls = controls;
                        diverged
                    }
                    None => {
                        debug!("Ship {} missing from snapshot", id);
                        false
                    }
                },
                None => false,
            }
        };
        self.listeners.notify(&SessionEvent::SnapshotInstalled);
        diverged
    }

    /// The record to push to the server after a key change
    ///
    /// `None` before the first snapshot and while the ship is destroyed.
    pub async fn outgoing_ship(&self, controls: Controls) -> Option<Ship> {
        let mut ship = self.my_ship().await?;
        if ship.is_destroyed() {
            return None;
        }
        ship.controls = controls;
        Some(ship)
    }
}
