//! The authoritative collection of everything in one game session.

use crate::entity::{Asteroid, Bullet, Ship, ShipId};
use serde::{Deserialize, Serialize};

/// All ships, asteroids and bullets of a session.
///
/// Field order is part of the wire format: a `GAME_MODEL` packet carries the
/// asteroid list, then the bullet list, then the ship list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub asteroids: Vec<Asteroid>,
    pub bullets: Vec<Bullet>,
    pub ships: Vec<Ship>,
}

/// Result of applying a ship record received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Replaced,
    /// No ship with that id exists; nothing was added.
    UnknownShip,
    /// The ship is already destroyed this round and cannot be steered.
    ShipDestroyed,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|ship| ship.id == id)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|ship| ship.id == id)
    }

    /// Adds a ship unless one with the same id is already present.
    pub fn add_ship(&mut self, ship: Ship) -> bool {
        if self.ship(ship.id).is_some() {
            return false;
        }
        self.ships.push(ship);
        true
    }

    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        let index = self.ships.iter().position(|ship| ship.id == id)?;
        Some(self.ships.remove(index))
    }

    /// Replaces the record of the ship with the same id as `incoming`.
    ///
    /// Identity fields (nickname, colour) and the score stay as the server
    /// knows them; everything else is taken from `incoming`.
    pub fn merge_ship(&mut self, mut incoming: Ship) -> MergeOutcome {
        let Some(existing) = self.ship_mut(incoming.id) else {
            return MergeOutcome::UnknownShip;
        };
        if existing.is_destroyed() {
            return MergeOutcome::ShipDestroyed;
        }
        incoming.nickname = existing.nickname.take();
        incoming.color = existing.color;
        incoming.score = existing.score;
        *existing = incoming;
        MergeOutcome::Replaced
    }

    pub fn alive_ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter().filter(|ship| !ship.is_destroyed())
    }

    pub fn alive_ship_count(&self) -> usize {
        self.alive_ships().count()
    }

    pub fn best_score(&self) -> u32 {
        self.ships.iter().map(|ship| ship.score).max().unwrap_or(0)
    }

    /// Drops every asteroid and bullet; ships are left alone.
    pub fn clear_projectiles(&mut self) {
        self.asteroids.clear();
        self.bullets.clear();
    }

    /// Replaces the whole state with a snapshot received from the server.
    pub fn install(&mut self, snapshot: WorldState) {
        *self = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShipTuning;
    use crate::entity::Vector2;

    fn ship(id: u32) -> Ship {
        Ship::new(
            ShipId(id),
            Some(format!("pilot{}", id)),
            Vector2::new(100.0 * id as f32, 100.0),
            &ShipTuning::default(),
        )
    }

    fn world_with_ships(ids: &[u32]) -> WorldState {
        let mut world = WorldState::new();
        for id in ids {
            assert!(world.add_ship(ship(*id)));
        }
        world
    }

    #[test]
    fn test_add_ship_rejects_duplicate_id() {
        let mut world = world_with_ships(&[1]);
        assert!(!world.add_ship(ship(1)));
        assert_eq!(world.ships.len(), 1);
    }

    #[test]
    fn test_merge_replaces_only_matching_ship() {
        let mut world = world_with_ships(&[0, 1, 2]);
        let untouched = world.ship(ShipId(2)).cloned();

        let mut update = ship(1);
        update.body.location = Vector2::new(42.0, 24.0);
        update.controls.thrust = true;

        assert_eq!(world.merge_ship(update), MergeOutcome::Replaced);
        let merged = world.ship(ShipId(1)).unwrap();
        assert_eq!(merged.body.location, Vector2::new(42.0, 24.0));
        assert!(merged.controls.thrust);
        assert_eq!(world.ship(ShipId(2)).cloned(), untouched);
        assert_eq!(world.ships.len(), 3);
    }

    #[test]
    fn test_merge_rejects_unknown_ship() {
        let mut world = world_with_ships(&[0, 1]);
        assert_eq!(world.merge_ship(ship(7)), MergeOutcome::UnknownShip);
        assert_eq!(world.ships.len(), 2);
        assert!(world.ship(ShipId(7)).is_none());
    }

    #[test]
    fn test_merge_keeps_score_and_identity() {
        let mut world = world_with_ships(&[1]);
        world.ship_mut(ShipId(1)).unwrap().score = 3;

        let mut forged = ship(1);
        forged.score = 99;
        forged.nickname = Some("impostor".into());
        world.merge_ship(forged);

        let merged = world.ship(ShipId(1)).unwrap();
        assert_eq!(merged.score, 3);
        assert_eq!(merged.nickname.as_deref(), Some("pilot1"));
    }

    #[test]
    fn test_merge_cannot_revive_destroyed_ship() {
        let mut world = world_with_ships(&[1]);
        world.ship_mut(ShipId(1)).unwrap().body.destroy();

        assert_eq!(world.merge_ship(ship(1)), MergeOutcome::ShipDestroyed);
        assert!(world.ship(ShipId(1)).unwrap().is_destroyed());
    }

    #[test]
    fn test_alive_count_and_best_score() {
        let mut world = world_with_ships(&[0, 1, 2]);
        world.ship_mut(ShipId(1)).unwrap().body.destroy();
        world.ship_mut(ShipId(2)).unwrap().score = 5;

        assert_eq!(world.alive_ship_count(), 2);
        assert_eq!(world.best_score(), 5);
    }

    #[test]
    fn test_remove_ship() {
        let mut world = world_with_ships(&[0, 1]);
        assert!(world.remove_ship(ShipId(1)).is_some());
        assert!(world.remove_ship(ShipId(1)).is_none());
        assert_eq!(world.ships.len(), 1);
    }
}
