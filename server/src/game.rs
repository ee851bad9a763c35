//! Multiplayer rules for the authoritative simulation.

use crate::network::GameMessage;
use log::{error, info};
use rand::rngs::StdRng;
use shared::spawn::{find_spawn_location, random_location};
use shared::{
    GameConfig, Listeners, Packet, SessionEvent, Ship, ShipId, StepStrategy, Vector2, WorldState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Step strategy for a hosted session.
///
/// Ships are never removed between rounds. Each display frame the world is
/// handed to the network sender as a full snapshot for every client.
pub struct MultiplayerRules {
    game_tx: mpsc::UnboundedSender<GameMessage>,
    listeners: Arc<Listeners<SessionEvent>>,
}

impl MultiplayerRules {
    pub fn new(
        game_tx: mpsc::UnboundedSender<GameMessage>,
        listeners: Arc<Listeners<SessionEvent>>,
    ) -> Self {
        Self { game_tx, listeners }
    }
}

/// True when at most one ship out of two or more is left flying, or when a
/// lone ship has been destroyed.
pub fn is_round_over(world: &WorldState) -> bool {
    let alive = world.alive_ship_count();
    match world.ships.len() {
        0 => false,
        1 => alive == 0,
        _ => alive <= 1,
    }
}

/// A fresh ship seated away from the ships already in `world`.
pub fn seat_new_ship(
    world: &WorldState,
    id: ShipId,
    nickname: Option<String>,
    rng: &mut StdRng,
    config: &GameConfig,
) -> Ship {
    let location = free_seat(world, rng, config);
    Ship::new(id, nickname, location, &config.ship)
}

fn free_seat(world: &WorldState, rng: &mut StdRng, config: &GameConfig) -> Vector2 {
    let taken: Vec<Vector2> = world.ships.iter().map(|ship| ship.body.location).collect();
    find_spawn_location(rng, &taken, config).unwrap_or_else(|| random_location(rng, config))
}

fn reseat_all(world: &mut WorldState, rng: &mut StdRng, config: &GameConfig) {
    let mut seated: Vec<Vector2> = Vec::with_capacity(world.ships.len());
    for ship in &mut world.ships {
        let location = find_spawn_location(rng, &seated, config)
            .unwrap_or_else(|| random_location(rng, config));
        ship.respawn_at(location, &config.ship);
        seated.push(location);
    }
}

impl StepStrategy for MultiplayerRules {
    /// Scores only change between rounds, so the limit is settled here: one
    /// more asteroid per step of the best score.
    fn base_asteroid_limit(&self, world: &WorldState, config: &GameConfig) -> usize {
        let step = config.asteroid.points_per_limit_step.max(1);
        config.asteroid.base_limit + (world.best_score() / step) as usize
    }

    fn is_game_over(&self, world: &WorldState) -> bool {
        is_round_over(world)
    }

    fn restart(&mut self, world: &mut WorldState, rng: &mut StdRng, config: &GameConfig) {
        for ship in &mut world.ships {
            if !ship.is_destroyed() {
                ship.score += 1;
                info!("Ship {} survived the round, score {}", ship.id, ship.score);
            }
        }
        world.clear_projectiles();
        reseat_all(world, rng, config);
        self.listeners.notify(&SessionEvent::Restarted);
    }

    fn on_display_frame(&mut self, world: &WorldState, since_tick: Duration) {
        self.listeners.notify(&SessionEvent::DisplayFrame { since_tick });

        let packet = Packet::GameModel(Box::new(world.clone()));
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue snapshot broadcast: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn world_with(count: u32) -> WorldState {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut world = WorldState::new();
        for id in 0..count {
            let ship = seat_new_ship(&world, ShipId(id), None, &mut rng, &config);
            world.add_ship(ship);
        }
        world
    }

    fn rules() -> (MultiplayerRules, mpsc::UnboundedReceiver<GameMessage>) {
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        (MultiplayerRules::new(game_tx, Arc::new(Listeners::new())), game_rx)
    }

    #[test]
    fn test_round_over_with_one_survivor() {
        let mut world = world_with(3);
        assert!(!is_round_over(&world));

        world.ships[0].body.destroy();
        assert!(!is_round_over(&world));

        world.ships[1].body.destroy();
        assert!(is_round_over(&world));
    }

    #[test]
    fn test_round_over_edge_cases() {
        assert!(!is_round_over(&WorldState::new()));

        let mut lone = world_with(1);
        assert!(!is_round_over(&lone));
        lone.ships[0].body.destroy();
        assert!(is_round_over(&lone));

        let mut pair = world_with(2);
        pair.ships[0].body.destroy();
        pair.ships[1].body.destroy();
        assert!(is_round_over(&pair));
    }

    #[test]
    fn test_new_ships_keep_their_distance() {
        let world = world_with(4);
        let radius = GameConfig::default().asteroid.spawn_exclusion_radius;
        for (i, a) in world.ships.iter().enumerate() {
            for b in world.ships.iter().skip(i + 1) {
                assert!(a.body.location.distance(&b.body.location) >= radius);
            }
        }
    }

    #[test]
    fn test_restart_credits_survivor_and_keeps_ships() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let (mut rules, _rx) = rules();
        let mut world = world_with(3);
        world.ships[0].score = 2;
        world.ships[0].body.destroy();
        world.ships[1].body.destroy();
        world.asteroids.push(shared::Asteroid::new(
            Vector2::new(1.0, 1.0),
            Vector2::default(),
            shared::AsteroidSize::Small,
            &config.asteroid,
        ));

        rules.restart(&mut world, &mut rng, &config);

        assert!(world.asteroids.is_empty());
        assert!(world.bullets.is_empty());
        assert_eq!(world.ships.len(), 3);
        assert_eq!(world.ships[0].score, 2);
        assert_eq!(world.ships[1].score, 0);
        assert_eq!(world.ships[2].score, 1);
        assert!(world.ships.iter().all(|ship| !ship.is_destroyed()));
    }

    #[test]
    fn test_asteroid_limit_follows_best_score() {
        let config = GameConfig::default();
        let (rules, _rx) = rules();
        let mut world = world_with(2);
        assert_eq!(rules.base_asteroid_limit(&world, &config), config.asteroid.base_limit);

        world.ships[1].score = 4;
        assert_eq!(rules.base_asteroid_limit(&world, &config), config.asteroid.base_limit);
        world.ships[1].score = 12;
        assert_eq!(rules.base_asteroid_limit(&world, &config), config.asteroid.base_limit + 2);
    }

    #[test]
    fn test_restarted_round_raises_asteroid_limit() {
        let config = GameConfig::default();
        let (rules, _rx) = rules();
        let mut sim = shared::Simulation::with_rng(config.clone(), rules, StdRng::seed_from_u64(3));
        let mut world = world_with(2);
        world.ships[0].score = 49;
        world.ships[1].body.destroy();
        assert!(sim.is_game_over(&world));

        // The survivor reaches 50 points, ten steps of five.
        sim.restart(&mut world);
        assert_eq!(world.ships[0].score, 50);
        assert_eq!(sim.asteroid_limit(), config.asteroid.base_limit + 10);
    }

    #[test]
    fn test_display_frame_queues_snapshot() {
        let (mut rules, mut rx) = rules();
        let world = world_with(2);

        rules.on_display_frame(&world, Duration::from_millis(4));

        match rx.try_recv().unwrap() {
            GameMessage::BroadcastPacket {
                packet: Packet::GameModel(snapshot),
            } => assert_eq!(*snapshot, world),
            other => panic!("unexpected message {:?}", other),
        }
    }
}
