//! Local game with one ship and no network.
//!
//! The same simulation the server runs, with rules of its own: every
//! destroyed asteroid is a point, more points mean more asteroids, and the
//! game is over when the ship goes down.

use crate::input::InputManager;
use log::info;
use rand::rngs::StdRng;
use shared::{
    GameConfig, Listeners, Session, SessionEvent, Ship, ShipId, Simulation, StepStrategy,
    Vector2, WorldState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Receives the final result of each finished game
pub trait ScoreSink: Send {
    fn record(&mut self, nickname: &str, score: u32);
}

/// Writes results to the log
#[derive(Debug, Default)]
pub struct LogScoreSink;

impl ScoreSink for LogScoreSink {
    fn record(&mut self, nickname: &str, score: u32) {
        info!("Game over: {} scored {}", nickname, score);
    }
}

impl ScoreSink for Vec<(String, u32)> {
    fn record(&mut self, nickname: &str, score: u32) {
        self.push((nickname.to_string(), score));
    }
}

fn centre(config: &GameConfig) -> Vector2 {
    Vector2::new(config.world_width / 2.0, config.world_height / 2.0)
}

pub struct SingleplayerRules<K> {
    nickname: String,
    sink: K,
    input: InputManager,
    listeners: Arc<Listeners<SessionEvent>>,
    points_per_limit_step: u32,
}

impl<K: ScoreSink> SingleplayerRules<K> {
    pub fn new(
        nickname: String,
        sink: K,
        input: InputManager,
        listeners: Arc<Listeners<SessionEvent>>,
        config: &GameConfig,
    ) -> Self {
        Self {
            nickname,
            sink,
            input,
            listeners,
            points_per_limit_step: config.asteroid.points_per_limit_step.max(1),
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The world a fresh game starts from: one ship in the middle
    pub fn initial_world(&self, config: &GameConfig) -> WorldState {
        let mut world = WorldState::new();
        world.add_ship(Ship::new(
            ShipId::HOST,
            Some(self.nickname.clone()),
            centre(config),
            &config.ship,
        ));
        world
    }
}

impl<K: ScoreSink> StepStrategy for SingleplayerRules<K> {
    fn credit_destroyed_asteroids(&mut self, world: &mut WorldState, destroyed: usize) -> usize {
        let Some(ship) = world.ship_mut(ShipId::HOST) else {
            return 0;
        };
        let before = ship.score / self.points_per_limit_step;
        ship.score += destroyed as u32;
        (ship.score / self.points_per_limit_step - before) as usize
    }

    fn is_game_over(&self, world: &WorldState) -> bool {
        world
            .ship(ShipId::HOST)
            .map_or(false, |ship| ship.is_destroyed())
    }

    fn restart(&mut self, world: &mut WorldState, _rng: &mut StdRng, config: &GameConfig) {
        if let Some(ship) = world.ship(ShipId::HOST) {
            self.sink.record(&self.nickname, ship.score);
        }
        *world = self.initial_world(config);
        if let Some(ship) = world.ship_mut(ShipId::HOST) {
            ship.controls = self.input.controls();
        }
        self.listeners.notify(&SessionEvent::Restarted);
    }

    fn on_display_frame(&mut self, _world: &WorldState, since_tick: Duration) {
        self.listeners
            .notify(&SessionEvent::DisplayFrame { since_tick });
    }
}

/// A running local game
pub struct SinglePlayer {
    world: Arc<RwLock<WorldState>>,
    session: Session,
    input: InputManager,
    listeners: Arc<Listeners<SessionEvent>>,
}

impl SinglePlayer {
    pub fn new(session: Session) -> Self {
        Self {
            world: Arc::new(RwLock::new(WorldState::new())),
            session,
            input: InputManager::new(),
            listeners: Arc::new(Listeners::new()),
        }
    }

    pub fn world(&self) -> Arc<RwLock<WorldState>> {
        Arc::clone(&self.world)
    }

    pub fn input(&self) -> InputManager {
        self.input.clone()
    }

    pub fn listeners(&self) -> Arc<Listeners<SessionEvent>> {
        Arc::clone(&self.listeners)
    }

    /// Plays until the session is ended, handing every finished game to `sink`
    pub async fn run<K: ScoreSink + 'static>(self, nickname: String, config: GameConfig, sink: K) {
        let rules = SingleplayerRules::new(
            nickname,
            sink,
            self.input.clone(),
            Arc::clone(&self.listeners),
            &config,
        );
        *self.world.write().await = rules.initial_world(&config);
        self.session.start();

        let steering = tokio::spawn(steer(
            Arc::clone(&self.world),
            self.input.clone(),
            self.session.clone(),
        ));
        Simulation::new(config, rules)
            .run(Arc::clone(&self.world), self.session.clone())
            .await;
        steering.abort();
    }
}

/// Copies every key change onto the local ship
async fn steer(world: Arc<RwLock<WorldState>>, input: InputManager, session: Session) {
    let mut phase = session.subscribe();
    while !session.is_over() {
        tokio::select! {
            _ = input.moved() => {
                let mut world = world.write().await;
                if let Some(ship) = world.ship_mut(ShipId::HOST) {
                    ship.controls = input.controls();
                }
            }
            changed = phase.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
