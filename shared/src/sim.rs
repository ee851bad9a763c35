//! Fixed-rate simulation loop.
//!
//! [`TickScheduler`] decides when a physics step and a display frame are due,
//! [`Simulation`] performs the step, and a [`StepStrategy`] supplies the parts
//! that differ between single-player and multiplayer play.

use crate::collision::{resolve_collisions, CollisionPolicy, CollisionReport};
use crate::config::GameConfig;
use crate::entity::Vector2;
use crate::session::Session;
use crate::spawn::{find_spawn_location, random_asteroid, successors};
use crate::world::WorldState;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// What [`TickScheduler::advance`] found due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub physics: bool,
    pub display: bool,
    /// Time accumulated towards the next physics step.
    pub since_tick: Duration,
}

/// Two independent accumulators, one per cadence.
///
/// Each call to [`advance`](TickScheduler::advance) runs at most one physics
/// step no matter how much time passed; a due counter is reset to zero rather
/// than carrying the remainder.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    tick: Duration,
    frame: Duration,
    since_tick: Duration,
    since_frame: Duration,
}

impl TickScheduler {
    pub fn new(tick: Duration, frame: Duration) -> Self {
        Self {
            tick,
            frame,
            since_tick: Duration::ZERO,
            since_frame: Duration::ZERO,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.tick_duration(), config.display_frame_duration())
    }

    pub fn advance(&mut self, elapsed: Duration) -> Cadence {
        self.since_tick += elapsed;
        self.since_frame += elapsed;

        let physics = self.since_tick >= self.tick;
        if physics {
            self.since_tick = Duration::ZERO;
        }
        let display = self.since_frame >= self.frame;
        if display {
            self.since_frame = Duration::ZERO;
        }

        Cadence {
            physics,
            display,
            since_tick: self.since_tick,
        }
    }

    /// How long until either cadence is next due.
    pub fn until_next(&self) -> Duration {
        let tick = self.tick.saturating_sub(self.since_tick);
        let frame = self.frame.saturating_sub(self.since_frame);
        tick.min(frame)
    }

    pub fn reset(&mut self) {
        self.since_tick = Duration::ZERO;
        self.since_frame = Duration::ZERO;
    }
}

/// The pieces of a physics step that depend on the game mode.
pub trait StepStrategy: Send {
    /// Points fresh asteroids must keep their distance from.
    fn spawn_exclusion_points(&self, world: &WorldState) -> Vec<Vector2> {
        world
            .alive_ships()
            .map(|ship| ship.body.location)
            .collect()
    }

    /// Called with the number of asteroids destroyed during a step. Returns how
    /// many steps the asteroid limit should grow by.
    fn credit_destroyed_asteroids(&mut self, _world: &mut WorldState, _destroyed: usize) -> usize {
        0
    }

    /// The asteroid limit a fresh round starts from.
    fn base_asteroid_limit(&self, _world: &WorldState, config: &GameConfig) -> usize {
        config.asteroid.base_limit
    }

    fn is_game_over(&self, world: &WorldState) -> bool;

    /// Rebuilds the world for the next round.
    fn restart(&mut self, world: &mut WorldState, rng: &mut StdRng, config: &GameConfig);

    /// Runs once per display frame, inside the same critical section as the
    /// preceding step.
    fn on_display_frame(&mut self, _world: &WorldState, _since_tick: Duration) {}
}

pub struct Simulation<S> {
    config: GameConfig,
    strategy: S,
    rng: StdRng,
    tick_count: u64,
    asteroid_limit: usize,
}

impl<S: StepStrategy> Simulation<S> {
    pub fn new(config: GameConfig, strategy: S) -> Self {
        Self::with_rng(config, strategy, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, strategy: S, rng: StdRng) -> Self {
        let asteroid_limit = config.asteroid.base_limit;
        Self {
            config,
            strategy,
            rng,
            tick_count: 0,
            asteroid_limit,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn asteroid_limit(&self) -> usize {
        self.asteroid_limit
    }

    /// Performs one physics step.
    pub fn step(&mut self, world: &mut WorldState) -> CollisionReport {
        let config = &self.config;
        let (width, height) = (config.world_width, config.world_height);

        for asteroid in &mut world.asteroids {
            asteroid.body.advance(width, height);
        }
        for bullet in &mut world.bullets {
            bullet.step(width, height);
        }
        for ship in &mut world.ships {
            if !ship.is_destroyed() {
                ship.step(width, height, &config.ship);
            }
        }

        for ship in &mut world.ships {
            if ship.can_fire(&config.ship) {
                let bullet = ship.fire(&config.ship, &config.bullet);
                world.bullets.push(bullet);
            }
        }

        let report = resolve_collisions(
            world,
            CollisionPolicy {
                kessler_syndrome: config.kessler_syndrome,
            },
        );

        let mut fragments = Vec::new();
        let mut destroyed = 0;
        for asteroid in world.asteroids.iter().filter(|a| a.body.destroyed) {
            destroyed += 1;
            fragments.extend(successors(asteroid, &mut self.rng, &config.asteroid));
        }
        world.asteroids.retain(|asteroid| !asteroid.body.destroyed);
        world.asteroids.extend(fragments);
        world.bullets.retain(|bullet| !bullet.body.destroyed);

        if destroyed > 0 {
            self.asteroid_limit += self.strategy.credit_destroyed_asteroids(world, destroyed);
        }

        if self.tick_count % config.asteroid.spawn_interval_ticks.max(1) == 0
            && world.asteroids.len() < self.asteroid_limit
        {
            self.spawn_asteroid(world);
        }
        self.tick_count += 1;

        report
    }

    fn spawn_asteroid(&mut self, world: &mut WorldState) {
        let exclusion = self.strategy.spawn_exclusion_points(world);
        match find_spawn_location(&mut self.rng, &exclusion, &self.config) {
            Some(location) => {
                let asteroid = random_asteroid(&mut self.rng, location, &self.config.asteroid);
                world.asteroids.push(asteroid);
            }
            None => debug!("No free spot for a new asteroid, skipping spawn"),
        }
    }

    pub fn is_game_over(&self, world: &WorldState) -> bool {
        self.strategy.is_game_over(world)
    }

    /// Starts a new round: the strategy rebuilds the world, the spawn
    /// counter goes back to zero and the asteroid limit to whatever the
    /// strategy starts a round from.
    pub fn restart(&mut self, world: &mut WorldState) {
        self.strategy.restart(world, &mut self.rng, &self.config);
        self.tick_count = 0;
        self.asteroid_limit = self.strategy.base_asteroid_limit(world, &self.config);
    }

    /// Drives the simulation until `session` finishes.
    ///
    /// Each due step, and the display frame that follows it, runs under a
    /// single write lock, so readers never see a half-finished tick.
    pub async fn run(mut self, world: Arc<RwLock<WorldState>>, session: Session) {
        let mut scheduler = TickScheduler::from_config(&self.config);
        let mut phase = session.subscribe();
        let mut previous = Instant::now();

        info!("Simulation started");
        while !session.is_over() {
            let now = Instant::now();
            let cadence = scheduler.advance(now - previous);
            previous = now;

            {
                let mut world = world.write().await;
                if self.is_game_over(&world) {
                    info!("Round over, restarting");
                    self.restart(&mut world);
                    scheduler.reset();
                }
                if cadence.physics {
                    self.step(&mut world);
                }
                if cadence.display {
                    self.strategy.on_display_frame(&world, cadence.since_tick);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(scheduler.until_next()) => {}
                changed = phase.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Simulation stopped after {} ticks", self.tick_count);
    }
}
