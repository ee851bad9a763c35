//! Tuning values for the simulation and the network protocol.
//!
//! Everything gameplay-related lives in [`GameConfig`] so a session can be
//! reconfigured without touching code; the constants below are the defaults
//! and the fixed protocol limits.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::Duration;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 800.0;

pub const PHYSICS_FPS: u32 = 30;
pub const DISPLAY_FPS: u32 = 120;

pub const DEFAULT_PORT: u16 = 55555;

/// Bumped whenever the wire layout of any packet changes.
pub const PROTOCOL_VERSION: u16 = 1;

/// Ceiling for datagrams exchanged before the game starts.
pub const HANDSHAKE_DATAGRAM_LIMIT: usize = 512;

/// Ceiling for every datagram, including full world snapshots.
pub const MAX_DATAGRAM_SIZE: usize = 16 * 1024;

/// Ship handling constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipTuning {
    pub radius: f32,
    pub immunity_ticks: u32,
    pub max_speed: f32,
    /// Multiplied into the velocity every tick.
    pub damping: f32,
    pub acceleration: f32,
    /// Radians per tick.
    pub rotation: f32,
    pub weapon_cooldown_ticks: u32,
    pub weapon_energy_cost: f32,
    pub thrust_energy_cost: f32,
    pub turn_energy_cost: f32,
    pub energy_capacity: f32,
    pub energy_regen: f32,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            radius: 15.0,
            immunity_ticks: 10,
            max_speed: 20.0,
            damping: 0.99,
            acceleration: 0.4,
            rotation: 0.04 * PI,
            weapon_cooldown_ticks: 5,
            weapon_energy_cost: 10.0,
            thrust_energy_cost: 5.0,
            turn_energy_cost: 3.0,
            energy_capacity: 256.0,
            energy_regen: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletTuning {
    pub radius: f32,
    pub muzzle_speed: f32,
    pub immunity_ticks: u32,
    /// Ticks a bullet survives before it is removed.
    pub lifetime_ticks: u32,
}

impl Default for BulletTuning {
    fn default() -> Self {
        Self {
            radius: 1.0,
            muzzle_speed: 15.0,
            immunity_ticks: 3,
            lifetime_ticks: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidTuning {
    pub large_radius: f32,
    pub medium_radius: f32,
    pub small_radius: f32,
    pub immunity_ticks: u32,
    /// Successors left behind by a destroyed non-minimal asteroid.
    pub successors: u32,
    /// Spawn velocity is drawn from `[-max_spawn_speed, max_spawn_speed)` per axis.
    pub max_spawn_speed: f32,
    /// Minimum distance between a fresh asteroid and every living ship.
    pub spawn_exclusion_radius: f32,
    pub spawn_interval_ticks: u64,
    pub spawn_attempts: u32,
    pub base_limit: usize,
    /// The asteroid limit grows by one for every this many points of the best score.
    pub points_per_limit_step: u32,
}

impl Default for AsteroidTuning {
    fn default() -> Self {
        Self {
            large_radius: 40.0,
            medium_radius: 20.0,
            small_radius: 10.0,
            // Fragments start on one spot; this lets them drift apart first.
            immunity_ticks: 30,
            successors: 2,
            max_spawn_speed: 3.0,
            spawn_exclusion_radius: 50.0,
            spawn_interval_ticks: 200,
            spawn_attempts: 1000,
            base_limit: 7,
            points_per_limit_step: 5,
        }
    }
}

/// Complete configuration of one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub physics_fps: u32,
    pub display_fps: u32,
    /// Enables asteroid-vs-asteroid collisions.
    pub kessler_syndrome: bool,
    pub ship: ShipTuning,
    pub bullet: BulletTuning,
    pub asteroid: AsteroidTuning,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            physics_fps: PHYSICS_FPS,
            display_fps: DISPLAY_FPS,
            kessler_syndrome: false,
            ship: ShipTuning::default(),
            bullet: BulletTuning::default(),
            asteroid: AsteroidTuning::default(),
        }
    }
}

impl GameConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.physics_fps.max(1) as f64)
    }

    pub fn display_frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.display_fps.max(1) as f64)
    }

    pub fn with_kessler_syndrome(mut self, enabled: bool) -> Self {
        self.kessler_syndrome = enabled;
        self
    }
}
