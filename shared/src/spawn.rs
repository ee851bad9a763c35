//! Random placement of asteroids and ships.

use crate::config::{AsteroidTuning, GameConfig};
use crate::entity::{Asteroid, AsteroidSize, Vector2};
use rand::Rng;

/// Picks a uniformly random point of the world that lies at least the
/// exclusion radius away from every point in `exclusion_points`.
///
/// Gives up after `spawn_attempts` draws and returns `None`.
pub fn find_spawn_location<R: Rng + ?Sized>(
    rng: &mut R,
    exclusion_points: &[Vector2],
    config: &GameConfig,
) -> Option<Vector2> {
    let radius = config.asteroid.spawn_exclusion_radius;
    let min_distance_squared = radius * radius;

    for _ in 0..config.asteroid.spawn_attempts.max(1) {
        let candidate = random_location(rng, config);
        if exclusion_points
            .iter()
            .all(|point| point.distance_squared(&candidate) >= min_distance_squared)
        {
            return Some(candidate);
        }
    }
    None
}

/// Uniformly random point inside the world bounds.
pub fn random_location<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> Vector2 {
    Vector2::new(
        rng.gen_range(0.0..config.world_width),
        rng.gen_range(0.0..config.world_height),
    )
}

fn random_velocity<R: Rng + ?Sized>(rng: &mut R, tuning: &AsteroidTuning) -> Vector2 {
    let max = tuning.max_spawn_speed;
    if max <= 0.0 {
        return Vector2::default();
    }
    Vector2::new(rng.gen_range(-max..max), rng.gen_range(-max..max))
}

fn random_size<R: Rng + ?Sized>(rng: &mut R) -> AsteroidSize {
    let roll: f32 = rng.gen();
    if roll < 0.333 {
        AsteroidSize::Large
    } else if roll < 0.666 {
        AsteroidSize::Medium
    } else {
        AsteroidSize::Small
    }
}

/// A fresh asteroid of random tier and velocity at `location`.
pub fn random_asteroid<R: Rng + ?Sized>(
    rng: &mut R,
    location: Vector2,
    tuning: &AsteroidTuning,
) -> Asteroid {
    let velocity = random_velocity(rng, tuning);
    Asteroid::new(location, velocity, random_size(rng), tuning)
}

/// Pieces left behind by a destroyed asteroid: `successors` asteroids of the
/// next smaller tier at the same spot, each with its own random velocity.
/// The smallest tier leaves nothing.
pub fn successors<R: Rng + ?Sized>(
    asteroid: &Asteroid,
    rng: &mut R,
    tuning: &AsteroidTuning,
) -> Vec<Asteroid> {
    let Some(size) = asteroid.size.smaller() else {
        return Vec::new();
    };
    (0..tuning.successors)
        .map(|_| {
            let velocity = random_velocity(rng, tuning);
            Asteroid::new(asteroid.body.location, velocity, size, tuning)
        })
        .collect()
}
