//! Collision engine.
//!
//! Objects of the same kind never collide with each other, except asteroids
//! when the Kessler syndrome toggle is on. Pairs are checked in a fixed order:
//! bullet×asteroid, bullet×ship, asteroid×ship, then asteroid×asteroid. Both
//! members of a colliding pair are destroyed. A ship that is already destroyed
//! is skipped, so it absorbs at most one hit per tick.

use crate::world::WorldState;

/// Which same-kind pairs are allowed to collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionPolicy {
    pub kessler_syndrome: bool,
}

/// What a collision pass destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionReport {
    pub bullet_asteroid: usize,
    pub bullet_ship: usize,
    pub asteroid_ship: usize,
    pub asteroid_asteroid: usize,
}

impl CollisionReport {
    pub fn total(&self) -> usize {
        self.bullet_asteroid + self.bullet_ship + self.asteroid_ship + self.asteroid_asteroid
    }
}

/// Runs one collision pass over `world`, marking destroyed objects in place.
pub fn resolve_collisions(world: &mut WorldState, policy: CollisionPolicy) -> CollisionReport {
    let mut report = CollisionReport::default();
    let WorldState {
        asteroids,
        bullets,
        ships,
    } = world;

    for bullet in bullets.iter_mut() {
        for asteroid in asteroids.iter_mut() {
            if asteroid.body.collides(&bullet.body) {
                asteroid.body.destroy();
                bullet.body.destroy();
                report.bullet_asteroid += 1;
            }
        }
        for ship in ships.iter_mut() {
            if !ship.is_destroyed() && ship.body.collides(&bullet.body) {
                bullet.body.destroy();
                ship.body.destroy();
                report.bullet_ship += 1;
            }
        }
    }

    for asteroid in asteroids.iter_mut() {
        for ship in ships.iter_mut() {
            if !ship.is_destroyed() && asteroid.body.collides(&ship.body) {
                asteroid.body.destroy();
                ship.body.destroy();
                report.asteroid_ship += 1;
            }
        }
    }

    if policy.kessler_syndrome {
        for i in 0..asteroids.len() {
            let (head, tail) = asteroids.split_at_mut(i + 1);
            let first = &mut head[i];
            for second in tail.iter_mut() {
                if first.body.collides(&second.body) {
                    first.body.destroy();
                    second.body.destroy();
                    report.asteroid_asteroid += 1;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AsteroidTuning, BulletTuning, ShipTuning};
    use crate::entity::{Asteroid, AsteroidSize, Bullet, Ship, ShipId, Vector2};

    fn asteroid_at(x: f32, y: f32) -> Asteroid {
        let mut asteroid = Asteroid::new(
            Vector2::new(x, y),
            Vector2::default(),
            AsteroidSize::Medium,
            &AsteroidTuning::default(),
        );
        asteroid.body.immunity = 0;
        asteroid
    }

    fn bullet_at(x: f32, y: f32) -> Bullet {
        let mut bullet = Bullet::new(Vector2::new(x, y), Vector2::default(), &BulletTuning::default());
        bullet.body.immunity = 0;
        bullet
    }

    fn ship_at(id: u32, x: f32, y: f32) -> Ship {
        let mut ship = Ship::new(ShipId(id), None, Vector2::new(x, y), &ShipTuning::default());
        ship.body.immunity = 0;
        ship
    }

    #[test]
    fn test_bullet_destroys_asteroid_symmetrically() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(100.0, 100.0)],
            bullets: vec![bullet_at(105.0, 100.0)],
            ships: vec![],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.bullet_asteroid, 1);
        assert!(world.asteroids[0].body.destroyed);
        assert!(world.bullets[0].body.destroyed);
    }

    #[test]
    fn test_bullet_destroys_ship() {
        let mut world = WorldState {
            asteroids: vec![],
            bullets: vec![bullet_at(300.0, 300.0)],
            ships: vec![ship_at(1, 305.0, 300.0)],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.bullet_ship, 1);
        assert!(world.ships[0].is_destroyed());
        assert!(world.bullets[0].body.destroyed);
    }

    #[test]
    fn test_asteroid_destroys_ship() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(200.0, 200.0)],
            bullets: vec![],
            ships: vec![ship_at(1, 220.0, 200.0)],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.asteroid_ship, 1);
        assert!(world.ships[0].is_destroyed());
        assert!(world.asteroids[0].body.destroyed);
    }

    #[test]
    fn test_immune_ship_survives_overlap() {
        let mut ship = ship_at(1, 200.0, 200.0);
        ship.body.immunity = 1;
        let mut world = WorldState {
            asteroids: vec![asteroid_at(200.0, 200.0)],
            bullets: vec![bullet_at(200.0, 200.0)],
            ships: vec![ship],
        };
        resolve_collisions(&mut world, CollisionPolicy::default());

        assert!(!world.ships[0].is_destroyed());
        // The bullet and asteroid still hit each other.
        assert!(world.asteroids[0].body.destroyed);
    }

    #[test]
    fn test_freshly_fired_bullet_is_immune() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(50.0, 50.0)],
            bullets: vec![Bullet::new(
                Vector2::new(50.0, 50.0),
                Vector2::default(),
                &BulletTuning::default(),
            )],
            ships: vec![],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.total(), 0);
        assert!(!world.asteroids[0].body.destroyed);
    }

    #[test]
    fn test_same_kind_never_collides() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(10.0, 10.0), asteroid_at(12.0, 10.0)],
            bullets: vec![bullet_at(500.0, 500.0), bullet_at(500.0, 500.0)],
            ships: vec![ship_at(1, 700.0, 700.0), ship_at(2, 705.0, 700.0)],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.total(), 0);
        assert!(world.asteroids.iter().all(|a| !a.body.destroyed));
        assert!(world.bullets.iter().all(|b| !b.body.destroyed));
        assert!(world.ships.iter().all(|s| !s.is_destroyed()));
    }

    #[test]
    fn test_kessler_syndrome_enables_asteroid_pairs() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(10.0, 10.0), asteroid_at(12.0, 10.0), asteroid_at(600.0, 600.0)],
            bullets: vec![],
            ships: vec![],
        };
        let report = resolve_collisions(
            &mut world,
            CollisionPolicy {
                kessler_syndrome: true,
            },
        );

        assert_eq!(report.asteroid_asteroid, 1);
        assert!(world.asteroids[0].body.destroyed);
        assert!(world.asteroids[1].body.destroyed);
        assert!(!world.asteroids[2].body.destroyed);
    }

    #[test]
    fn test_destroyed_ship_absorbs_only_one_hit() {
        let mut world = WorldState {
            asteroids: vec![asteroid_at(405.0, 430.0)],
            bullets: vec![bullet_at(400.0, 400.0)],
            ships: vec![ship_at(1, 405.0, 400.0)],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.bullet_ship, 1);
        assert_eq!(report.asteroid_ship, 0);
        assert!(world.ships[0].is_destroyed());
        assert!(!world.asteroids[0].body.destroyed);
    }

    #[test]
    fn test_first_bullet_claims_ship() {
        let mut world = WorldState {
            asteroids: vec![],
            bullets: vec![bullet_at(400.0, 400.0), bullet_at(401.0, 400.0)],
            ships: vec![ship_at(1, 405.0, 400.0)],
        };
        let report = resolve_collisions(&mut world, CollisionPolicy::default());

        assert_eq!(report.bullet_ship, 1);
        assert!(world.bullets[0].body.destroyed);
        assert!(!world.bullets[1].body.destroyed);
    }
}
