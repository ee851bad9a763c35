//! Movable game objects: ships, asteroids and bullets.
//!
//! Every object wraps a [`Body`], which carries the state shared by all kinds:
//! location, per-tick velocity, radius, the destroyed flag and the collision
//! immunity countdown. Coordinates follow screen convention, so positive `y`
//! points down.

use crate::config::{AsteroidTuning, BulletTuning, ShipTuning};
use serde::{Deserialize, Serialize};

/// Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn distance_squared(&self, other: &Vector2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Vector2) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Unit vector along a facing angle; zero radians points up the screen.
    pub fn from_heading(direction: f32) -> Vector2 {
        Vector2 {
            x: direction.sin(),
            y: -direction.cos(),
        }
    }
}

/// Wraps `value` into `[0, extent)`.
fn wrap(value: f32, extent: f32) -> f32 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// State common to every movable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub location: Vector2,
    /// Displacement per tick.
    pub velocity: Vector2,
    pub radius: f32,
    pub destroyed: bool,
    /// Ticks left before this body may take part in a collision.
    pub immunity: u32,
}

impl Body {
    pub fn new(location: Vector2, velocity: Vector2, radius: f32, immunity: u32) -> Self {
        Self {
            location,
            velocity,
            radius,
            destroyed: false,
            immunity,
        }
    }

    /// Moves the body by one tick of velocity on a toroidal world and counts
    /// down its immunity.
    pub fn advance(&mut self, width: f32, height: f32) {
        self.location.x = wrap(self.location.x + self.velocity.x, width);
        self.location.y = wrap(self.location.y + self.velocity.y, height);
        self.immunity = self.immunity.saturating_sub(1);
    }

    /// Marks the body destroyed. There is no way back.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_immune(&self) -> bool {
        self.immunity > 0
    }

    pub fn speed(&self) -> f32 {
        self.velocity.magnitude()
    }

    /// True when the two bodies overlap and neither is inside its immunity window.
    pub fn collides(&self, other: &Body) -> bool {
        let reach = self.radius + other.radius;
        !self.is_immune()
            && !other.is_immune()
            && self.location.distance_squared(&other.location) < reach * reach
    }
}

/// Server-issued identity of a ship. Stable for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(pub u32);

impl ShipId {
    /// The ship flown by whoever hosts the session (or the single player).
    pub const HOST: ShipId = ShipId(0);
}

impl std::fmt::Display for ShipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Packed `0xRRGGBB` colour. Purely a rendering hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xFF_FF_FF);

    const PALETTE: [Color; 8] = [
        Color(0x33_66_FF),
        Color(0xFF_44_44),
        Color(0x44_DD_44),
        Color(0xAA_44_FF),
        Color(0xFF_99_22),
        Color(0x22_DD_DD),
        Color(0xFF_44_CC),
        Color(0xFF_EE_33),
    ];

    /// Colour for a ship: white for the host, a palette entry otherwise.
    pub fn for_ship(id: ShipId) -> Color {
        if id == ShipId::HOST {
            return Color::WHITE;
        }
        Self::PALETTE[(id.0 as usize - 1) % Self::PALETTE.len()]
    }
}

/// The four inputs a player can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Controls {
    pub turn_left: bool,
    pub turn_right: bool,
    pub thrust: bool,
    pub fire: bool,
}

/// A key going down (`true`) or up (`false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    TurnLeft(bool),
    TurnRight(bool),
    Thrust(bool),
    Fire(bool),
}

impl ControlEvent {
    /// Parses a console command such as `+thrust` or `-left`.
    ///
    /// `+` presses the key and `-` releases it. Returns `None` for anything
    /// else.
    pub fn parse(command: &str) -> Option<ControlEvent> {
        let command = command.trim();
        let (pressed, key) = if let Some(key) = command.strip_prefix('+') {
            (true, key)
        } else {
            (false, command.strip_prefix('-')?)
        };
        match key.to_ascii_lowercase().as_str() {
            "left" => Some(ControlEvent::TurnLeft(pressed)),
            "right" => Some(ControlEvent::TurnRight(pressed)),
            "thrust" | "up" => Some(ControlEvent::Thrust(pressed)),
            "fire" | "space" => Some(ControlEvent::Fire(pressed)),
            _ => None,
        }
    }
}

impl Controls {
    /// Applies an input edge and reports whether anything changed.
    pub fn apply(&mut self, event: ControlEvent) -> bool {
        let (slot, pressed) = match event {
            ControlEvent::TurnLeft(p) => (&mut self.turn_left, p),
            ControlEvent::TurnRight(p) => (&mut self.turn_right, p),
            ControlEvent::Thrust(p) => (&mut self.thrust, p),
            ControlEvent::Fire(p) => (&mut self.fire, p),
        };
        let changed = *slot != pressed;
        *slot = pressed;
        changed
    }

    /// -1 for left, 1 for right, 0 when idle or when both keys cancel out.
    fn turn_direction(&self) -> f32 {
        match (self.turn_left, self.turn_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// A player's ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub nickname: Option<String>,
    pub color: Color,
    pub body: Body,
    /// Facing in radians, zero pointing up.
    pub direction: f32,
    pub energy: f32,
    pub weapon_cooldown: u32,
    pub score: u32,
    pub controls: Controls,
}

impl Ship {
    pub fn new(
        id: ShipId,
        nickname: Option<String>,
        location: Vector2,
        tuning: &ShipTuning,
    ) -> Self {
        Self {
            id,
            nickname,
            color: Color::for_ship(id),
            body: Body::new(location, Vector2::default(), tuning.radius, tuning.immunity_ticks),
            direction: 0.0,
            energy: tuning.energy_capacity,
            weapon_cooldown: 0,
            score: 0,
            controls: Controls::default(),
        }
    }

    /// Puts the ship back into play at `location`, keeping identity and score.
    pub fn respawn_at(&mut self, location: Vector2, tuning: &ShipTuning) {
        self.body = Body::new(location, Vector2::default(), tuning.radius, tuning.immunity_ticks);
        self.direction = 0.0;
        self.energy = tuning.energy_capacity;
        self.weapon_cooldown = 0;
        self.controls = Controls::default();
    }

    pub fn is_destroyed(&self) -> bool {
        self.body.destroyed
    }

    /// Advances the ship by one tick: movement, then turning, thrust,
    /// damping, weapon cooldown and energy regeneration.
    pub fn step(&mut self, width: f32, height: f32, tuning: &ShipTuning) {
        self.body.advance(width, height);

        let turn = self.controls.turn_direction();
        if turn != 0.0 && self.energy >= tuning.turn_energy_cost {
            self.direction += turn * tuning.rotation;
            self.energy -= tuning.turn_energy_cost;
        }

        if self.controls.thrust
            && self.energy >= tuning.thrust_energy_cost
            && self.body.speed() < tuning.max_speed
        {
            let push = Vector2::from_heading(self.direction).scale(tuning.acceleration);
            self.body.velocity = self.body.velocity.add(&push);
            self.energy -= tuning.thrust_energy_cost;
        }

        self.body.velocity = self.body.velocity.scale(tuning.damping);
        self.weapon_cooldown = self.weapon_cooldown.saturating_sub(1);
        self.energy = (self.energy + tuning.energy_regen).min(tuning.energy_capacity);
    }

    pub fn can_fire(&self, tuning: &ShipTuning) -> bool {
        !self.is_destroyed()
            && self.controls.fire
            && self.weapon_cooldown == 0
            && self.energy >= tuning.weapon_energy_cost
    }

    /// Fires one bullet from the ship's centre and starts the cooldown.
    pub fn fire(&mut self, ship_tuning: &ShipTuning, bullet_tuning: &BulletTuning) -> Bullet {
        self.weapon_cooldown = ship_tuning.weapon_cooldown_ticks;
        self.energy -= ship_tuning.weapon_energy_cost;
        let muzzle = Vector2::from_heading(self.direction).scale(bullet_tuning.muzzle_speed);
        Bullet::new(self.body.location, self.body.velocity.add(&muzzle), bullet_tuning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsteroidSize {
    Large,
    Medium,
    Small,
}

impl AsteroidSize {
    pub fn radius(&self, tuning: &AsteroidTuning) -> f32 {
        match self {
            AsteroidSize::Large => tuning.large_radius,
            AsteroidSize::Medium => tuning.medium_radius,
            AsteroidSize::Small => tuning.small_radius,
        }
    }

    /// Tier of the successors left behind; `None` for the minimal tier.
    pub fn smaller(&self) -> Option<AsteroidSize> {
        match self {
            AsteroidSize::Large => Some(AsteroidSize::Medium),
            AsteroidSize::Medium => Some(AsteroidSize::Small),
            AsteroidSize::Small => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub body: Body,
    pub size: AsteroidSize,
}

impl Asteroid {
    pub fn new(
        location: Vector2,
        velocity: Vector2,
        size: AsteroidSize,
        tuning: &AsteroidTuning,
    ) -> Self {
        Self {
            body: Body::new(location, velocity, size.radius(tuning), tuning.immunity_ticks),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub body: Body,
    /// Ticks left before the bullet fizzles out.
    pub lifetime: u32,
}

impl Bullet {
    pub fn new(location: Vector2, velocity: Vector2, tuning: &BulletTuning) -> Self {
        Self {
            body: Body::new(location, velocity, tuning.radius, tuning.immunity_ticks),
            lifetime: tuning.lifetime_ticks,
        }
    }

    pub fn step(&mut self, width: f32, height: f32) {
        self.body.advance(width, height);
        self.lifetime = self.lifetime.saturating_sub(1);
        if self.lifetime == 0 {
            self.body.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WORLD_HEIGHT, WORLD_WIDTH};
    use assert_approx_eq::assert_approx_eq;

    fn ship_at(x: f32, y: f32) -> Ship {
        Ship::new(ShipId(1), Some("tester".into()), Vector2::new(x, y), &ShipTuning::default())
    }

    #[test]
    fn test_body_wraps_both_axes() {
        let mut body = Body::new(Vector2::new(795.0, 2.0), Vector2::new(10.0, -5.0), 1.0, 0);
        body.advance(WORLD_WIDTH, WORLD_HEIGHT);
        assert_approx_eq!(body.location.x, 5.0, 1e-4);
        assert_approx_eq!(body.location.y, 797.0, 1e-4);
    }

    #[test]
    fn test_wrap_never_returns_extent() {
        assert_eq!(wrap(-1e-9, 800.0), 0.0);
        assert_eq!(wrap(800.0, 800.0), 0.0);
        assert!(wrap(-0.5, 800.0) < 800.0);
    }

    #[test]
    fn test_immunity_counts_down_to_zero() {
        let mut body = Body::new(Vector2::default(), Vector2::default(), 1.0, 2);
        assert!(body.is_immune());
        body.advance(WORLD_WIDTH, WORLD_HEIGHT);
        body.advance(WORLD_WIDTH, WORLD_HEIGHT);
        assert!(!body.is_immune());
        body.advance(WORLD_WIDTH, WORLD_HEIGHT);
        assert_eq!(body.immunity, 0);
    }

    #[test]
    fn test_collides_requires_overlap_and_no_immunity() {
        let a = Body::new(Vector2::new(0.0, 0.0), Vector2::default(), 10.0, 0);
        let b = Body::new(Vector2::new(15.0, 0.0), Vector2::default(), 10.0, 0);
        let far = Body::new(Vector2::new(20.0, 0.0), Vector2::default(), 10.0, 0);
        let immune = Body::new(Vector2::new(5.0, 0.0), Vector2::default(), 10.0, 1);

        assert!(a.collides(&b));
        assert!(b.collides(&a));
        assert!(!a.collides(&far), "touching is not overlapping");
        assert!(!a.collides(&immune));
        assert!(!immune.collides(&a));
    }

    #[test]
    fn test_controls_report_changes() {
        let mut controls = Controls::default();
        assert!(controls.apply(ControlEvent::Thrust(true)));
        assert!(!controls.apply(ControlEvent::Thrust(true)));
        assert!(controls.apply(ControlEvent::Thrust(false)));
        assert!(controls.apply(ControlEvent::Fire(true)));
        assert!(controls.fire);
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(ControlEvent::parse("+thrust"), Some(ControlEvent::Thrust(true)));
        assert_eq!(ControlEvent::parse(" -LEFT\n"), Some(ControlEvent::TurnLeft(false)));
        assert_eq!(ControlEvent::parse("+space"), Some(ControlEvent::Fire(true)));
        assert_eq!(ControlEvent::parse("thrust"), None);
        assert_eq!(ControlEvent::parse("+jump"), None);
        assert_eq!(ControlEvent::parse(""), None);
    }

    #[test]
    fn test_ship_thrust_costs_energy_and_moves_up() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(400.0, 400.0);
        ship.controls.thrust = true;
        ship.step(WORLD_WIDTH, WORLD_HEIGHT, &tuning);

        assert!(ship.body.velocity.y < 0.0);
        assert_approx_eq!(ship.body.velocity.x, 0.0, 1e-5);
        // Started full: pays 5 for thrust, regains 3 but capped at capacity.
        assert_approx_eq!(ship.energy, tuning.energy_capacity - 2.0, 1e-4);
    }

    #[test]
    fn test_ship_turn_keys_cancel_without_cost() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(400.0, 400.0);
        ship.energy = 100.0;
        ship.controls.turn_left = true;
        ship.controls.turn_right = true;
        ship.step(WORLD_WIDTH, WORLD_HEIGHT, &tuning);

        assert_eq!(ship.direction, 0.0);
        assert_approx_eq!(ship.energy, 103.0, 1e-4);
    }

    #[test]
    fn test_ship_cannot_turn_without_energy() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(400.0, 400.0);
        ship.energy = 1.0;
        ship.controls.turn_right = true;
        ship.step(WORLD_WIDTH, WORLD_HEIGHT, &tuning);

        assert_eq!(ship.direction, 0.0);
        assert_approx_eq!(ship.energy, 4.0, 1e-4);
    }

    #[test]
    fn test_ship_speed_is_capped_by_thrust_rule() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(400.0, 400.0);
        ship.controls.thrust = true;
        for _ in 0..2000 {
            ship.energy = tuning.energy_capacity;
            ship.step(WORLD_WIDTH, WORLD_HEIGHT, &tuning);
        }
        assert!(ship.body.speed() < tuning.max_speed + tuning.acceleration);
    }

    #[test]
    fn test_ship_coasts_to_rest() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(400.0, 400.0);
        ship.body.velocity = Vector2::new(5.0, 5.0);
        for _ in 0..2000 {
            ship.step(WORLD_WIDTH, WORLD_HEIGHT, &tuning);
        }
        assert!(ship.body.speed() < 0.01);
    }

    #[test]
    fn test_fire_rules_and_bullet_velocity() {
        let ship_tuning = ShipTuning::default();
        let bullet_tuning = BulletTuning::default();
        let mut ship = ship_at(100.0, 100.0);
        ship.body.velocity = Vector2::new(1.0, 0.0);

        assert!(!ship.can_fire(&ship_tuning), "fire key not held");
        ship.controls.fire = true;
        assert!(ship.can_fire(&ship_tuning));

        let bullet = ship.fire(&ship_tuning, &bullet_tuning);
        assert_approx_eq!(bullet.body.velocity.x, 1.0, 1e-5);
        assert_approx_eq!(bullet.body.velocity.y, -15.0, 1e-5);
        assert_eq!(bullet.body.location, ship.body.location);
        assert_eq!(ship.weapon_cooldown, ship_tuning.weapon_cooldown_ticks);
        assert!(!ship.can_fire(&ship_tuning), "weapon cooling down");
    }

    #[test]
    fn test_destroyed_ship_cannot_fire() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(100.0, 100.0);
        ship.controls.fire = true;
        ship.body.destroy();
        assert!(!ship.can_fire(&tuning));
    }

    #[test]
    fn test_respawn_keeps_identity_and_score() {
        let tuning = ShipTuning::default();
        let mut ship = ship_at(10.0, 10.0);
        ship.score = 4;
        ship.energy = 3.0;
        ship.body.destroy();
        ship.respawn_at(Vector2::new(300.0, 300.0), &tuning);

        assert_eq!(ship.id, ShipId(1));
        assert_eq!(ship.score, 4);
        assert!(!ship.is_destroyed());
        assert_eq!(ship.energy, tuning.energy_capacity);
        assert_eq!(ship.body.immunity, tuning.immunity_ticks);
    }

    #[test]
    fn test_bullet_expires() {
        let tuning = BulletTuning {
            lifetime_ticks: 2,
            ..BulletTuning::default()
        };
        let mut bullet = Bullet::new(Vector2::default(), Vector2::new(1.0, 1.0), &tuning);
        bullet.step(WORLD_WIDTH, WORLD_HEIGHT);
        assert!(!bullet.body.destroyed);
        bullet.step(WORLD_WIDTH, WORLD_HEIGHT);
        assert!(bullet.body.destroyed);
    }

    #[test]
    fn test_asteroid_tiers() {
        let tuning = AsteroidTuning::default();
        assert_eq!(AsteroidSize::Large.smaller(), Some(AsteroidSize::Medium));
        assert_eq!(AsteroidSize::Medium.smaller(), Some(AsteroidSize::Small));
        assert_eq!(AsteroidSize::Small.smaller(), None);
        assert!(AsteroidSize::Large.radius(&tuning) > AsteroidSize::Small.radius(&tuning));
    }

    #[test]
    fn test_palette_colors() {
        assert_eq!(Color::for_ship(ShipId::HOST), Color::WHITE);
        assert_ne!(Color::for_ship(ShipId(1)), Color::for_ship(ShipId(2)));
        assert_eq!(Color::for_ship(ShipId(1)), Color::for_ship(ShipId(9)));
    }
}
