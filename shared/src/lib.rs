//! # Asteroids Arena Shared Library
//!
//! Everything the server and the clients have in common: the game objects,
//! the world they live in, the physics step with its collision engine, and
//! the datagram protocol used to keep clients in sync with the server.
//!
//! ## Module Overview
//!
//! - [`entity`] - Ships, asteroids, bullets and the body they share
//! - [`world`] - The full game state and ship lookup/merge by id
//! - [`collision`] - Pairwise collision pass with type exclusion and immunity
//! - [`spawn`] - Asteroid placement and fragmentation
//! - [`sim`] - Tick scheduling and the mode-independent physics step
//! - [`protocol`] - Packet types and their versioned binary encoding
//! - [`session`] - Session phases and cooperative shutdown
//! - [`events`] - Callback registry for display and connection events
//! - [`config`] - Tuning values and protocol constants

pub mod collision;
pub mod config;
pub mod entity;
pub mod events;
pub mod protocol;
pub mod session;
pub mod sim;
pub mod spawn;
pub mod world;

pub use config::{GameConfig, DEFAULT_PORT, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
pub use entity::{Asteroid, AsteroidSize, Bullet, ControlEvent, Controls, Ship, ShipId, Vector2};
pub use events::{Listeners, SessionEvent};
pub use protocol::{Packet, PacketType, ProtocolError};
pub use session::{Phase, Session};
pub use sim::{Simulation, StepStrategy, TickScheduler};
pub use world::{MergeOutcome, WorldState};
