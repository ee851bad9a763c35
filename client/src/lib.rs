//! # Asteroids Arena Client Library
//!
//! This library provides everything a player's process needs besides
//! drawing: taking part in a hosted session as a joiner or a spectator, and
//! playing alone without a server.
//!
//! ## Architecture Overview
//!
//! The client is a thin terminal onto the authoritative server. It never
//! runs physics of its own in a networked game:
//!
//! ### Snapshot Mirroring
//! Every GAME_MODEL packet replaces the local world wholesale. The most
//! recent snapshot wins; there is no ordering, interpolation or prediction.
//! The local player's ship is looked up again by its server-issued id in
//! each snapshot.
//!
//! ### Edge-Triggered Updates
//! A joiner sends its ship to the server only when a control key changes,
//! not on a timer. The input manager wakes the sending path on each change.
//!
//! ### Single Player
//! The solo mode runs the same shared simulation locally with its own
//! scoring rules, so the game plays identically with or without a server.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The local copy of the world and the lookup of the player's own ship.
//!
//! ### Input Module (`input`)
//! The four control keys (turn left, turn right, thrust, fire), change
//! detection, and the wakeup used by the sending path.
//!
//! ### Network Module (`network`)
//! The joiner and spectator agents:
//! - Connection requests retried until answered
//! - ACCEPT/REJECT handling and protocol desync detection
//! - Ship pushes and the final DISCONNECT
//!
//! ### Single Player Module (`single_player`)
//! Solo rules on top of the shared simulation and the hand-off of final
//! scores to a [`single_player::ScoreSink`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientRole};
//! use shared::{ControlEvent, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let session = Session::new();
//!     let role = ClientRole::Joiner { nickname: "alice".into() };
//!     let client = Client::new("127.0.0.1:55555".parse()?, role, session.clone()).await?;
//!
//!     let input = client.input();
//!     input.apply(ControlEvent::Thrust(true));
//!
//!     client.run().await
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod single_player;
