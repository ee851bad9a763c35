//! # Asteroids Arena Server Library
//!
//! This library provides the authoritative host for a multiplayer asteroids
//! session. The host runs the only copy of the physics, owns the canonical
//! world, and streams full snapshots of it to every connected client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Ships, asteroids and bullets are advanced, collided and spawned only here.
//! Clients never simulate; they display whatever snapshot arrived last.
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Handshake with server-issued ship ids for joiners
//! - Read-only registration for spectators
//! - Ship updates accepted only from the owning address
//! - Disconnect handling and the final shutdown notice
//!
//! ### State Broadcasting
//! Once per display frame the whole world is encoded into one datagram and
//! sent to every registered address. There are no acknowledgements or
//! sequence numbers; a lost snapshot is simply superseded by the next one.
//!
//! ## Session Phases
//!
//! ### Waiting for players
//! The server answers connection requests and seats a ship for every joiner.
//! Datagrams are held to a small ceiling and any protocol desync aborts the
//! session.
//!
//! ### Running
//! The simulation task ticks at a fixed rate under a single write lock per
//! tick-and-broadcast unit, while the main loop merges incoming ship updates.
//! Rounds restart automatically when at most one ship survives.
//!
//! ### Ended
//! Every registered client receives a DISCONNECT and all tasks wind down.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! The connection registry: address → role, ship id issuance, ownership
//! checks for incoming ship updates.
//!
//! ### Game Module (`game`)
//! Multiplayer round rules plugged into the shared simulation: game-over
//! detection, survivor scoring, re-seating ships, and snapshot broadcast.
//!
//! ### Network Module (`network`)
//! Socket ownership and the async tasks around it:
//! - **Network Receiver**: decodes datagrams with the phase's size ceiling
//! - **Network Sender**: drains the outgoing queue and fans out broadcasts
//! - **Main Loop**: applies packets to the registry and world, starts the
//!   simulation when the host gives the word
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use shared::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let session = Session::new();
//!     let server = Server::bind(ServerConfig::default(), session.clone()).await?;
//!
//!     // Start the game once everyone has joined.
//!     let starter = session.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!         starter.start();
//!     });
//!
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
