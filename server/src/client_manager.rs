//! Connection registry for the multiplayer server
//!
//! This module tracks every address that completed the handshake:
//! - Joiners, each owning exactly one ship id issued by the server
//! - Spectators, which only receive snapshots
//!
//! The registry decides who receives each broadcast, who is notified on
//! shutdown, and which address may steer which ship.

use log::info;
use shared::ShipId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// What a connected client is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Plays with the ship carrying this id
    Joiner { ship_id: ShipId },
    /// Watches only
    Spectator,
}

impl Role {
    pub fn ship_id(&self) -> Option<ShipId> {
        match self {
            Role::Joiner { ship_id } => Some(*ship_id),
            Role::Spectator => None,
        }
    }
}

/// Represents a connected client
#[derive(Debug)]
pub struct Client {
    /// Network address for sending snapshots
    pub addr: SocketAddr,
    pub role: Role,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(addr: SocketAddr, role: Role) -> Self {
        Self {
            addr,
            role,
            last_seen: Instant::now(),
        }
    }

    /// Time since the last packet from this client
    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

/// Outcome of a connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First request from this address
    Admitted(Role),
    /// The address is already registered; the request is answered again
    /// with the role it was given the first time.
    AlreadyConnected(Role),
    /// The server is at capacity
    Full,
}

/// Manages all connected clients
///
/// Each address maps to exactly one client. Ship ids are handed out in
/// increasing order starting after [`ShipId::HOST`] and are never reused
/// within a session, so a reconnecting client can never inherit someone
/// else's ship.
pub struct ClientManager {
    /// Connected clients indexed by their network address
    clients: HashMap<SocketAddr, Client>,
    /// Next ship id for a joining player
    next_ship_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty registry with the given capacity limit
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_ship_id: ShipId::HOST.0 + 1,
            max_clients,
        }
    }

    /// Registers `addr` as a player and issues it a fresh ship id
    ///
    /// Repeated requests from the same address get the original answer back.
    pub fn add_joiner(&mut self, addr: SocketAddr) -> Admission {
        self.admit(addr, |manager| {
            let ship_id = ShipId(manager.next_ship_id);
            manager.next_ship_id += 1;
            Role::Joiner { ship_id }
        })
    }

    /// Registers `addr` as a spectator
    pub fn add_spectator(&mut self, addr: SocketAddr) -> Admission {
        self.admit(addr, |_| Role::Spectator)
    }

    fn admit(&mut self, addr: SocketAddr, role: impl FnOnce(&mut Self) -> Role) -> Admission {
        if let Some(client) = self.clients.get_mut(&addr) {
            client.last_seen = Instant::now();
            return Admission::AlreadyConnected(client.role);
        }
        if self.clients.len() >= self.max_clients {
            return Admission::Full;
        }

        let role = role(self);
        info!("Client {} connected as {:?}", addr, role);
        self.clients.insert(addr, Client::new(addr, role));
        Admission::Admitted(role)
    }

    /// Removes a client from the registry
    ///
    /// Returns the removed record so the caller can clean up its ship.
    pub fn remove_client(&mut self, addr: SocketAddr) -> Option<Client> {
        let client = self.clients.remove(&addr)?;
        info!(
            "Client {} disconnected (idle {:.1}s)",
            addr,
            client.idle_for().as_secs_f32()
        );
        Some(client)
    }

    pub fn get(&self, addr: SocketAddr) -> Option<&Client> {
        self.clients.get(&addr)
    }

    /// Records activity from `addr`. Returns false for unknown addresses.
    pub fn touch(&mut self, addr: SocketAddr) -> bool {
        match self.clients.get_mut(&addr) {
            Some(client) => {
                client.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// True when `addr` is the joiner that owns `ship_id`
    pub fn owns_ship(&self, addr: SocketAddr, ship_id: ShipId) -> bool {
        self.clients
            .get(&addr)
            .and_then(|client| client.role.ship_id())
            .map_or(false, |owned| owned == ship_id)
    }

    /// Gets every registered address
    ///
    /// Used for broadcasting snapshots and the final disconnect notice.
    pub fn get_client_addrs(&self) -> Vec<SocketAddr> {
        self.clients.keys().copied().collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn joiner_count(&self) -> usize {
        self.clients
            .values()
            .filter(|client| client.role.ship_id().is_some())
            .count()
    }
}
