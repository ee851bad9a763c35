//! Server network layer: connection handshake, running-phase reception and
//! snapshot fan-out

use crate::client_manager::{Admission, ClientManager};
use crate::game::{seat_new_ship, MultiplayerRules};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::config::HANDSHAKE_DATAGRAM_LIMIT;
use shared::protocol::receive_buffer;
use shared::{
    ControlEvent, GameConfig, Listeners, MergeOutcome, Packet, ProtocolError, Session,
    SessionEvent, ShipId, Simulation, WorldState, DEFAULT_PORT, MAX_DATAGRAM_SIZE,
};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Messages sent from the network receiver to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
}

/// Messages sent to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    /// Goes to every registered client
    BroadcastPacket { packet: Packet },
}

/// Everything needed to open a hosted session
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Nickname of the host's own ship
    pub nickname: String,
    pub max_clients: usize,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            nickname: "host".to_string(),
            max_clients: 16,
            game: GameConfig::default(),
        }
    }
}

/// What the main loop should do after handling one packet
#[derive(Debug, Default, PartialEq)]
pub struct Response {
    pub reply: Option<Packet>,
    pub registry_changed: bool,
}

impl Response {
    fn reply(packet: Packet) -> Self {
        Self {
            reply: Some(packet),
            registry_changed: false,
        }
    }
}

fn admission_reply(admission: Admission, addr: SocketAddr) -> Response {
    match admission {
        Admission::Admitted(role) => Response {
            reply: Some(Packet::AcceptConnection {
                ship_id: role.ship_id(),
            }),
            registry_changed: true,
        },
        Admission::AlreadyConnected(role) => Response::reply(Packet::AcceptConnection {
            ship_id: role.ship_id(),
        }),
        Admission::Full => {
            warn!("Rejecting {}: server full", addr);
            Response::reply(Packet::RejectConnection)
        }
    }
}

fn disconnect(clients: &mut ClientManager, world: &mut WorldState, addr: SocketAddr) -> Response {
    let Some(client) = clients.remove_client(addr) else {
        debug!("Disconnect from unknown address {}", addr);
        return Response::default();
    };
    if let Some(ship_id) = client.role.ship_id() {
        world.remove_ship(ship_id);
    }
    Response {
        reply: None,
        registry_changed: true,
    }
}

/// Handles a packet received before the game starts
///
/// Joiners get a fresh ship seated away from the others; spectators are
/// only registered. Repeated requests are answered with the original id.
pub fn handle_connection_packet(
    clients: &mut ClientManager,
    world: &mut WorldState,
    packet: Packet,
    addr: SocketAddr,
    rng: &mut StdRng,
    config: &GameConfig,
) -> Response {
    match packet {
        Packet::RequestConnectionJoiner { nickname } => {
            let admission = clients.add_joiner(addr);
            if let Admission::Admitted(role) = admission {
                if let Some(ship_id) = role.ship_id() {
                    let ship = seat_new_ship(world, ship_id, Some(nickname), rng, config);
                    world.add_ship(ship);
                }
            }
            admission_reply(admission, addr)
        }
        Packet::RequestConnectionSpectator => admission_reply(clients.add_spectator(addr), addr),
        Packet::Disconnect => disconnect(clients, world, addr),
        other => {
            debug!(
                "Ignoring {:?} from {} while waiting for players",
                other.packet_type(),
                addr
            );
            Response::default()
        }
    }
}

/// Handles a packet received while the game is running
///
/// A ship update is merged only when it comes from the address that owns
/// that ship id.
pub fn handle_game_packet(
    clients: &mut ClientManager,
    world: &mut WorldState,
    packet: Packet,
    addr: SocketAddr,
) -> Response {
    match packet {
        Packet::Ship(ship) => {
            if !clients.owns_ship(addr, ship.id) {
                warn!("Dropping update for ship {} from {}", ship.id, addr);
                return Response::default();
            }
            clients.touch(addr);
            match world.merge_ship(*ship) {
                MergeOutcome::Replaced => {}
                MergeOutcome::UnknownShip => warn!("Update from {} for a ship no longer in play", addr),
                MergeOutcome::ShipDestroyed => debug!("Update from {} for a destroyed ship", addr),
            }
            Response::default()
        }
        Packet::Disconnect => disconnect(clients, world, addr),
        Packet::RequestConnectionJoiner { .. } | Packet::RequestConnectionSpectator => {
            // A late retry whose ACCEPT was lost; newcomers cannot join mid-game.
            match clients.get(addr) {
                Some(client) => Response::reply(Packet::AcceptConnection {
                    ship_id: client.role.ship_id(),
                }),
                None => {
                    debug!("Ignoring connection request from {} after start", addr);
                    Response::default()
                }
            }
        }
        other => {
            debug!("Ignoring {:?} from {}", other.packet_type(), addr);
            Response::default()
        }
    }
}

/// Lets the host steer its own ship
#[derive(Clone)]
pub struct HostControls {
    world: Arc<RwLock<WorldState>>,
}

impl HostControls {
    /// Applies one input edge to the host ship. Returns true if it changed
    /// anything.
    pub async fn apply(&self, event: ControlEvent) -> bool {
        let mut world = self.world.write().await;
        match world.ship_mut(ShipId::HOST) {
            Some(ship) if !ship.is_destroyed() => ship.controls.apply(event),
            _ => false,
        }
    }
}

/// Finds the address other machines on the network can reach this host on
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outgoing interface.
pub fn discover_local_ip() -> Result<IpAddr, BoxError> {
    let probe = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    let ip = probe.local_addr()?.ip();
    if ip.is_loopback() || ip.is_unspecified() {
        return Err("no non-loopback IPv4 address found".into());
    }
    Ok(ip)
}

/// Main server coordinating the handshake, networking and the simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: Arc<RwLock<WorldState>>,
    session: Session,
    listeners: Arc<Listeners<SessionEvent>>,
    config: GameConfig,
    rng: StdRng,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    /// Binds the server socket and seats the host's ship
    ///
    /// A bind failure aborts `session` before the error is returned.
    pub async fn bind(config: ServerConfig, session: Session) -> Result<Self, BoxError> {
        let socket = match UdpSocket::bind(config.bind_addr).await {
            Ok(socket) => socket,
            Err(e) => {
                error!("Failed to bind {}: {}", config.bind_addr, e);
                session.abort();
                return Err(e.into());
            }
        };
        info!("Server listening on {}", socket.local_addr()?);

        let mut rng = StdRng::from_entropy();
        let mut world = WorldState::new();
        let host = seat_new_ship(
            &world,
            ShipId::HOST,
            Some(config.nickname.clone()),
            &mut rng,
            &config.game,
        );
        world.add_ship(host);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket: Arc::new(socket),
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            world: Arc::new(RwLock::new(world)),
            session,
            listeners: Arc::new(Listeners::new()),
            config: config.game,
            rng,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn session(&self) -> Session {
        self.session.clone()
    }

    pub fn world(&self) -> Arc<RwLock<WorldState>> {
        Arc::clone(&self.world)
    }

    pub fn clients(&self) -> Arc<RwLock<ClientManager>> {
        Arc::clone(&self.clients)
    }

    pub fn listeners(&self) -> Arc<Listeners<SessionEvent>> {
        Arc::clone(&self.listeners)
    }

    pub fn host_controls(&self) -> HostControls {
        HostControls {
            world: Arc::clone(&self.world),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    ///
    /// Before the game starts, datagrams are held to the handshake ceiling
    /// and any I/O error or malformed payload aborts the session. Once
    /// running, such failures are logged and reception carries on.
    fn spawn_network_receiver(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();
        let session = self.session.clone();

        tokio::spawn(async move {
            let mut buffer = receive_buffer(MAX_DATAGRAM_SIZE);
            let mut phase = session.subscribe();

            while !session.is_over() {
                tokio::select! {
                    result = socket.recv_from(&mut buffer) => {
                        let handshake = !session.is_running();
                        match result {
                            Ok((len, addr)) => {
                                let limit = if handshake { HANDSHAKE_DATAGRAM_LIMIT } else { MAX_DATAGRAM_SIZE };
                                match Packet::decode_with_limit(&buffer[..len], limit) {
                                    Ok(packet) => {
                                        if server_tx.send(ServerMessage::PacketReceived { packet, addr }).is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) if handshake && e.is_desync() => {
                                        error!("Malformed handshake packet from {}: {}", addr, e);
                                        session.abort();
                                    }
                                    Err(ProtocolError::UnknownType(tag)) => {
                                        debug!("Ignoring packet type {} from {}", tag, addr);
                                    }
                                    Err(e) => warn!("Dropping datagram from {}: {}", addr, e),
                                }
                            }
                            Err(e) if handshake => {
                                error!("Error receiving connection request: {}", e);
                                session.abort();
                            }
                            Err(e) => {
                                error!("Error receiving packet: {}", e);
                                tokio::time::sleep(Duration::from_millis(10)).await;
                            }
                        }
                    }
                    changed = phase.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Spawns task that processes the outgoing packet queue
    ///
    /// Runs until every sender half of the queue is dropped.
    fn spawn_network_sender(&mut self) -> Option<JoinHandle<()>> {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = self.game_rx.take()?;

        Some(tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };
                        if client_addrs.is_empty() {
                            continue;
                        }

                        let data = match packet.encode() {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode {:?}: {}", packet.packet_type(), e);
                                continue;
                            }
                        };
                        for addr in client_addrs {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to client {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        }))
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Processes one incoming packet according to the session phase
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let (response, connected) = {
            let mut clients = self.clients.write().await;
            let mut world = self.world.write().await;
            let response = if self.session.is_running() {
                handle_game_packet(&mut clients, &mut world, packet, addr)
            } else {
                handle_connection_packet(
                    &mut clients,
                    &mut world,
                    packet,
                    addr,
                    &mut self.rng,
                    &self.config,
                )
            };
            (response, clients.len())
        };

        if let Some(reply) = response.reply {
            self.send_packet(reply, addr);
        }
        if response.registry_changed {
            self.listeners
                .notify(&SessionEvent::ConnectionsChanged { connected });
        }
    }

    fn spawn_simulation(&self) -> JoinHandle<()> {
        let rules = MultiplayerRules::new(self.game_tx.clone(), Arc::clone(&self.listeners));
        let simulation = Simulation::new(self.config.clone(), rules);
        tokio::spawn(simulation.run(Arc::clone(&self.world), self.session.clone()))
    }

    /// Main server loop
    ///
    /// Accepts connections until the session is started, then runs the
    /// simulation alongside packet reception until the session ends. Every
    /// registered client is sent a DISCONNECT on the way out.
    pub async fn run(mut self) -> Result<(), BoxError> {
        let receiver = self.spawn_network_receiver();
        let sender = self
            .spawn_network_sender()
            .ok_or("network sender already running")?;
        let mut phase = self.session.subscribe();
        let mut simulation = None;

        info!("Waiting for players");
        loop {
            if self.session.is_over() {
                break;
            }
            if simulation.is_none() && self.session.is_running() {
                let clients = self.clients.read().await;
                info!(
                    "Game started with {} connected clients ({} playing)",
                    clients.len(),
                    clients.joiner_count()
                );
                drop(clients);
                simulation = Some(self.spawn_simulation());
            }

            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        None => break,
                    }
                }
                changed = phase.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if self.session.is_aborted() {
            warn!("Session aborted");
            self.listeners.notify(&SessionEvent::Aborted);
        }
        if let Some(simulation) = simulation {
            simulation.await?;
        }

        self.broadcast_packet(Packet::Disconnect);
        drop(self);
        receiver.await?;
        sender.await?;
        info!("Server shutting down");
        Ok(())
    }
}
