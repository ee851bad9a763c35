//! Joiner and spectator agents
//!
//! Each agent runs two paths side by side:
//! - **Output path**: retries the connection request until the server
//!   answers, then pushes the local ship after every key change (joiners
//!   only) and says DISCONNECT on the way out
//! - **Input path**: waits for ACCEPT_CONNECTION, then installs every
//!   GAME_MODEL snapshot as the new local world
//!
//! The client session is `Waiting` until accepted, `Running` while
//! snapshots flow, and `Aborted` on any protocol or socket failure.

use crate::game::ClientGame;
use crate::input::InputManager;
use log::{debug, error, info, warn};
use shared::protocol::receive_buffer;
use shared::{
    Listeners, Packet, Phase, ProtocolError, Session, SessionEvent, MAX_DATAGRAM_SIZE,
};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// How long to wait for ACCEPT_CONNECTION before asking again
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// How this client takes part in the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRole {
    /// Plays a ship under this nickname
    Joiner { nickname: String },
    /// Only watches
    Spectator,
}

impl ClientRole {
    fn request(&self) -> Packet {
        match self {
            ClientRole::Joiner { nickname } => Packet::RequestConnectionJoiner {
                nickname: nickname.clone(),
            },
            ClientRole::Spectator => Packet::RequestConnectionSpectator,
        }
    }
}

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    role: ClientRole,
    session: Session,
    game: ClientGame,
    input: InputManager,
    retry_interval: Duration,
}

impl Client {
    /// Binds an ephemeral local socket for talking to `server_addr`
    ///
    /// A bind failure aborts `session` before the error is returned.
    pub async fn new(
        server_addr: SocketAddr,
        role: ClientRole,
        session: Session,
    ) -> Result<Self, BoxError> {
        let local: IpAddr = if server_addr.is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let socket = match UdpSocket::bind((local, 0)).await {
            Ok(socket) => socket,
            Err(e) => {
                error!("Failed to bind client socket: {}", e);
                session.abort();
                return Err(e.into());
            }
        };

        Ok(Client {
            socket: Arc::new(socket),
            server_addr,
            role,
            session,
            game: ClientGame::new(Arc::new(Listeners::new())),
            input: InputManager::new(),
            retry_interval: CONNECT_RETRY_INTERVAL,
        })
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn session(&self) -> Session {
        self.session.clone()
    }

    pub fn game(&self) -> ClientGame {
        self.game.clone()
    }

    pub fn input(&self) -> InputManager {
        self.input.clone()
    }

    pub fn listeners(&self) -> Arc<Listeners<SessionEvent>> {
        self.game.listeners()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_packet(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Spawns the output path
    fn spawn_output(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        let session = self.session.clone();
        let game = self.game.clone();
        let input = self.input.clone();
        let request = self.role.request();
        let pushes_ship = matches!(self.role, ClientRole::Joiner { .. });
        let retry_interval = self.retry_interval;

        tokio::spawn(async move {
            let mut phase = session.subscribe();

            info!("Connecting to {}...", server_addr);
            while session.phase() == Phase::Waiting {
                if let Err(e) = Self::send_packet(&socket, &request, server_addr).await {
                    error!("Failed to send connection request: {}", e);
                    session.abort();
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(retry_interval) => {}
                    changed = phase.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            while session.is_running() {
                tokio::select! {
                    _ = input.moved(), if pushes_ship => {
                        let Some(ship) = game.outgoing_ship(input.controls()).await else {
                            debug!("No ship to steer yet");
                            continue;
                        };
                        let packet = Packet::Ship(Box::new(ship));
                        if let Err(e) = Self::send_packet(&socket, &packet, server_addr).await {
                            error!("Failed to send ship update: {}", e);
                        }
                    }
                    changed = phase.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            if let Err(e) = Self::send_packet(&socket, &Packet::Disconnect, server_addr).await {
                warn!("Failed to say goodbye to the server: {}", e);
            }
        })
    }

    /// Spawns the input path
    fn spawn_input(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        let session = self.session.clone();
        let game = self.game.clone();
        let input = self.input.clone();
        let listeners = self.game.listeners();

        tokio::spawn(async move {
            let mut buffer = receive_buffer(MAX_DATAGRAM_SIZE);
            let mut phase = session.subscribe();

            while !session.is_over() {
                let result = tokio::select! {
                    result = socket.recv_from(&mut buffer) => result,
                    changed = phase.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                let (len, addr) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        session.abort();
                        break;
                    }
                };
                if addr != server_addr {
                    debug!("Ignoring datagram from {}", addr);
                    continue;
                }

                let packet = match Packet::decode(&buffer[..len]) {
                    Ok(packet) => packet,
                    Err(e) if e.is_desync() => {
                        error!("Protocol desync with server: {}", e);
                        session.abort();
                        break;
                    }
                    Err(ProtocolError::UnknownType(tag)) => {
                        debug!("Ignoring packet type {}", tag);
                        continue;
                    }
                    Err(e) => {
                        warn!("Dropping datagram from server: {}", e);
                        continue;
                    }
                };

                if session.phase() == Phase::Waiting {
                    Self::handle_handshake_packet(&session, &game, packet);
                } else {
                    Self::handle_game_packet(&session, &game, &input, packet).await;
                }
            }

            if session.is_aborted() {
                listeners.notify(&SessionEvent::Aborted);
            }
        })
    }

    /// The first packet from the server must be the answer to our request
    fn handle_handshake_packet(session: &Session, game: &ClientGame, packet: Packet) {
        match packet {
            Packet::AcceptConnection { ship_id } => {
                match ship_id {
                    Some(id) => {
                        game.set_my_ship(id);
                        info!("Connected! Flying ship {}", id);
                    }
                    None => info!("Connected as spectator"),
                }
                session.start();
            }
            Packet::RejectConnection => {
                warn!("Server refused the connection: server is full");
                session.abort();
            }
            other => {
                error!(
                    "Expected ACCEPT_CONNECTION, got {:?}",
                    other.packet_type()
                );
                session.abort();
            }
        }
    }

    async fn handle_game_packet(
        session: &Session,
        game: &ClientGame,
        input: &InputManager,
        packet: Packet,
    ) {
        match packet {
            Packet::GameModel(snapshot) => {
                // Keys pressed before the ship existed, or held across a
                // respawn, were never heard by the server.
                if game.install(*snapshot, input.controls()).await {
                    input.resend();
                }
            }
            Packet::Disconnect => {
                warn!("Server closed the session");
                session.abort();
            }
            Packet::AcceptConnection { .. } => debug!("Duplicate ACCEPT_CONNECTION"),
            other => debug!("Ignoring {:?} from server", other.packet_type()),
        }
    }

    /// Runs both paths until the session is ended locally or aborted
    pub async fn run(self) -> Result<(), BoxError> {
        let input_path = self.spawn_input();
        let output_path = self.spawn_output();

        output_path.await?;
        input_path.await?;

        match self.session.phase() {
            Phase::Aborted => Err("session aborted".into()),
            _ => {
                info!("Disconnected");
                Ok(())
            }
        }
    }
}
