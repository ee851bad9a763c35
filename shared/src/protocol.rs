//! Wire protocol shared by the server and its clients.
//!
//! Every datagram starts with a fixed six-byte header, followed by a payload
//! whose shape depends on the packet type:
//!
//! ```text
//! +----------------+--------------------+-----------------------+
//! | tag: u32 (BE)  | version: u16 (BE)  | payload (bincode)     |
//! +----------------+--------------------+-----------------------+
//! ```
//!
//! Payloads use bincode with fixed-width little-endian integers, so every
//! field has a stable width and order; strings and lists carry a `u64`
//! length prefix. Trailing bytes after a payload are rejected.

use crate::config::{MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use crate::entity::{Ship, ShipId};
use crate::world::WorldState;
use bincode::Options;
use thiserror::Error;

/// Length of the tag plus version header.
pub const HEADER_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram shorter than the packet header")]
    Truncated,
    #[error("datagram of {len} bytes exceeds the {limit}-byte limit")]
    Oversized { len: usize, limit: usize },
    #[error("unknown packet type {0}")]
    UnknownType(u32),
    #[error("protocol version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u16, found: u16 },
    #[error("malformed payload: {0}")]
    Malformed(#[from] bincode::Error),
}

impl ProtocolError {
    /// A packet with a known type whose payload does not parse means the two
    /// sides disagree about the protocol. Everything else is just noise on
    /// the socket.
    pub fn is_desync(&self) -> bool {
        matches!(self, ProtocolError::Malformed(_))
    }
}

/// Numeric type tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    RequestConnectionJoiner,
    RequestConnectionSpectator,
    Disconnect,
    RejectConnection,
    AcceptConnection,
    Ship,
    GameModel,
}

impl PacketType {
    pub fn tag(self) -> u32 {
        match self {
            PacketType::RequestConnectionJoiner => 0,
            PacketType::RequestConnectionSpectator => 1,
            PacketType::Disconnect => 2,
            PacketType::RejectConnection => 3,
            PacketType::AcceptConnection => 4,
            PacketType::Ship => 5,
            PacketType::GameModel => 6,
        }
    }

    pub fn from_tag(tag: u32) -> Option<PacketType> {
        let packet_type = match tag {
            0 => PacketType::RequestConnectionJoiner,
            1 => PacketType::RequestConnectionSpectator,
            2 => PacketType::Disconnect,
            3 => PacketType::RejectConnection,
            4 => PacketType::AcceptConnection,
            5 => PacketType::Ship,
            6 => PacketType::GameModel,
            _ => return None,
        };
        Some(packet_type)
    }
}

/// One message of the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Client → server: join as a player.
    RequestConnectionJoiner { nickname: String },
    /// Client → server: join as a read-only viewer.
    RequestConnectionSpectator,
    /// Either direction: the sender is leaving.
    Disconnect,
    /// Server → client: the server is full.
    RejectConnection,
    /// Server → client: the request was accepted. Spectators get no ship.
    AcceptConnection { ship_id: Option<ShipId> },
    /// Client → server: the full state of the sender's own ship.
    Ship(Box<Ship>),
    /// Server → client: a full snapshot of the world.
    GameModel(Box<WorldState>),
}

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::RequestConnectionJoiner { .. } => PacketType::RequestConnectionJoiner,
            Packet::RequestConnectionSpectator => PacketType::RequestConnectionSpectator,
            Packet::Disconnect => PacketType::Disconnect,
            Packet::RejectConnection => PacketType::RejectConnection,
            Packet::AcceptConnection { .. } => PacketType::AcceptConnection,
            Packet::Ship(_) => PacketType::Ship,
            Packet::GameModel(_) => PacketType::GameModel,
        }
    }

    /// Serializes the packet into one datagram of at most [`MAX_DATAGRAM_SIZE`] bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let options = payload_options();
        let payload = match self {
            Packet::RequestConnectionJoiner { nickname } => options.serialize(nickname)?,
            Packet::AcceptConnection { ship_id } => options.serialize(ship_id)?,
            Packet::Ship(ship) => options.serialize(ship.as_ref())?,
            Packet::GameModel(world) => options.serialize(world.as_ref())?,
            Packet::RequestConnectionSpectator | Packet::Disconnect | Packet::RejectConnection => {
                Vec::new()
            }
        };

        let len = HEADER_LEN + payload.len();
        if len > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::Oversized {
                len,
                limit: MAX_DATAGRAM_SIZE,
            });
        }

        let mut datagram = Vec::with_capacity(len);
        datagram.extend_from_slice(&self.packet_type().tag().to_be_bytes());
        datagram.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        datagram.extend_from_slice(&payload);
        Ok(datagram)
    }

    /// Parses a datagram received in the running phase.
    pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
        Self::decode_with_limit(bytes, MAX_DATAGRAM_SIZE)
    }

    /// Parses a datagram, refusing anything longer than `limit` bytes.
    pub fn decode_with_limit(bytes: &[u8], limit: usize) -> Result<Packet, ProtocolError> {
        if bytes.len() > limit {
            return Err(ProtocolError::Oversized {
                len: bytes.len(),
                limit,
            });
        }
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated);
        }

        let tag = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let packet_type = PacketType::from_tag(tag).ok_or(ProtocolError::UnknownType(tag))?;
        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: version,
            });
        }

        let payload = &bytes[HEADER_LEN..];
        let options = payload_options().with_limit(limit as u64);
        let packet = match packet_type {
            PacketType::RequestConnectionJoiner => Packet::RequestConnectionJoiner {
                nickname: options.deserialize(payload)?,
            },
            PacketType::RequestConnectionSpectator => {
                options.deserialize::<()>(payload)?;
                Packet::RequestConnectionSpectator
            }
            PacketType::Disconnect => {
                options.deserialize::<()>(payload)?;
                Packet::Disconnect
            }
            PacketType::RejectConnection => {
                options.deserialize::<()>(payload)?;
                Packet::RejectConnection
            }
            PacketType::AcceptConnection => Packet::AcceptConnection {
                ship_id: options.deserialize(payload)?,
            },
            PacketType::Ship => Packet::Ship(Box::new(options.deserialize(payload)?)),
            PacketType::GameModel => Packet::GameModel(Box::new(options.deserialize(payload)?)),
        };
        Ok(packet)
    }
}

/// A receive buffer one byte larger than `limit`, so an oversized datagram
/// fills the spare byte instead of being silently cut to fit.
pub fn receive_buffer(limit: usize) -> Vec<u8> {
    vec![0; limit + 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AsteroidTuning, BulletTuning, ShipTuning, HANDSHAKE_DATAGRAM_LIMIT};
    use crate::entity::{Asteroid, AsteroidSize, Bullet, Vector2};

    fn sample_world(asteroids: usize) -> WorldState {
        let tuning = AsteroidTuning::default();
        let mut world = WorldState::new();
        for i in 0..asteroids {
            world.asteroids.push(Asteroid::new(
                Vector2::new(i as f32, 2.0 * i as f32),
                Vector2::new(1.0, -1.0),
                AsteroidSize::Large,
                &tuning,
            ));
        }
        world.bullets.push(Bullet::new(
            Vector2::new(5.0, 5.0),
            Vector2::new(0.0, -15.0),
            &BulletTuning::default(),
        ));
        world.add_ship(Ship::new(
            ShipId::HOST,
            Some("host".into()),
            Vector2::new(400.0, 400.0),
            &ShipTuning::default(),
        ));
        world
    }

    #[test]
    fn test_header_layout() {
        let bytes = Packet::Disconnect.encode().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[4..], &PROTOCOL_VERSION.to_be_bytes());
    }

    #[test]
    fn test_tags_match_wire_numbers() {
        for tag in 0..7 {
            let packet_type = PacketType::from_tag(tag).unwrap();
            assert_eq!(packet_type.tag(), tag);
        }
        assert_eq!(PacketType::from_tag(7), None);
    }

    #[test]
    fn test_game_model_survives_the_wire() {
        let world = sample_world(3);
        let bytes = Packet::GameModel(Box::new(world.clone())).encode().unwrap();

        match Packet::decode(&bytes).unwrap() {
            Packet::GameModel(decoded) => assert_eq!(*decoded, world),
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_spectator_accept_has_no_ship() {
        let bytes = Packet::AcceptConnection { ship_id: None }.encode().unwrap();
        assert_eq!(
            Packet::decode(&bytes).unwrap(),
            Packet::AcceptConnection { ship_id: None }
        );
    }

    #[test]
    fn test_unknown_tag_is_reported() {
        let mut bytes = Packet::Disconnect.encode().unwrap();
        bytes[3] = 42;
        assert!(matches!(
            Packet::decode(&bytes),
            Err(ProtocolError::UnknownType(42))
        ));
    }

    #[test]
    fn test_short_datagram_is_truncated() {
        assert!(matches!(
            Packet::decode(&[0, 0, 0]),
            Err(ProtocolError::Truncated)
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = Packet::Disconnect.encode().unwrap();
        bytes[5] = bytes[5].wrapping_add(1);
        let err = Packet::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::VersionMismatch { .. }));
        assert!(!err.is_desync());
    }

    #[test]
    fn test_type_mismatched_payload_is_malformed() {
        // An ACCEPT header glued to a nickname payload.
        let mut bytes = Packet::RequestConnectionJoiner {
            nickname: "pilot".into(),
        }
        .encode()
        .unwrap();
        bytes[..4].copy_from_slice(&PacketType::AcceptConnection.tag().to_be_bytes());

        let err = Packet::decode(&bytes).unwrap_err();
        assert!(err.is_desync(), "got {:?}", err);
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = Packet::Disconnect.encode().unwrap();
        bytes.push(0);
        assert!(Packet::decode(&bytes).unwrap_err().is_desync());
    }

    #[test]
    fn test_handshake_limit_rejects_snapshots() {
        let bytes = Packet::GameModel(Box::new(sample_world(20))).encode().unwrap();
        assert!(bytes.len() > HANDSHAKE_DATAGRAM_LIMIT);
        assert!(matches!(
            Packet::decode_with_limit(&bytes, HANDSHAKE_DATAGRAM_LIMIT),
            Err(ProtocolError::Oversized { .. })
        ));
    }

    #[test]
    fn test_encode_refuses_oversized_snapshot() {
        let world = sample_world(1000);
        assert!(matches!(
            Packet::GameModel(Box::new(world)).encode(),
            Err(ProtocolError::Oversized { .. })
        ));
    }

    #[test]
    fn test_receive_buffer_has_spare_byte() {
        assert_eq!(receive_buffer(HANDSHAKE_DATAGRAM_LIMIT).len(), HANDSHAKE_DATAGRAM_LIMIT + 1);
    }
}
