//! KOTH wire protocol
//!
//! Two fixed-layout, little-endian datagrams, each prefixed with a one-byte
//! message tag:
//!
//! ```text
//! 0x01 HillState    hill_id u8 | ownership u8 | steal_dir u8 | state u8 |
//!                   capture_progress u8 | red_present u8 | blue_present u8 |
//!                   red_score u16 | blue_score u16
//! 0x02 HillCaptured hill_id u8 | new_owner u8 | n u8 | player_ids u8[n]
//! ```

use crate::game::constants::net::{
    HILL_CAPTURED_HEADER_SIZE, HILL_STATE_BODY_SIZE, TAG_HILL_CAPTURED, TAG_HILL_STATE,
};
use crate::game::state::{clamp_u8, Hill, HillId, HillOwner, HillState, TeamScores};
use crate::game::systems::presence::CapturerList;
use crate::net::framing::{validate_datagram_size, FrameBuilder, FrameReader, FramingError};

/// Errors produced while encoding or decoding KOTH datagrams
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty datagram")]
    Empty,
    #[error("Unknown message tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("Truncated datagram: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("Trailing bytes after message: {0}")]
    TrailingBytes(usize),
    #[error("Invalid owner value {0}")]
    InvalidOwner(u8),
    #[error("Invalid hill state value {0}")]
    InvalidState(u8),
    #[error("Capture progress out of range: {0}")]
    ProgressOutOfRange(u8),
    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Full replicated state of one hill plus the team scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HillStatePacket {
    pub hill_id: HillId,
    pub ownership: HillOwner,
    pub steal_dir: HillOwner,
    pub state: HillState,
    pub capture_progress: u8,
    pub red_present: u8,
    pub blue_present: u8,
    pub red_score: u16,
    pub blue_score: u16,
}

impl HillStatePacket {
    pub fn from_hill(hill: &Hill, scores: &TeamScores) -> Self {
        let (red_present, blue_present) = hill.presence.clamped();
        let (red_score, blue_score) = scores.to_wire();
        Self {
            hill_id: hill.id,
            ownership: hill.ownership,
            steal_dir: hill.steal_dir,
            state: hill.state,
            capture_progress: hill.capture_progress,
            red_present,
            blue_present,
            red_score,
            blue_score,
        }
    }

    fn write(&self, frame: FrameBuilder) -> FrameBuilder {
        frame
            .write_u8(self.hill_id)
            .write_u8(self.ownership.to_wire())
            .write_u8(self.steal_dir.to_wire())
            .write_u8(self.state.to_wire())
            .write_u8(self.capture_progress)
            .write_u8(self.red_present)
            .write_u8(self.blue_present)
            .write_u16(self.red_score)
            .write_u16(self.blue_score)
    }

    fn read(reader: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        let available = reader.remaining().len();
        if available < HILL_STATE_BODY_SIZE {
            return Err(ProtocolError::Truncated {
                expected: HILL_STATE_BODY_SIZE,
                actual: available,
            });
        }
        // Length checked above
        let hill_id = reader.read_u8().unwrap_or_default();
        let ownership = reader.read_u8().unwrap_or_default();
        let steal_dir = reader.read_u8().unwrap_or_default();
        let state = reader.read_u8().unwrap_or_default();
        let capture_progress = reader.read_u8().unwrap_or_default();
        let red_present = reader.read_u8().unwrap_or_default();
        let blue_present = reader.read_u8().unwrap_or_default();
        let red_score = reader.read_u16().unwrap_or_default();
        let blue_score = reader.read_u16().unwrap_or_default();

        if capture_progress > 100 {
            return Err(ProtocolError::ProgressOutOfRange(capture_progress));
        }
        Ok(Self {
            hill_id,
            ownership: HillOwner::from_wire(ownership).ok_or(ProtocolError::InvalidOwner(ownership))?,
            steal_dir: HillOwner::from_wire(steal_dir).ok_or(ProtocolError::InvalidOwner(steal_dir))?,
            state: HillState::from_wire(state).ok_or(ProtocolError::InvalidState(state))?,
            capture_progress,
            red_present,
            blue_present,
            red_score,
            blue_score,
        })
    }
}

/// Confirmed ownership flip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HillCapturedPacket {
    pub hill_id: HillId,
    pub new_owner: HillOwner,
    /// At most 255 ids are carried; extra ids are dropped when encoding
    pub capturing_player_ids: CapturerList,
}

impl HillCapturedPacket {
    fn write(&self, frame: FrameBuilder) -> FrameBuilder {
        let count = clamp_u8(self.capturing_player_ids.len() as u32);
        frame
            .write_u8(self.hill_id)
            .write_u8(self.new_owner.to_wire())
            .write_u8(count)
            .write(&self.capturing_player_ids[..count as usize])
    }

    fn read(reader: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        let available = reader.remaining().len();
        if available < HILL_CAPTURED_HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                expected: HILL_CAPTURED_HEADER_SIZE,
                actual: available,
            });
        }
        let hill_id = reader.read_u8().unwrap_or_default();
        let owner = reader.read_u8().unwrap_or_default();
        let count = reader.read_u8().unwrap_or_default() as usize;
        let ids = reader.read(count).ok_or(ProtocolError::Truncated {
            expected: HILL_CAPTURED_HEADER_SIZE + count,
            actual: available,
        })?;

        let new_owner = match HillOwner::from_wire(owner) {
            Some(owner) if !owner.is_neutral() => owner,
            _ => return Err(ProtocolError::InvalidOwner(owner)),
        };
        Ok(Self {
            hill_id,
            new_owner,
            capturing_player_ids: CapturerList::from_slice(ids),
        })
    }
}

/// Every datagram KOTH puts on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KothMessage {
    HillState(HillStatePacket),
    HillCaptured(HillCapturedPacket),
}

/// Encode a message into one datagram
pub fn encode(message: &KothMessage) -> Result<Vec<u8>, ProtocolError> {
    let frame = match message {
        KothMessage::HillState(packet) => {
            packet.write(FrameBuilder::with_capacity(1 + HILL_STATE_BODY_SIZE).write_u8(TAG_HILL_STATE))
        }
        KothMessage::HillCaptured(packet) => packet.write(
            FrameBuilder::with_capacity(1 + HILL_CAPTURED_HEADER_SIZE + packet.capturing_player_ids.len())
                .write_u8(TAG_HILL_CAPTURED),
        ),
    };
    let data = frame.build();
    validate_datagram_size(&data)?;
    Ok(data)
}

/// Decode one datagram
pub fn decode(data: &[u8]) -> Result<KothMessage, ProtocolError> {
    validate_datagram_size(data)?;
    let mut reader = FrameReader::new(data);
    let tag = reader.read_u8().ok_or(ProtocolError::Empty)?;
    let message = match tag {
        TAG_HILL_STATE => KothMessage::HillState(HillStatePacket::read(&mut reader)?),
        TAG_HILL_CAPTURED => KothMessage::HillCaptured(HillCapturedPacket::read(&mut reader)?),
        other => return Err(ProtocolError::UnknownTag(other)),
    };
    if reader.has_remaining() {
        return Err(ProtocolError::TrailingBytes(reader.remaining().len()));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Volume;
    use crate::game::state::Presence;
    use crate::util::vec3::Vec3;

    fn sample_state() -> HillStatePacket {
        HillStatePacket {
            hill_id: 3,
            ownership: HillOwner::Red,
            steal_dir: HillOwner::Blue,
            state: HillState::LeanBlueGrowing,
            capture_progress: 47,
            red_present: 0,
            blue_present: 2,
            red_score: 513,
            blue_score: 9,
        }
    }

    #[test]
    fn test_state_packet_layout() {
        let data = encode(&KothMessage::HillState(sample_state())).unwrap();
        assert_eq!(data.len(), 1 + HILL_STATE_BODY_SIZE);
        assert_eq!(data, vec![0x01, 3, 1, 2, 3, 47, 0, 2, 0x01, 0x02, 9, 0]);
    }

    #[test]
    fn test_hill_roundtrip_through_state_packet() {
        let mut hill = Hill::new(
            7,
            "Bridge".to_string(),
            55,
            Volume::Sphere {
                center: Vec3::ZERO,
                radius: 4.0,
            },
            HillOwner::Blue,
        );
        hill.steal_dir = HillOwner::Red;
        hill.set_capture_milli(63_400);
        hill.state = HillState::LeanRedShrinking;
        hill.presence = Presence::new(1, 300);
        let scores = TeamScores { red: 4, blue: 11 };

        let packet = HillStatePacket::from_hill(&hill, &scores);
        let decoded = match decode(&encode(&KothMessage::HillState(packet)).unwrap()).unwrap() {
            KothMessage::HillState(p) => p,
            other => panic!("unexpected message {:?}", other),
        };

        assert_eq!(
            (decoded.ownership, decoded.steal_dir, decoded.state, decoded.capture_progress),
            (hill.ownership, hill.steal_dir, hill.state, hill.capture_progress)
        );
        assert_eq!((decoded.red_present, decoded.blue_present), (1, 255));
        assert_eq!((decoded.red_score, decoded.blue_score), (4, 11));
        assert_eq!(decoded.hill_id, 7);
    }

    #[test]
    fn test_captured_packet_roundtrip() {
        let packet = HillCapturedPacket {
            hill_id: 2,
            new_owner: HillOwner::Blue,
            capturing_player_ids: CapturerList::from_slice(&[4, 9, 17]),
        };
        let data = encode(&KothMessage::HillCaptured(packet.clone())).unwrap();
        assert_eq!(data, vec![0x02, 2, 2, 3, 4, 9, 17]);
        assert_eq!(decode(&data).unwrap(), KothMessage::HillCaptured(packet));
    }

    #[test]
    fn test_captured_packet_clamps_player_count() {
        let ids: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let packet = HillCapturedPacket {
            hill_id: 1,
            new_owner: HillOwner::Red,
            capturing_player_ids: CapturerList::from_vec(ids),
        };
        let data = encode(&KothMessage::HillCaptured(packet)).unwrap();
        assert_eq!(data[3], 255);
        assert_eq!(data.len(), 1 + HILL_CAPTURED_HEADER_SIZE + 255);
        match decode(&data).unwrap() {
            KothMessage::HillCaptured(p) => assert_eq!(p.capturing_player_ids.len(), 255),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(decode(&[0x7f]), Err(ProtocolError::UnknownTag(0x7f)));
        assert!(matches!(
            decode(&[0x01, 1, 2, 3]),
            Err(ProtocolError::Truncated { .. })
        ));

        let mut data = encode(&KothMessage::HillState(sample_state())).unwrap();
        data[2] = 9;
        assert_eq!(decode(&data), Err(ProtocolError::InvalidOwner(9)));

        let mut data = encode(&KothMessage::HillState(sample_state())).unwrap();
        data[4] = 5;
        assert_eq!(decode(&data), Err(ProtocolError::InvalidState(5)));

        let mut data = encode(&KothMessage::HillState(sample_state())).unwrap();
        data[5] = 101;
        assert_eq!(decode(&data), Err(ProtocolError::ProgressOutOfRange(101)));

        let mut data = encode(&KothMessage::HillState(sample_state())).unwrap();
        data.push(0);
        assert_eq!(decode(&data), Err(ProtocolError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_rejects_neutral_capture_and_short_id_list() {
        assert_eq!(decode(&[0x02, 1, 0, 0]), Err(ProtocolError::InvalidOwner(0)));
        assert!(matches!(
            decode(&[0x02, 1, 1, 3, 5]),
            Err(ProtocolError::Truncated { expected: 6, actual: 4 })
        ));
    }
}
