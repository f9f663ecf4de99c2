use std::fmt::Display;

/// Type tag of a protocol packet, one byte on the wire.
///
/// 0x0X: connection lifecycle. 0x1X: match operations. 0x2X: server pushes.
/// 0xEX/0xFX: rejections and protocol errors.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Disconnect = 0x00,
    Connect = 0x01,
    Ping = 0x02,

    StartMatch = 0x10,
    ApplyIntent = 0x11,
    ResolveTrap = 0x12,

    GameState = 0x20,
    PendingDecision = 0x21,

    IntentRejected = 0xE0,
    ServiceFailure = 0xE1,

    InvalidHeader = 0xFA,
    InvalidChecksum = 0xFD,
    InvalidPacketPayload = 0xF1,
    Error = 0xFE,
}

impl Display for HeaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            HeaderType::Disconnect => "DISCONNECT",
            HeaderType::Connect => "CONNECT",
            HeaderType::Ping => "PING",

            HeaderType::StartMatch => "START_MATCH",
            HeaderType::ApplyIntent => "APPLY_INTENT",
            HeaderType::ResolveTrap => "RESOLVE_TRAP",

            HeaderType::GameState => "GAME_STATE",
            HeaderType::PendingDecision => "PENDING_DECISION",

            HeaderType::IntentRejected => "INTENT_REJECTED",
            HeaderType::ServiceFailure => "SERVICE_FAILURE",

            HeaderType::InvalidHeader => "INVALID_HEADER",
            HeaderType::InvalidChecksum => "INVALID_CHECKSUM",
            HeaderType::InvalidPacketPayload => "INVALID_PACKET_PAYLOAD",
            HeaderType::Error => "ERROR",
        };
        write!(f, "{}", str)
    }
}

impl TryFrom<u8> for HeaderType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x00 => Ok(HeaderType::Disconnect),
            0x01 => Ok(HeaderType::Connect),
            0x02 => Ok(HeaderType::Ping),

            0x10 => Ok(HeaderType::StartMatch),
            0x11 => Ok(HeaderType::ApplyIntent),
            0x12 => Ok(HeaderType::ResolveTrap),

            0x20 => Ok(HeaderType::GameState),
            0x21 => Ok(HeaderType::PendingDecision),

            0xE0 => Ok(HeaderType::IntentRejected),
            0xE1 => Ok(HeaderType::ServiceFailure),

            0xFA => Ok(HeaderType::InvalidHeader),
            0xFD => Ok(HeaderType::InvalidChecksum),
            0xF1 => Ok(HeaderType::InvalidPacketPayload),
            0xFE => Ok(HeaderType::Error),

            _ => Err(()),
        }
    }
}
