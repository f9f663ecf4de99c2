use super::header::HeaderType;
use crate::utils::checksum::Checksum;
use crate::utils::errors::NetworkError;

/// Fixed 5-byte packet header: type tag, payload length, payload checksum.
#[derive(Debug, Clone)]
pub struct Header {
    pub header_type: HeaderType,
    pub payload_length: u16,
    pub checksum: u16,
}

pub const HEADER_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(header_type: HeaderType, payload: &[u8]) -> Self {
        Self {
            header: Header {
                header_type,
                payload_length: payload.len() as u16,
                checksum: Checksum::new(payload),
            },
            payload: payload.to_vec(),
        }
    }

    /// Parses one packet from a raw buffer.
    ///
    /// # Returns
    /// * `Ok(Packet)` - header decoded and the full payload present.
    /// * `Err(NetworkError)` - unknown header byte or truncated buffer.
    ///   Checksum verification is the caller's job, so that a mismatch can
    ///   be answered rather than silently dropped.
    pub fn parse(buffer: &[u8]) -> Result<Packet, NetworkError> {
        if buffer.len() < HEADER_SIZE {
            return Err(NetworkError::TruncatedPacket);
        }
        let header_type =
            HeaderType::try_from(buffer[0]).map_err(|_| NetworkError::InvalidHeader)?;
        let payload_length = u16::from_be_bytes([buffer[1], buffer[2]]);
        let checksum = u16::from_be_bytes([buffer[3], buffer[4]]);

        let end = HEADER_SIZE + payload_length as usize;
        if buffer.len() < end {
            return Err(NetworkError::TruncatedPacket);
        }

        Ok(Packet {
            header: Header {
                header_type,
                payload_length,
                checksum,
            },
            payload: buffer[HEADER_SIZE..end].to_vec(),
        })
    }

    pub fn checksum_valid(&self) -> bool {
        Checksum::check(self.header.checksum, &self.payload)
    }

    /// Serializes the packet for the wire: 5 header bytes then the payload.
    pub fn wrap_packet(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        bytes.push(self.header.header_type as u8);
        bytes.extend_from_slice(&self.header.payload_length.to_be_bytes());
        bytes.extend_from_slice(&self.header.checksum.to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire_format() {
        let packet = Packet::new(HeaderType::ApplyIntent, b"payload bytes");
        let bytes = packet.wrap_packet();
        let parsed = Packet::parse(&bytes).expect("parses");
        assert_eq!(parsed.header.header_type, HeaderType::ApplyIntent);
        assert_eq!(parsed.payload, b"payload bytes");
        assert!(parsed.checksum_valid());
    }

    #[test]
    fn empty_payload_is_valid() {
        let packet = Packet::new(HeaderType::Ping, b"");
        let parsed = Packet::parse(&packet.wrap_packet()).expect("parses");
        assert_eq!(parsed.header.payload_length, 0);
        assert!(parsed.checksum_valid());
    }

    #[test]
    fn unknown_header_byte_is_rejected() {
        let bytes = [0x77, 0, 0, 0, 0];
        assert!(matches!(
            Packet::parse(&bytes),
            Err(NetworkError::InvalidHeader)
        ));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let packet = Packet::new(HeaderType::GameState, b"0123456789");
        let bytes = packet.wrap_packet();
        assert!(matches!(
            Packet::parse(&bytes[..8]),
            Err(NetworkError::TruncatedPacket)
        ));
    }

    #[test]
    fn corrupted_payload_fails_the_checksum() {
        let packet = Packet::new(HeaderType::GameState, b"0123456789");
        let mut bytes = packet.wrap_packet();
        bytes[7] ^= 0xFF;
        let parsed = Packet::parse(&bytes).expect("still parses");
        assert!(!parsed.checksum_valid());
    }
}
