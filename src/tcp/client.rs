use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use super::packet::Packet;
use crate::logger;
use crate::utils::errors::NetworkError;
use crate::utils::logger::Logger;

/// One connected client: its address, write half and, once authenticated,
/// the player identity it acts as.
pub struct Client {
    pub addr: SocketAddr,
    pub player_id: RwLock<Option<String>>,
    pub connected: RwLock<bool>,
    write_stream: Mutex<OwnedWriteHalf>,
}

impl Client {
    pub fn new(addr: SocketAddr, write_stream: OwnedWriteHalf) -> Self {
        Self {
            addr,
            player_id: RwLock::new(None),
            connected: RwLock::new(true),
            write_stream: Mutex::new(write_stream),
        }
    }

    /// Writes one packet to the client, retrying up to 3 times before
    /// giving up with a write error.
    pub async fn send_packet(&self, packet: &Packet) -> Result<(), NetworkError> {
        let bytes = packet.wrap_packet();
        let mut tries = 0;
        while tries < 3 {
            let mut stream = self.write_stream.lock().await;
            match stream.write_all(&bytes).await {
                Ok(()) => {
                    logger!(
                        DEBUG,
                        "[CLIENT] Sent packet {{ type: {}, size: {} }} to `{}`",
                        packet.header.header_type,
                        bytes.len(),
                        self.addr
                    );
                    return Ok(());
                }
                Err(error) => {
                    logger!(
                        WARN,
                        "[CLIENT] Failed to send packet to `{}` ({error}). Retrying... [{}/3]",
                        self.addr,
                        tries + 1
                    );
                    tries += 1;
                }
            }
        }
        Err(NetworkError::PacketWrite(format!(
            "gave up after 3 attempts to `{}`",
            self.addr
        )))
    }

    pub async fn disconnect(&self) {
        let mut connected = self.connected.write().await;
        *connected = false;
        logger!(INFO, "[CLIENT] Client `{}` disconnected", self.addr);
    }
}
