use std::collections::HashMap;
use std::io::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::client::Client;
use super::protocol::Protocol;
use crate::game::match_instance::MatchInstance;
use crate::logger;
use crate::utils::logger::Logger;

static HOST: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

/// The listening server plus the registry of live matches. Each match is
/// its own lock; intents on different matches never contend.
pub struct ServerInstance {
    pub socket: TcpListener,
    matches: RwLock<HashMap<Uuid, Arc<MatchInstance>>>,
}

impl ServerInstance {
    pub async fn create_instance(port: u16) -> Result<ServerInstance, Error> {
        let socket = TcpListener::bind((HOST, port)).await?;
        logger!(INFO, "[SERVER] Listening on port {port}");
        Ok(ServerInstance {
            socket,
            matches: RwLock::new(HashMap::new()),
        })
    }

    pub async fn register_match(&self, match_id: Uuid, instance: MatchInstance) -> Arc<MatchInstance> {
        let instance = Arc::new(instance);
        let mut matches = self.matches.write().await;
        matches.insert(match_id, Arc::clone(&instance));
        instance
    }

    pub async fn get_match(&self, match_id: Uuid) -> Option<Arc<MatchInstance>> {
        let matches = self.matches.read().await;
        matches.get(&match_id).cloned()
    }

    /// Drops completed matches from the registry; their final snapshots
    /// already live in the match store.
    pub async fn sweep_completed(&self) {
        let mut matches = self.matches.write().await;
        let mut finished: Vec<Uuid> = Vec::new();
        for (id, instance) in matches.iter() {
            if instance.match_status().await == crate::game::entity::state::MatchStatus::Completed {
                finished.push(*id);
            }
        }
        for id in finished {
            matches.remove(&id);
            logger!(DEBUG, "[SERVER] Swept completed match `{id}`");
        }
    }

    async fn handle_client(server: Arc<ServerInstance>, stream: TcpStream) {
        let addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(_) => return,
        };
        let (mut read_stream, write_stream) = stream.into_split();
        let client = Arc::new(Client::new(addr, write_stream));
        let protocol = Protocol::new(Arc::clone(&server));

        logger!(INFO, "[SERVER] Incoming connection from `{addr}`");
        let mut buffer = [0u8; 8192];
        while *client.connected.read().await {
            let bytes_read = match read_stream.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => break,
            };
            protocol
                .handle_incoming(Arc::clone(&client), &buffer[..bytes_read])
                .await;
        }
        logger!(INFO, "[SERVER] Closing connection with `{addr}`");
    }

    pub async fn run(self: Arc<Self>) {
        loop {
            if let Ok((stream, _)) = self.socket.accept().await {
                let server_clone = Arc::clone(&self);
                tokio::spawn(ServerInstance::handle_client(server_clone, stream));
            }
        }
    }
}
