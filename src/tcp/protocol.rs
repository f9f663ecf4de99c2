use std::sync::Arc;
use uuid::Uuid;

use super::client::Client;
use super::header::HeaderType;
use super::packet::Packet;
use super::server::ServerInstance;
use crate::game::entity::state::{GameState, MatchMode};
use crate::game::factory;
use crate::game::match_instance::{IntentReply, MatchInstance};
use crate::logger;
use crate::models::client_requests::{
    ConnectionRequest, IntentRequest, MatchStateResponse, ResolveTrapRequest, StartMatchRequest,
};
use crate::services::{decks, matches, npcs, players};
use crate::utils::errors::ServiceError;
use crate::utils::logger::Logger;

/// Dispatches parsed packets onto the match operations: authenticate,
/// start a match, apply an intent, resolve a trap decision.
pub struct Protocol {
    pub server: Arc<ServerInstance>,
}

impl Protocol {
    pub fn new(server: Arc<ServerInstance>) -> Self {
        Protocol { server }
    }

    /// Entry point for every buffer read off a client socket. Parses the
    /// packet, verifies the checksum and hands it to the dispatcher; framing
    /// failures are answered in-band rather than dropped.
    pub async fn handle_incoming(&self, client: Arc<Client>, buffer: &[u8]) {
        match Packet::parse(buffer) {
            Ok(packet) => {
                logger!(
                    DEBUG,
                    "[PROTOCOL] Received packet {{ type: {}, size: {} }} from `{}`",
                    packet.header.header_type,
                    packet.header.payload_length,
                    client.addr
                );
                if !packet.checksum_valid() {
                    logger!(WARN, "[PROTOCOL] Invalid checksum from `{}`", client.addr);
                    self.send_or_disconnect(client, &Packet::new(HeaderType::InvalidChecksum, b""))
                        .await;
                    return;
                }
                self.handle_packet(client, &packet).await;
            }
            Err(error) => {
                logger!(
                    WARN,
                    "[PROTOCOL] Unable to parse packet from `{}`: {error}",
                    client.addr
                );
                self.send_or_disconnect(client, &Packet::new(HeaderType::InvalidHeader, b""))
                    .await;
            }
        }
    }

    async fn handle_packet(&self, client: Arc<Client>, packet: &Packet) {
        match packet.header.header_type {
            HeaderType::Disconnect => {
                let _ = client.send_packet(&Packet::new(HeaderType::Disconnect, b"")).await;
                client.disconnect().await;
            }
            HeaderType::Ping => {
                self.send_or_disconnect(client, &Packet::new(HeaderType::Ping, b"")).await;
            }
            HeaderType::Connect => self.handle_connect(client, packet).await,
            HeaderType::StartMatch => self.handle_start_match(client, packet).await,
            HeaderType::ApplyIntent => self.handle_apply_intent(client, packet).await,
            HeaderType::ResolveTrap => self.handle_resolve_trap(client, packet).await,
            _ => {
                logger!(WARN, "[PROTOCOL] Unexpected header from `{}`", client.addr);
                self.send_or_disconnect(client, &Packet::new(HeaderType::InvalidHeader, b""))
                    .await;
            }
        }
    }

    /// Associates the connection with a player identity after checking it
    /// against the identity service.
    async fn handle_connect(&self, client: Arc<Client>, packet: &Packet) {
        let request = match serde_cbor::from_slice::<ConnectionRequest>(&packet.payload) {
            Ok(request) => request,
            Err(_) => {
                self.send_or_disconnect(
                    client,
                    &Packet::new(
                        HeaderType::InvalidPacketPayload,
                        b"Could not parse connection request.",
                    ),
                )
                .await;
                return;
            }
        };
        match players::fetch_profile(&request.player_id).await {
            Ok(profile) => {
                logger!(
                    INFO,
                    "[PROTOCOL] Client `{}` authenticated as `{}`",
                    client.addr,
                    profile.gamer_tag
                );
                let mut player_id = client.player_id.write().await;
                *player_id = Some(profile.id.clone());
                drop(player_id);
                let body = serde_json::to_vec(&profile).unwrap_or_default();
                self.send_or_disconnect(client, &Packet::new(HeaderType::Connect, &body))
                    .await;
            }
            Err(error) => self.send_service_failure(client, &error).await,
        }
    }

    /// Starts a match: resolves both identities and decks, builds the
    /// initial state through the factory, registers the live match and
    /// persists the first snapshot.
    async fn handle_start_match(&self, client: Arc<Client>, packet: &Packet) {
        let request = match serde_cbor::from_slice::<StartMatchRequest>(&packet.payload) {
            Ok(request) => request,
            Err(_) => {
                self.send_or_disconnect(
                    client,
                    &Packet::new(
                        HeaderType::InvalidPacketPayload,
                        b"Could not parse start match request.",
                    ),
                )
                .await;
                return;
            }
        };

        let reply = self.start_match(&request).await;
        match reply {
            Ok(response) => {
                let body = serde_json::to_vec(&response).unwrap_or_default();
                self.send_or_disconnect(client, &Packet::new(HeaderType::GameState, &body))
                    .await;
            }
            Err(error) => self.send_service_failure(client, &error).await,
        }
    }

    async fn start_match(
        &self,
        request: &StartMatchRequest,
    ) -> Result<MatchStateResponse, ServiceError> {
        let player = players::fetch_profile(&request.player_id).await?;
        let player_deck = decks::load_deck_card_defs(&request.deck_id).await?;

        let (opponent_name, opponent_deck) = match request.mode {
            MatchMode::Pve => {
                let npc = npcs::pick_npc(request.npc_id.as_deref()).await?;
                let deck = decks::load_deck_card_defs(&npc.deck_id).await?;
                (npc.display_name, deck)
            }
            MatchMode::Pvp => {
                let opponent_id = request
                    .opponent_id
                    .as_deref()
                    .ok_or(ServiceError::PlayerNotFound)?;
                let opponent = players::fetch_profile(opponent_id).await?;
                let deck_id = request
                    .opponent_deck_id
                    .as_deref()
                    .ok_or(ServiceError::DeckNotFound)?;
                let deck = decks::load_deck_card_defs(deck_id).await?;
                (opponent.gamer_tag, deck)
            }
        };

        let match_id = Uuid::new_v4();
        let state = factory::create_match(
            match_id,
            request.mode,
            (&player.gamer_tag, &player_deck),
            (&opponent_name, &opponent_deck),
        )
        .map_err(|e| ServiceError::Unexpected(e.to_string()))?;

        let events = state.log.clone();
        let snapshot = state.to_snapshot();
        matches::store_match(match_id, &snapshot, state.status).await?;
        self.server.register_match(match_id, MatchInstance::new(state)).await;
        logger!(INFO, "[PROTOCOL] Match `{match_id}` started for `{}`", player.gamer_tag);

        Ok(MatchStateResponse {
            match_id,
            game_state: snapshot,
            events,
            pending_decision: None,
            cancelled: None,
        })
    }

    /// Finds a live match, falling back to rehydrating it from the match
    /// store when the server was restarted underneath it.
    async fn lookup_match(&self, match_id: Uuid) -> Result<Arc<MatchInstance>, ServiceError> {
        if let Some(instance) = self.server.get_match(match_id).await {
            return Ok(instance);
        }
        let record = matches::load_match(match_id).await?;
        let state = GameState::from_snapshot(record.serialized_game_state)?;
        logger!(INFO, "[PROTOCOL] Rehydrated match `{match_id}` from the store");
        Ok(self
            .server
            .register_match(match_id, MatchInstance::new(state))
            .await)
    }

    async fn handle_apply_intent(&self, client: Arc<Client>, packet: &Packet) {
        let request = match serde_cbor::from_slice::<IntentRequest>(&packet.payload) {
            Ok(request) => request,
            Err(_) => {
                self.send_or_disconnect(
                    client,
                    &Packet::new(
                        HeaderType::InvalidPacketPayload,
                        b"Could not parse intent request.",
                    ),
                )
                .await;
                return;
            }
        };

        let instance = match self.lookup_match(request.match_id).await {
            Ok(instance) => instance,
            Err(error) => {
                self.send_service_failure(client, &error).await;
                return;
            }
        };

        match instance
            .handle_intent(request.player_index, request.intent.clone())
            .await
        {
            Ok(reply) => {
                self.persist_and_respond(client, request.match_id, &instance, reply)
                    .await;
            }
            Err(error) => {
                logger!(
                    DEBUG,
                    "[PROTOCOL] Intent `{}` rejected on `{}`: {}",
                    request.intent.label(),
                    request.match_id,
                    error.reason()
                );
                self.send_or_disconnect(
                    client,
                    &Packet::new(HeaderType::IntentRejected, error.reason().as_bytes()),
                )
                .await;
            }
        }
    }

    async fn handle_resolve_trap(&self, client: Arc<Client>, packet: &Packet) {
        let request = match serde_cbor::from_slice::<ResolveTrapRequest>(&packet.payload) {
            Ok(request) => request,
            Err(_) => {
                self.send_or_disconnect(
                    client,
                    &Packet::new(
                        HeaderType::InvalidPacketPayload,
                        b"Could not parse trap decision request.",
                    ),
                )
                .await;
                return;
            }
        };

        let instance = match self.lookup_match(request.match_id).await {
            Ok(instance) => instance,
            Err(error) => {
                self.send_service_failure(client, &error).await;
                return;
            }
        };

        match instance
            .handle_trap_decision(
                request.player_index,
                request.decision_id,
                request.trap_instance_id,
            )
            .await
        {
            Ok(reply) => {
                self.persist_and_respond(client, request.match_id, &instance, reply)
                    .await;
            }
            Err(error) => {
                self.send_or_disconnect(
                    client,
                    &Packet::new(HeaderType::IntentRejected, error.reason().as_bytes()),
                )
                .await;
            }
        }
    }

    /// Persists the post-transition snapshot, then answers with either the
    /// updated state or the open trap decision.
    async fn persist_and_respond(
        &self,
        client: Arc<Client>,
        match_id: Uuid,
        instance: &Arc<MatchInstance>,
        reply: IntentReply,
    ) {
        let status = instance.match_status().await;
        if let Err(error) = matches::store_match(match_id, &reply.snapshot, status).await {
            logger!(ERROR, "[PROTOCOL] Failed to persist match `{match_id}`: {error}");
        }
        if status == crate::game::entity::state::MatchStatus::Completed {
            self.server.sweep_completed().await;
        }

        let header = if reply.pending.is_some() {
            HeaderType::PendingDecision
        } else {
            HeaderType::GameState
        };
        let response = MatchStateResponse {
            match_id,
            game_state: reply.snapshot,
            events: reply.events,
            pending_decision: reply.pending,
            cancelled: reply.cancelled,
        };
        let body = serde_json::to_vec(&response).unwrap_or_default();
        self.send_or_disconnect(client, &Packet::new(header, &body)).await;
    }

    async fn send_service_failure(&self, client: Arc<Client>, error: &ServiceError) {
        logger!(WARN, "[PROTOCOL] Service failure: {error}");
        self.send_or_disconnect(
            client,
            &Packet::new(HeaderType::ServiceFailure, error.to_string().as_bytes()),
        )
        .await;
    }

    async fn send_or_disconnect(&self, client: Arc<Client>, packet: &Packet) {
        if client.send_packet(packet).await.is_err() {
            client.disconnect().await;
        }
    }
}
