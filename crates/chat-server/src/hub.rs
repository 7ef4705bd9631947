use chat_protocol::{Frame, RoomSummary};
use indexmap::IndexMap;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use crate::room::{Room, GENERAL_ROOM};

const MAX_DISPLAY_NAME: usize = 30;
const MAX_ROOM_NAME: usize = 50;
const MAX_CONSECUTIVE_DROPS: u32 = 3;
const HUB_COMMAND_CAPACITY: usize = 256;
const SESSION_OUTBOX_CAPACITY: usize = 64;

const ERR_BAD_USERNAME: &str = "Nombre de usuario inválido o ya en uso";
const ERR_EMPTY_ROOM_NAME: &str = "El nombre de la sala no puede estar vacío";
const ERR_ROOM_NAME_TOO_LONG: &str = "El nombre de la sala es demasiado largo (máx. 50 caracteres)";
const ERR_NOT_IN_ANY_ROOM: &str = "No estás en ninguna sala";
const ERR_NOT_IN_ROOM: &str = "No estás en esta sala";
const ERR_MUST_SPECIFY_ROOM_NAME: &str = "Debe especificar el nombre de la sala";

/// Outbound capacity a new session's queue should be created with; exposed so
/// `session.rs` and the hub agree on the same bound.
pub const OUTBOX_CAPACITY: usize = SESSION_OUTBOX_CAPACITY;

enum HubCommand {
    Register {
        display_name: String,
        outbox: mpsc::Sender<Frame>,
        reply: oneshot::Sender<Result<String, String>>,
    },
    CreateRoomAndJoin {
        session_id: String,
        room_name: String,
    },
    JoinRoom {
        session_id: String,
        room_name: String,
    },
    LeaveRoom {
        session_id: String,
        room_name: Option<String>,
    },
    BroadcastChat {
        session_id: String,
        room_name: Option<String>,
        content: String,
    },
    ListRooms {
        session_id: String,
    },
    Disconnect {
        session_id: String,
    },
}

struct SessionEntry {
    display_name: String,
    outbox: mpsc::Sender<Frame>,
    current_room: Option<String>,
    consecutive_drops: u32,
}

/// A cloneable handle to the hub actor. Every session holds one.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a new display name. On success the hub has already enqueued
    /// `connection_ack` and `rooms_list` onto `outbox`.
    pub async fn register(
        &self,
        display_name: String,
        outbox: mpsc::Sender<Frame>,
    ) -> anyhow::Result<Result<String, String>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubCommand::Register {
                display_name,
                outbox,
                reply,
            })
            .await?;
        Ok(rx.await?)
    }

    pub async fn create_room_and_join(
        &self,
        session_id: String,
        room_name: String,
    ) -> anyhow::Result<()> {
        self.tx
            .send(HubCommand::CreateRoomAndJoin {
                session_id,
                room_name,
            })
            .await?;
        Ok(())
    }

    pub async fn join_room(&self, session_id: String, room_name: String) -> anyhow::Result<()> {
        self.tx
            .send(HubCommand::JoinRoom {
                session_id,
                room_name,
            })
            .await?;
        Ok(())
    }

    pub async fn leave_room(
        &self,
        session_id: String,
        room_name: Option<String>,
    ) -> anyhow::Result<()> {
        self.tx
            .send(HubCommand::LeaveRoom {
                session_id,
                room_name,
            })
            .await?;
        Ok(())
    }

    pub async fn broadcast_chat(
        &self,
        session_id: String,
        room_name: Option<String>,
        content: String,
    ) -> anyhow::Result<()> {
        self.tx
            .send(HubCommand::BroadcastChat {
                session_id,
                room_name,
                content,
            })
            .await?;
        Ok(())
    }

    pub async fn list_rooms(&self, session_id: String) -> anyhow::Result<()> {
        self.tx.send(HubCommand::ListRooms { session_id }).await?;
        Ok(())
    }

    pub async fn disconnect(&self, session_id: String) -> anyhow::Result<()> {
        self.tx.send(HubCommand::Disconnect { session_id }).await?;
        Ok(())
    }
}

/// Authoritative registry of sessions and rooms. Runs as a single actor task
/// that serializes every mutation; see the module doc in `lib.rs`.
struct Hub {
    sessions: IndexMap<String, SessionEntry>,
    rooms: IndexMap<String, Room>,
}

/// Spawns the hub actor and returns a handle for sessions to talk to it.
pub fn spawn() -> (HubHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(HUB_COMMAND_CAPACITY);
    let mut hub = Hub::new();
    let join = tokio::spawn(async move { hub.run(rx).await });
    (HubHandle { tx }, join)
}

impl Hub {
    fn new() -> Self {
        let mut rooms = IndexMap::new();
        rooms.insert(
            GENERAL_ROOM.to_string(),
            Room::new(GENERAL_ROOM, "system"),
        );
        Self {
            sessions: IndexMap::new(),
            rooms,
        }
    }

    async fn run(&mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd);
        }
        log::info!("hub actor shutting down, no handles remain");
    }

    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register {
                display_name,
                outbox,
                reply,
            } => {
                let result = self.register(display_name, outbox);
                let _ = reply.send(result);
            }
            HubCommand::CreateRoomAndJoin {
                session_id,
                room_name,
            } => self.create_room_and_join(&session_id, room_name),
            HubCommand::JoinRoom {
                session_id,
                room_name,
            } => self.join_room(&session_id, &room_name),
            HubCommand::LeaveRoom {
                session_id,
                room_name,
            } => {
                self.leave_room_requested(&session_id, room_name);
            }
            HubCommand::BroadcastChat {
                session_id,
                room_name,
                content,
            } => self.broadcast_chat(&session_id, room_name, content),
            HubCommand::ListRooms { session_id } => self.list_rooms(&session_id),
            HubCommand::Disconnect { session_id } => self.disconnect(&session_id),
        }
    }

    fn register(&mut self, display_name: String, outbox: mpsc::Sender<Frame>) -> Result<String, String> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_DISPLAY_NAME {
            return Err(ERR_BAD_USERNAME.to_string());
        }
        let lower = trimmed.to_lowercase();
        if self
            .sessions
            .values()
            .any(|s| s.display_name.to_lowercase() == lower)
        {
            return Err(ERR_BAD_USERNAME.to_string());
        }

        let session_id = generate_session_id();
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                display_name: trimmed.to_string(),
                outbox,
                current_room: None,
                consecutive_drops: 0,
            },
        );
        log::info!("session {session_id} registered as '{trimmed}'");

        self.enqueue(&session_id, Frame::connection_ack(trimmed, session_id.as_str()));
        let snapshot = self.rooms_snapshot();
        self.enqueue(&session_id, Frame::rooms_list(snapshot));

        Ok(session_id)
    }

    fn create_room_and_join(&mut self, session_id: &str, room_name: String) {
        let trimmed = room_name.trim().to_string();
        if trimmed.is_empty() {
            self.enqueue(session_id, Frame::error(ERR_EMPTY_ROOM_NAME));
            return;
        }
        if trimmed.chars().count() > MAX_ROOM_NAME {
            self.enqueue(session_id, Frame::error(ERR_ROOM_NAME_TOO_LONG));
            return;
        }
        if self.rooms.contains_key(&trimmed) {
            self.enqueue(
                session_id,
                Frame::error(format!("La sala '{trimmed}' ya existe")),
            );
            return;
        }

        if let Some(current) = self.current_room_of(session_id) {
            self.leave_room_internal(session_id, &current);
        }

        let display_name = match self.sessions.get(session_id) {
            Some(s) => s.display_name.clone(),
            None => return,
        };

        let mut room = Room::new(trimmed.clone(), display_name.clone());
        room.add_member(session_id);
        self.rooms.insert(trimmed.clone(), room);
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.current_room = Some(trimmed.clone());
        }

        log::info!("room '{trimmed}' created by '{display_name}'");

        self.global_broadcast(Frame::system_message(
            format!("Se ha creado la sala '{trimmed}'"),
            None,
        ));
        let snapshot = self.rooms_snapshot();
        self.global_broadcast(Frame::rooms_list(snapshot));

        self.enqueue(
            session_id,
            Frame::room_users(trimmed.as_str(), vec![display_name]),
        );
        self.enqueue(
            session_id,
            Frame::system_message(
                format!("Has creado y te has unido a la sala '{trimmed}'"),
                Some(trimmed.clone()),
            ),
        );
    }

    fn join_room(&mut self, session_id: &str, room_name: &str) {
        let room_name = room_name.trim();
        if room_name.is_empty() {
            self.enqueue(session_id, Frame::error(ERR_MUST_SPECIFY_ROOM_NAME));
            return;
        }
        if self.current_room_of(session_id).as_deref() == Some(room_name) {
            return;
        }
        if !self.rooms.contains_key(room_name) {
            self.enqueue(
                session_id,
                Frame::error(format!("La sala '{room_name}' no existe")),
            );
            return;
        }
        if let Some(current) = self.current_room_of(session_id) {
            self.leave_room_internal(session_id, &current);
        }

        let display_name = match self.sessions.get(session_id) {
            Some(s) => s.display_name.clone(),
            None => return,
        };

        if let Some(room) = self.rooms.get_mut(room_name) {
            room.add_member(session_id);
        }
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.current_room = Some(room_name.to_string());
        }

        log::info!("'{display_name}' joined room '{room_name}'");

        let member_ids: Vec<String> = self
            .rooms
            .get(room_name)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default();
        for member_id in &member_ids {
            if member_id != session_id {
                self.enqueue(
                    member_id,
                    Frame::user_joined(display_name.as_str(), room_name),
                );
            }
        }
        let member_names = self.display_names(&member_ids);
        for member_id in &member_ids {
            self.enqueue(member_id, Frame::room_users(room_name, member_names.clone()));
        }
        self.enqueue(
            session_id,
            Frame::system_message(
                format!("Te has unido a la sala '{room_name}'"),
                Some(room_name.to_string()),
            ),
        );
        let snapshot = self.rooms_snapshot();
        self.global_broadcast(Frame::rooms_list(snapshot));
    }

    /// Handles the explicit `leave_room` client request: an absent
    /// `room_name` defaults to the session's current room and a session with
    /// no current room is a silent no-op.
    fn leave_room_requested(&mut self, session_id: &str, room_name: Option<String>) {
        let target = room_name.or_else(|| self.current_room_of(session_id));
        let Some(target) = target else { return };
        self.leave_room_internal(session_id, &target);
    }

    fn leave_room_internal(&mut self, session_id: &str, room_name: &str) {
        let was_member = self
            .rooms
            .get_mut(room_name)
            .map(|r| r.remove_member(session_id))
            .unwrap_or(false);
        if !was_member {
            return;
        }
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.current_room = None;
        }
        let display_name = self
            .sessions
            .get(session_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_default();

        log::info!("'{display_name}' left room '{room_name}'");

        let remaining: Vec<String> = self
            .rooms
            .get(room_name)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default();
        for member_id in &remaining {
            self.enqueue(member_id, Frame::user_left(display_name.as_str(), room_name));
        }
        if !remaining.is_empty() {
            let names = self.display_names(&remaining);
            for member_id in &remaining {
                self.enqueue(member_id, Frame::room_users(room_name, names.clone()));
            }
        } else if room_name != GENERAL_ROOM {
            self.rooms.shift_remove(room_name);
            log::info!("room '{room_name}' deleted (empty)");
        }
        let snapshot = self.rooms_snapshot();
        self.global_broadcast(Frame::rooms_list(snapshot));
    }

    fn broadcast_chat(&mut self, session_id: &str, room_name: Option<String>, content: String) {
        let content = content.trim().to_string();
        if content.is_empty() {
            return;
        }
        let room_name = room_name
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.current_room_of(session_id));
        let Some(room_name) = room_name else {
            self.enqueue(session_id, Frame::error(ERR_NOT_IN_ANY_ROOM));
            return;
        };

        let is_member = self
            .rooms
            .get(&room_name)
            .map(|r| r.members.contains(session_id))
            .unwrap_or(false);
        if !is_member {
            self.enqueue(session_id, Frame::error(ERR_NOT_IN_ROOM));
            return;
        }

        let display_name = match self.sessions.get(session_id) {
            Some(s) => s.display_name.clone(),
            None => return,
        };

        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.append_history(display_name.as_str(), content.as_str());
        }
        let member_ids: Vec<String> = self
            .rooms
            .get(&room_name)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default();
        let frame = Frame::chat_message(display_name.as_str(), room_name.as_str(), content.as_str());
        for member_id in &member_ids {
            self.enqueue(member_id, frame.clone());
        }
    }

    fn list_rooms(&mut self, session_id: &str) {
        let snapshot = self.rooms_snapshot();
        self.enqueue(session_id, Frame::rooms_list(snapshot));
    }

    fn disconnect(&mut self, session_id: &str) {
        if let Some(current) = self.current_room_of(session_id) {
            self.leave_room_internal(session_id, &current);
        }
        if self.sessions.shift_remove(session_id).is_some() {
            log::info!("session {session_id} disconnected");
        }
    }

    fn current_room_of(&self, session_id: &str) -> Option<String> {
        self.sessions.get(session_id)?.current_room.clone()
    }

    fn display_names(&self, session_ids: &[String]) -> Vec<String> {
        session_ids
            .iter()
            .filter_map(|id| self.sessions.get(id).map(|s| s.display_name.clone()))
            .collect()
    }

    fn rooms_snapshot(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .map(|room| RoomSummary {
                name: room.name.clone(),
                created_by: room.created_by.clone(),
                created_at: room.created_at.clone(),
                user_count: room.members.len(),
                users: self.display_names(&room.members.iter().cloned().collect::<Vec<_>>()),
            })
            .collect()
    }

    fn global_broadcast(&mut self, frame: Frame) {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        for id in ids {
            self.enqueue(&id, frame.clone());
        }
    }

    /// Non-blocking send to a session's outbound queue. Drops the frame and
    /// counts a slow-consumer strike if the queue is full; three consecutive
    /// strikes force-disconnects the session.
    fn enqueue(&mut self, session_id: &str, frame: Frame) {
        let Some(entry) = self.sessions.get_mut(session_id) else {
            return;
        };
        let drops_after_failure = match entry.outbox.try_send(frame) {
            Ok(()) => {
                entry.consecutive_drops = 0;
                None
            }
            Err(_) => {
                entry.consecutive_drops += 1;
                Some(entry.consecutive_drops)
            }
        };

        if let Some(drops) = drops_after_failure {
            log::warn!("slow consumer {session_id}: dropped frame (strike {drops})");
            if drops >= MAX_CONSECUTIVE_DROPS {
                log::warn!("disconnecting slow consumer {session_id}");
                self.disconnect(session_id);
            }
        }
    }
}

fn generate_session_id() -> String {
    const CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_protocol::MessageBody;
    use tokio::sync::mpsc::Receiver;

    async fn register(hub: &HubHandle, name: &str) -> (String, Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let session_id = hub
            .register(name.to_string(), tx)
            .await
            .unwrap()
            .expect("registration should succeed");
        (session_id, rx)
    }

    async fn drain_one(rx: &mut Receiver<Frame>) -> MessageBody {
        rx.recv().await.expect("channel open").body
    }

    #[tokio::test]
    async fn register_rejects_duplicate_name_case_insensitively() {
        let (hub, _join) = spawn();
        let (_id, _rx) = register(&hub, "Alice").await;

        let (tx, _rx2) = mpsc::channel(OUTBOX_CAPACITY);
        let result = hub.register("alice".to_string(), tx).await.unwrap();
        assert_eq!(result, Err(ERR_BAD_USERNAME.to_string()));
    }

    #[tokio::test]
    async fn register_sends_ack_then_rooms_list() {
        let (hub, _join) = spawn();
        let (session_id, mut rx) = register(&hub, "Alice").await;

        match drain_one(&mut rx).await {
            MessageBody::ConnectionAck { username, user_id } => {
                assert_eq!(username, "Alice");
                assert_eq!(user_id, session_id);
            }
            other => panic!("expected connection_ack, got {other:?}"),
        }
        match drain_one(&mut rx).await {
            MessageBody::RoomsList { rooms } => {
                assert_eq!(rooms.len(), 1);
                assert_eq!(rooms[0].name, "General");
            }
            other => panic!("expected rooms_list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_room_and_join_notifies_creator_and_everyone_else() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        let (_bob_id, mut bob_rx) = register(&hub, "Bob").await;
        // drain Bob's own ack + rooms_list before the create_room chatter
        drain_one(&mut bob_rx).await;
        drain_one(&mut bob_rx).await;

        hub.create_room_and_join(alice_id.clone(), "Rust".to_string())
            .await
            .unwrap();

        // Bob, uninvolved, still hears the global announcements.
        assert!(matches!(
            drain_one(&mut bob_rx).await,
            MessageBody::SystemMessage { .. }
        ));
        assert!(matches!(
            drain_one(&mut bob_rx).await,
            MessageBody::RoomsList { .. }
        ));

        // Alice gets the same two broadcasts plus her personal confirmations.
        assert!(matches!(
            drain_one(&mut alice_rx).await,
            MessageBody::SystemMessage { .. }
        ));
        assert!(matches!(
            drain_one(&mut alice_rx).await,
            MessageBody::RoomsList { .. }
        ));
        match drain_one(&mut alice_rx).await {
            MessageBody::RoomUsers { room_name, users } => {
                assert_eq!(room_name, "Rust");
                assert_eq!(users, vec!["Alice".to_string()]);
            }
            other => panic!("expected room_users, got {other:?}"),
        }
        assert!(matches!(
            drain_one(&mut alice_rx).await,
            MessageBody::SystemMessage { .. }
        ));
    }

    #[tokio::test]
    async fn join_room_rejects_unknown_room() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.join_room(alice_id, "Nope".to_string()).await.unwrap();

        match drain_one(&mut alice_rx).await {
            MessageBody::Error { message } => {
                assert_eq!(message, "La sala 'Nope' no existe");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_room_rejects_empty_name_without_leaving_current_room() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.join_room(alice_id.clone(), "General".to_string())
            .await
            .unwrap();
        drain_one(&mut alice_rx).await; // room_users
        drain_one(&mut alice_rx).await; // system_message
        drain_one(&mut alice_rx).await; // rooms_list

        hub.join_room(alice_id.clone(), "   ".to_string())
            .await
            .unwrap();
        match drain_one(&mut alice_rx).await {
            MessageBody::Error { message } => {
                assert_eq!(message, "Debe especificar el nombre de la sala");
            }
            other => panic!("expected error, got {other:?}"),
        }

        // Alice must still be in General: a second join to the same room is a
        // silent no-op, not a fresh join sequence.
        hub.join_room(alice_id, "General".to_string()).await.unwrap();
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_room_trims_whitespace_before_lookup() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.join_room(alice_id, "  General  ".to_string())
            .await
            .unwrap();
        match drain_one(&mut alice_rx).await {
            MessageBody::RoomUsers { room_name, users } => {
                assert_eq!(room_name, "General");
                assert_eq!(users, vec!["Alice".to_string()]);
            }
            other => panic!("expected room_users, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_room_unknown_target_leaves_current_room_untouched() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.join_room(alice_id.clone(), "General".to_string())
            .await
            .unwrap();
        drain_one(&mut alice_rx).await; // room_users
        drain_one(&mut alice_rx).await; // system_message
        drain_one(&mut alice_rx).await; // rooms_list

        hub.join_room(alice_id.clone(), "Nope".to_string())
            .await
            .unwrap();
        match drain_one(&mut alice_rx).await {
            MessageBody::Error { message } => assert_eq!(message, "La sala 'Nope' no existe"),
            other => panic!("expected error, got {other:?}"),
        }

        // Alice is still in General: leaving it produces user_left/room_users
        // to herself (sole member reduces to just the refreshed rooms_list
        // once she's the only one left, but the leave must still take effect,
        // proving she was never evicted by the failed join to "Nope").
        hub.leave_room(alice_id, Some("General".to_string()))
            .await
            .unwrap();
        match drain_one(&mut alice_rx).await {
            MessageBody::RoomsList { rooms } => {
                assert!(rooms.iter().any(|r| r.name == "General"));
            }
            other => panic!("expected rooms_list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_message_echoes_to_sender_and_members() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        let (bob_id, mut bob_rx) = register(&hub, "Bob").await;
        for _ in 0..2 {
            drain_one(&mut alice_rx).await;
            drain_one(&mut bob_rx).await;
        }

        hub.create_room_and_join(alice_id.clone(), "Rust".to_string())
            .await
            .unwrap();
        for _ in 0..4 {
            drain_one(&mut alice_rx).await;
        }
        drain_one(&mut bob_rx).await; // system_message
        drain_one(&mut bob_rx).await; // rooms_list

        hub.join_room(bob_id.clone(), "Rust".to_string())
            .await
            .unwrap();
        // Alice hears user_joined + room_users + the refreshed rooms_list;
        // Bob hears room_users + system_message + rooms_list.
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut bob_rx).await;
        drain_one(&mut bob_rx).await;
        drain_one(&mut bob_rx).await;

        hub.broadcast_chat(alice_id.clone(), Some("Rust".to_string()), "hi there".to_string())
            .await
            .unwrap();

        match drain_one(&mut alice_rx).await {
            MessageBody::ChatMessage {
                username,
                room_name,
                content,
            } => {
                assert_eq!(username, "Alice");
                assert_eq!(room_name, "Rust");
                assert_eq!(content, "hi there");
            }
            other => panic!("expected chat_message, got {other:?}"),
        }
        match drain_one(&mut bob_rx).await {
            MessageBody::ChatMessage { username, .. } => assert_eq!(username, "Alice"),
            other => panic!("expected chat_message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chatting_outside_a_room_is_rejected() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.broadcast_chat(alice_id, None, "hello?".to_string())
            .await
            .unwrap();

        match drain_one(&mut alice_rx).await {
            MessageBody::Error { message } => assert_eq!(message, ERR_NOT_IN_ANY_ROOM),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn leaving_a_non_general_room_empty_deletes_it() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.create_room_and_join(alice_id.clone(), "Temp".to_string())
            .await
            .unwrap();
        for _ in 0..4 {
            drain_one(&mut alice_rx).await;
        }

        hub.leave_room(alice_id, None).await.unwrap();
        // user_left (to no-one, room is now empty) is skipped; only the
        // refreshed rooms_list reaches Alice.
        match drain_one(&mut alice_rx).await {
            MessageBody::RoomsList { rooms } => {
                assert!(rooms.iter().all(|r| r.name != "Temp"));
            }
            other => panic!("expected rooms_list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn general_room_survives_becoming_empty() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.join_room(alice_id.clone(), "General".to_string())
            .await
            .unwrap();
        drain_one(&mut alice_rx).await; // room_users
        drain_one(&mut alice_rx).await; // system_message
        drain_one(&mut alice_rx).await; // rooms_list

        hub.leave_room(alice_id, Some("General".to_string()))
            .await
            .unwrap();
        match drain_one(&mut alice_rx).await {
            MessageBody::RoomsList { rooms } => {
                assert!(rooms.iter().any(|r| r.name == "General"));
            }
            other => panic!("expected rooms_list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnect_removes_session_and_frees_its_name() {
        let (hub, _join) = spawn();
        let (alice_id, mut alice_rx) = register(&hub, "Alice").await;
        drain_one(&mut alice_rx).await;
        drain_one(&mut alice_rx).await;

        hub.disconnect(alice_id).await.unwrap();

        let (_id, _rx) = register(&hub, "Alice").await;
    }
}
