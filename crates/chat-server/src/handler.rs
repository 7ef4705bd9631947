use chat_protocol::{Frame, MessageBody};
use tokio::sync::mpsc;

use crate::hub::HubHandle;
use crate::session::State;

/// Maps one decoded frame to a hub operation (or a direct reply), per the
/// connection's current handshake state. The tag set is small and closed, so
/// a match is this crate's router.
pub(crate) async fn dispatch(
    hub: &HubHandle,
    state: &mut State,
    body: MessageBody,
    local_tx: &mpsc::Sender<Frame>,
) {
    match state {
        State::Closed => {}
        State::Registered { .. } => {
            let session_id = state.session_id().expect("just matched Registered").to_string();
            dispatch_registered(hub, state, &session_id, body).await;
        }
        State::Unauthenticated => {
            dispatch_unauthenticated(hub, state, body, local_tx).await;
        }
    }
}

async fn dispatch_unauthenticated(
    hub: &HubHandle,
    state: &mut State,
    body: MessageBody,
    local_tx: &mpsc::Sender<Frame>,
) {
    match body {
        MessageBody::Connect { username } => match hub.register(username, local_tx.clone()).await {
            Ok(Ok(session_id)) => {
                log::info!("connection registered with session {session_id}");
                *state = State::Registered { session_id };
            }
            Ok(Err(reason)) => {
                log::info!("handshake rejected: {reason}");
                let _ = local_tx.try_send(Frame::connection_error(reason));
            }
            Err(err) => {
                log::error!("hub unreachable during register: {err}");
            }
        },
        _ => {
            let _ = local_tx.try_send(Frame::connection_error(
                "Primer mensaje debe ser de conexión",
            ));
        }
    }
}

async fn dispatch_registered(hub: &HubHandle, state: &mut State, session_id: &str, body: MessageBody) {
    match body {
        MessageBody::CreateRoom { room_name } => {
            let _ = hub
                .create_room_and_join(session_id.to_string(), room_name)
                .await;
        }
        MessageBody::JoinRoom { room_name } => {
            let _ = hub.join_room(session_id.to_string(), room_name).await;
        }
        MessageBody::LeaveRoom { room_name } => {
            let _ = hub.leave_room(session_id.to_string(), room_name).await;
        }
        MessageBody::ListRooms {} => {
            let _ = hub.list_rooms(session_id.to_string()).await;
        }
        MessageBody::ChatMessage {
            room_name, content, ..
        } => {
            let room_name = Some(room_name).filter(|r| !r.trim().is_empty());
            let _ = hub
                .broadcast_chat(session_id.to_string(), room_name, content)
                .await;
        }
        MessageBody::Disconnect { .. } => {
            let _ = hub.disconnect(session_id.to_string()).await;
            *state = State::Closed;
        }
        MessageBody::Connect { .. } => {
            log::trace!("ignoring redundant connect from {session_id}");
        }
        // Server-to-client tags arriving from a client are logged and ignored.
        other => log::trace!("ignoring client-sent server tag: {other:?}"),
    }
}
