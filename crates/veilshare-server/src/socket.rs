//! `SocketRouter`: one `tokio::spawn`ed task per connection, events
//! handled in arrival order, dispatch-by-variant
//! grounded on `agcodex-mcp-server::MessageProcessor::process_request`'s
//! shape (decode into a tagged enum, `match` once, one handler per
//! variant) enriched with `axum`'s WebSocket extractor (pack grounding:
//! Idleness76-Weavegraph's `demo7_axum_sse` for the `axum::serve` /
//! per-connection-task shape).

use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;

use veilshare_protocol::ChunkFrame;
use veilshare_protocol::ClearAllPayload;
use veilshare_protocol::ClientEvent;
use veilshare_protocol::ClientId;
use veilshare_protocol::ContentClearedPayload;
use veilshare_protocol::ContentPayload;
use veilshare_protocol::JoinPayload;
use veilshare_protocol::JoinReply;
use veilshare_protocol::MemberView;
use veilshare_protocol::PinPayload;
use veilshare_protocol::PinStatePayload;
use veilshare_protocol::RenamePayload;
use veilshare_protocol::RenamedPayload;
use veilshare_protocol::ServerEvent;
use veilshare_protocol::SessionId;
use veilshare_protocol::WireError;
use veilshare_protocol::WireErrorKind;

use crate::error::session_error_to_wire;
use crate::error::storage_error_to_wire;
use crate::pending::Admit;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Identity established once a connection successfully joins or rejoins;
/// `None` until then.
#[derive(Clone)]
struct Bound {
    session_id: SessionId,
    client_id: ClientId,
    client_name: String,
}

type Sink = SplitSink<WebSocket, Message>;

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut bound: Option<Bound> = None;

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                match outgoing {
                    Some(event) => {
                        if send_json(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text(&text, &state, &tx, &mut bound, &mut sink).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "websocket read error, closing connection");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Connection drop unregisters the fan-out entry but does not revoke
    // the member's token: that happens only on leave and on session
    // expiration. A reconnect can resume under the same membership
    // without an explicit rejoin.
    if let Some(bound) = bound {
        state.connections.unregister(&bound.session_id, &bound.client_id);
    }
}

async fn send_json<T: Serialize>(sink: &mut Sink, value: &T) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).unwrap_or_default();
    sink.send(Message::Text(text.into())).await
}

/// Returns `false` when the connection should close.
async fn handle_text(
    text: &str,
    state: &AppState,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    bound: &mut Option<Bound>,
    sink: &mut Sink,
) -> bool {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed event");
            let _ = send_json(sink, &WireError::new(WireErrorKind::ProtocolError, "malformed event payload")).await;
            return true;
        }
    };

    match event {
        ClientEvent::Join(payload) => handle_join(false, payload, state, tx, bound, sink).await,
        ClientEvent::Rejoin(payload) => handle_join(true, payload, state, tx, bound, sink).await,
        other => {
            let Some(current) = bound.clone() else {
                let _ =
                    send_json(sink, &WireError::new(WireErrorKind::Unauthorized, "join before sending events")).await;
                return true;
            };
            if state.registry.touch(&current.session_id).await.is_err() {
                let _ = send_json(
                    sink,
                    &WireError::new(WireErrorKind::SessionExpired, "session no longer exists"),
                )
                .await;
                return true;
            }
            match other {
                ClientEvent::Leave(_) => handle_leave(&current, state, bound).await,
                ClientEvent::Content(payload) => handle_content(payload, &current, state).await,
                ClientEvent::Chunk(frame) => handle_chunk(frame, &current, state, sink).await,
                ClientEvent::Pin(p) => handle_pin(p, &current, state, true, sink).await,
                ClientEvent::Unpin(p) => handle_pin(p, &current, state, false, sink).await,
                ClientEvent::Rename(p) => handle_rename(p, &current, state, sink).await,
                ClientEvent::ClearAll(p) => handle_clear_all(p, &current, state, sink).await,
                ClientEvent::Join(_) | ClientEvent::Rejoin(_) => unreachable!("handled above"),
            }
        }
    }
    true
}

async fn handle_join(
    is_rejoin: bool,
    payload: JoinPayload,
    state: &AppState,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    bound: &mut Option<Bound>,
    sink: &mut Sink,
) {
    let client_id = bound.as_ref().map(|b| b.client_id).unwrap_or_else(ClientId::new);
    let result = if is_rejoin {
        state
            .registry
            .rejoin(payload.session_id.clone(), client_id, payload.client_name.clone(), payload.fingerprint.clone())
            .await
    } else {
        state
            .registry
            .join_or_create(
                payload.session_id.clone(),
                client_id,
                payload.client_name.clone(),
                payload.fingerprint.clone(),
            )
            .await
    };

    match result {
        Ok(outcome) => {
            state.connections.register(payload.session_id.clone(), client_id, tx.clone());
            *bound = Some(Bound {
                session_id: payload.session_id.clone(),
                client_id,
                client_name: payload.client_name.clone(),
            });

            let manifest = state.chunk_store.list_content(&payload.session_id, state.config.max_items_to_send);
            let reply = JoinReply { token: outcome.token, clients: outcome.members, content_manifest: manifest };
            let _ = send_json(sink, &reply).await;

            let member_view = MemberView { id: client_id, name: payload.client_name.clone() };
            let event =
                if is_rejoin { ServerEvent::ClientRejoined(member_view) } else { ServerEvent::ClientJoined(member_view) };
            state.connections.broadcast(&payload.session_id, Some(client_id), event);
        }
        Err(err) => {
            let _ = send_json(sink, &session_error_to_wire(&err)).await;
        }
    }
}

async fn handle_leave(current: &Bound, state: &AppState, bound: &mut Option<Bound>) {
    let _ = state.registry.leave(&current.session_id, current.client_id).await;
    state.connections.unregister(&current.session_id, &current.client_id);
    let member_view = MemberView { id: current.client_id, name: current.client_name.clone() };
    state.connections.broadcast(&current.session_id, Some(current.client_id), ServerEvent::ClientLeft(member_view));
    *bound = None;
}

/// `content` ingress. Non-chunked content carries its ciphertext inline
/// as a base64 `body`; this implementation persists it through
/// `ChunkStore` as a single synthetic chunk 0 of 1 so
/// `isComplete`/`getAllChunks` behave uniformly for chunked and
/// non-chunked content alike (see DESIGN.md).
async fn handle_content(payload: ContentPayload, current: &Bound, state: &AppState) {
    let metadata = payload.metadata.clone();
    if metadata.session_id != current.session_id {
        tracing::warn!(content_id = %metadata.content_id, "dropping content event for a foreign session");
        return;
    }

    if let Err(err) = state.chunk_store.reserve_content(metadata.clone()).await {
        tracing::error!(error = %err, content_id = %metadata.content_id, "failed to reserve content metadata");
        return;
    }

    if let Some(body_b64) = &payload.body {
        match BASE64.decode(body_b64) {
            Ok(bytes) => {
                let iv = metadata.encryption_metadata.as_ref().map(|e| e.iv.clone()).unwrap_or_default();
                let frame = ChunkFrame {
                    content_id: metadata.content_id.clone(),
                    chunk_index: 0,
                    total_chunks: 1,
                    iv,
                    encrypted_data: bytes,
                };
                if let Err(err) = state.chunk_store.save_chunk(&frame).await {
                    tracing::error!(error = %err, content_id = %metadata.content_id, "failed to persist content body");
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, content_id = %metadata.content_id, "dropping content with invalid base64 body");
                return;
            }
        }
    } else {
        for frame in state.pending_chunks.take(&metadata.content_id) {
            if let Err(err) = state.chunk_store.save_chunk(&frame).await {
                tracing::error!(error = %err, content_id = %frame.content_id, "failed to persist buffered chunk");
            }
        }
    }

    // Peers always receive the metadata announcement; large files
    // suppress only the subsequent `chunk` events.
    state.connections.broadcast(&current.session_id, Some(current.client_id), ServerEvent::Content(payload));

    if let Err(err) =
        state.chunk_store.cleanup_old_content(&current.session_id, state.config.max_items_per_session).await
    {
        tracing::warn!(error = %err, session_id = %current.session_id, "retention cleanup failed after content ingress");
    }
}

/// `chunk` ingress. Buffers against an unseen `contentId` up to
/// `config.out_of_order_buffer`, rejecting with `OutOfOrder` on
/// overflow.
async fn handle_chunk(frame: ChunkFrame, current: &Bound, state: &AppState, sink: &mut Sink) {
    if let Err(reason) = frame.validate() {
        tracing::warn!(reason, content_id = %frame.content_id, "dropping invalid chunk frame");
        let _ = send_json(sink, &WireError::new(WireErrorKind::ProtocolError, reason)).await;
        return;
    }

    let metadata = match state.chunk_store.get_content_metadata(&frame.content_id) {
        Some(metadata) => metadata,
        None => {
            match state.pending_chunks.buffer(frame.clone(), state.config.out_of_order_buffer) {
                Admit::Buffered => {}
                Admit::Overflow => {
                    let _ = send_json(
                        sink,
                        &WireError::new(WireErrorKind::OutOfOrder, "chunk buffer exhausted for unknown content"),
                    )
                    .await;
                }
            }
            return;
        }
    };

    if metadata.session_id != current.session_id {
        tracing::warn!(content_id = %frame.content_id, "dropping chunk event for a foreign session");
        return;
    }

    let is_large_file = metadata.is_large_file;
    match state.chunk_store.save_chunk(&frame).await {
        Ok(updated) => {
            if !is_large_file {
                state.connections.broadcast(
                    &current.session_id,
                    Some(current.client_id),
                    ServerEvent::Chunk(frame),
                );
            }
            if updated.is_complete {
                tracing::debug!(content_id = %updated.content_id, "content complete");
            }
        }
        Err(err) => {
            tracing::error!(error = %err, content_id = %frame.content_id, "failed to save chunk");
        }
    }
}

async fn handle_pin(payload: PinPayload, current: &Bound, state: &AppState, pinned: bool, sink: &mut Sink) {
    let result = if pinned {
        state.chunk_store.pin_content(&payload.content_id).await
    } else {
        state.chunk_store.unpin_content(&payload.content_id).await
    };
    if let Err(err) = result {
        tracing::warn!(error = %err, content_id = %payload.content_id, "pin/unpin failed");
        let _ = send_json(sink, &storage_error_to_wire(&err)).await;
        return;
    }
    let event = ServerEvent::PinState(PinStatePayload { content_id: payload.content_id, is_pinned: pinned });
    state.connections.broadcast(&current.session_id, None, event);
}

async fn handle_rename(payload: RenamePayload, current: &Bound, state: &AppState, sink: &mut Sink) {
    if let Err(err) = state.chunk_store.rename_content(&payload.content_id, payload.file_name.clone()).await {
        tracing::warn!(error = %err, content_id = %payload.content_id, "rename failed");
        let _ = send_json(sink, &storage_error_to_wire(&err)).await;
        return;
    }
    let event = ServerEvent::Renamed(RenamedPayload { content_id: payload.content_id, file_name: payload.file_name });
    state.connections.broadcast(&current.session_id, None, event);
}

/// `clear-all`: authorization reduces to "requester is a member of the
/// session".
async fn handle_clear_all(payload: ClearAllPayload, current: &Bound, state: &AppState, sink: &mut Sink) {
    if payload.session_id != current.session_id {
        let _ = send_json(sink, &WireError::new(WireErrorKind::Unauthorized, "not a member of that session")).await;
        return;
    }
    if let Err(err) = state.chunk_store.clear_session(&current.session_id).await {
        tracing::error!(error = %err, session_id = %current.session_id, "clear-all failed");
        let _ = send_json(sink, &storage_error_to_wire(&err)).await;
        return;
    }
    let event = ServerEvent::ContentCleared(ContentClearedPayload { session_id: current.session_id.clone() });
    state.connections.broadcast(&current.session_id, None, event);
}
