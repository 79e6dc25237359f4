//! Transient per-connection fan-out registry. Deliberately separate from
//! `SessionRegistry`, which owns membership durably; this map only tracks
//! which live sockets are currently bound to a session so fan-out can
//! reach them, and is rebuilt from nothing on every process restart.

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use veilshare_protocol::ClientId;
use veilshare_protocol::ServerEvent;
use veilshare_protocol::SessionId;

type Outbox = UnboundedSender<ServerEvent>;

#[derive(Default)]
pub struct Connections {
    by_session: DashMap<SessionId, DashMap<ClientId, Outbox>>,
}

impl Connections {
    pub fn register(&self, session_id: SessionId, client_id: ClientId, outbox: Outbox) {
        self.by_session.entry(session_id).or_default().insert(client_id, outbox);
    }

    pub fn unregister(&self, session_id: &SessionId, client_id: &ClientId) {
        if let Some(peers) = self.by_session.get(session_id) {
            peers.remove(client_id);
        }
    }

    /// Fans `event` out to every member of `session_id` except
    /// `exclude` — the originating client never receives its own echo.
    /// Best-effort: a full/closed channel is dropped silently.
    pub fn broadcast(&self, session_id: &SessionId, exclude: Option<ClientId>, event: ServerEvent) {
        let Some(peers) = self.by_session.get(session_id) else { return };
        for entry in peers.iter() {
            if Some(*entry.key()) == exclude {
                continue;
            }
            let _ = entry.value().send(event.clone());
        }
    }

    /// Send to a single connection, e.g. a reply frame.
    pub fn send_to(&self, session_id: &SessionId, client_id: &ClientId, event: ServerEvent) {
        if let Some(peers) = self.by_session.get(session_id) {
            if let Some(outbox) = peers.get(client_id) {
                let _ = outbox.send(event);
            }
        }
    }
}
