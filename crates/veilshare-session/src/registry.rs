//! `SessionRegistry`: membership state guarded by per-session mutual
//! exclusion. Grounded on the per-session-lock shape of
//! `agcodex-persistence::session_manager`, adapted from session
//! checkpoints to socket membership.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use veilshare_protocol::ClientId;
use veilshare_protocol::Fingerprint;
use veilshare_protocol::MemberView;
use veilshare_protocol::SessionId;
use veilshare_protocol::SessionToken;

use crate::error::SessionError;
use crate::verifier::fingerprints_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Idle,
    Expired,
}

#[derive(Debug, Clone)]
struct Member {
    name: String,
    #[allow(dead_code)]
    joined_at: DateTime<Utc>,
    token: SessionToken,
}

#[derive(Debug)]
struct SessionRecord {
    session_id: SessionId,
    fingerprint: Fingerprint,
    members: HashMap<ClientId, Member>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    expired: bool,
}

impl SessionRecord {
    fn fresh(session_id: SessionId, fingerprint: Fingerprint, now: DateTime<Utc>) -> Self {
        Self { session_id, fingerprint, members: HashMap::new(), created_at: now, last_activity_at: now, expired: false }
    }

    fn revive(&mut self, now: DateTime<Utc>) {
        self.members.clear();
        self.created_at = now;
        self.last_activity_at = now;
        self.expired = false;
    }

    fn phase(&self, idle_threshold: Duration, now: DateTime<Utc>) -> SessionPhase {
        if self.expired {
            SessionPhase::Expired
        } else if now - self.last_activity_at > idle_threshold {
            SessionPhase::Idle
        } else {
            SessionPhase::Active
        }
    }

    fn snapshot_members(&self) -> Vec<MemberView> {
        self.members.iter().map(|(id, m)| MemberView { id: *id, name: m.name.clone() }).collect()
    }

    /// Members other than `exclude` — the joining/rejoining client never
    /// sees itself in its own reply's member list.
    fn snapshot_members_excluding(&self, exclude: ClientId) -> Vec<MemberView> {
        self.members
            .iter()
            .filter(|(id, _)| **id != exclude)
            .map(|(id, m)| MemberView { id: *id, name: m.name.clone() })
            .collect()
    }
}

pub struct JoinOutcome {
    pub token: SessionToken,
    pub members: Vec<MemberView>,
    /// `true` when this call created a brand-new session record, or
    /// revived an expired one into a fresh Active session with the same
    /// `sessionId`.
    pub is_new_session: bool,
}

type SharedRecord = Arc<Mutex<SessionRecord>>;

/// Owns membership state exclusively; storage lives in
/// `veilshare-chunkstore`.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SharedRecord>,
    tokens: DashMap<SessionToken, (SessionId, ClientId)>,
    idle_threshold: Duration,
}

impl SessionRegistry {
    pub fn new(idle_threshold: Duration) -> Self {
        Self { sessions: DashMap::new(), tokens: DashMap::new(), idle_threshold }
    }

    fn record_for(&self, session_id: &SessionId) -> Option<SharedRecord> {
        self.sessions.get(session_id).map(|r| r.clone())
    }

    /// `joinOrCreate`. Rejects an expired session outright; a client must
    /// use [`Self::rejoin`] to revive one.
    pub async fn join_or_create(
        &self,
        session_id: SessionId,
        client_id: ClientId,
        client_name: String,
        fingerprint: Fingerprint,
    ) -> Result<JoinOutcome, SessionError> {
        self.admit(session_id, client_id, client_name, fingerprint, false).await
    }

    /// `rejoin`: identical to [`Self::join_or_create`], except an expired
    /// session may be revived if the presented fingerprint matches the
    /// one it was created with.
    pub async fn rejoin(
        &self,
        session_id: SessionId,
        client_id: ClientId,
        client_name: String,
        fingerprint: Fingerprint,
    ) -> Result<JoinOutcome, SessionError> {
        self.admit(session_id, client_id, client_name, fingerprint, true).await
    }

    async fn admit(
        &self,
        session_id: SessionId,
        client_id: ClientId,
        client_name: String,
        fingerprint: Fingerprint,
        allow_revival: bool,
    ) -> Result<JoinOutcome, SessionError> {
        let now = Utc::now();
        let (record_handle, mut is_new_session) = match self.sessions.entry(session_id.clone()) {
            Entry::Vacant(e) => {
                let handle = Arc::new(Mutex::new(SessionRecord::fresh(session_id.clone(), fingerprint.clone(), now)));
                e.insert(handle.clone());
                (handle, true)
            }
            Entry::Occupied(e) => (e.get().clone(), false),
        };

        let mut record = record_handle.lock().await;
        if record.expired {
            if !allow_revival {
                return Err(SessionError::SessionExpired(session_id));
            }
            if !fingerprints_match(&fingerprint, &record.fingerprint) {
                return Err(SessionError::PassphraseMismatch);
            }
            record.revive(now);
            is_new_session = true;
        } else if !is_new_session && !fingerprints_match(&fingerprint, &record.fingerprint) {
            return Err(SessionError::PassphraseMismatch);
        }

        let token = crate::token::issue();
        record.members.insert(client_id, Member { name: client_name, joined_at: now, token: token.clone() });
        record.last_activity_at = now;
        let members = record.snapshot_members_excluding(client_id);
        drop(record);

        self.tokens.insert(token.clone(), (session_id, client_id));
        Ok(JoinOutcome { token, members, is_new_session })
    }

    /// `leave`: removes the member and revokes its token.
    pub async fn leave(&self, session_id: &SessionId, client_id: ClientId) -> Result<(), SessionError> {
        let record_handle = self.record_for(session_id).ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        let mut record = record_handle.lock().await;
        if let Some(member) = record.members.remove(&client_id) {
            self.tokens.remove(&member.token);
        }
        Ok(())
    }

    /// `touch`: called on every ingress event.
    pub async fn touch(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let record_handle = self.record_for(session_id).ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        record_handle.lock().await.last_activity_at = Utc::now();
        Ok(())
    }

    /// `validateToken`.
    pub fn validate_token(&self, token: &SessionToken) -> Option<(SessionId, ClientId)> {
        self.tokens.get(token).map(|entry| *entry)
    }

    /// `snapshotMembers`.
    pub async fn snapshot_members(&self, session_id: &SessionId) -> Option<Vec<MemberView>> {
        let record_handle = self.record_for(session_id)?;
        Some(record_handle.lock().await.snapshot_members())
    }

    pub async fn phase(&self, session_id: &SessionId) -> Option<SessionPhase> {
        let record_handle = self.record_for(session_id)?;
        let record = record_handle.lock().await;
        Some(record.phase(self.idle_threshold, Utc::now()))
    }

    /// Snapshot of sessions whose `lastActivityAt` predates `idleThreshold`
    /// and are not already expired — used by [`crate::sweeper`]. A short
    /// read-side pass, falling back to per-session locks only in
    /// [`Self::expire`].
    pub fn candidates_for_expiration(&self) -> Vec<SessionId> {
        let now = Utc::now();
        let mut out = Vec::new();
        for entry in self.sessions.iter() {
            let Ok(record) = entry.value().try_lock() else { continue };
            if !record.expired && now - record.last_activity_at > self.idle_threshold {
                out.push(record.session_id.clone());
            }
        }
        out
    }

    /// Transitions a session to Expired and revokes its members' tokens,
    /// returning the members who were notified.
    pub async fn expire(&self, session_id: &SessionId) -> Vec<ClientId> {
        let Some(record_handle) = self.record_for(session_id) else { return Vec::new() };
        let mut record = record_handle.lock().await;
        if record.expired {
            return Vec::new();
        }
        record.expired = true;
        let client_ids: Vec<ClientId> = record.members.keys().copied().collect();
        for member in record.members.values() {
            self.tokens.remove(&member.token);
        }
        record.members.clear();
        client_ids
    }
}
