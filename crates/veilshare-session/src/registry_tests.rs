use chrono::Duration;
use veilshare_protocol::ClientId;
use veilshare_protocol::Fingerprint;
use veilshare_protocol::SessionId;

use crate::error::SessionError;
use crate::registry::SessionRegistry;

fn fingerprint(byte: u8) -> Fingerprint {
    Fingerprint { iv: vec![byte; 12], data: vec![byte; 16] }
}

#[tokio::test]
async fn second_client_with_same_fingerprint_joins_and_sees_first_member() {
    let registry = SessionRegistry::new(Duration::hours(1));
    let session = SessionId("s1".to_string());
    let a = ClientId::new();
    let outcome_a = registry.join_or_create(session.clone(), a, "A".to_string(), fingerprint(1)).await.unwrap();
    assert!(outcome_a.members.is_empty());

    let b = ClientId::new();
    let outcome_b = registry.join_or_create(session.clone(), b, "B".to_string(), fingerprint(1)).await.unwrap();
    assert_eq!(outcome_b.members.len(), 1);
    assert_eq!(outcome_b.members[0].name, "A");
}

#[tokio::test]
async fn join_rejected_on_fingerprint_mismatch_and_membership_unchanged() {
    let registry = SessionRegistry::new(Duration::hours(1));
    let session = SessionId("s1".to_string());
    registry.join_or_create(session.clone(), ClientId::new(), "A".to_string(), fingerprint(1)).await.unwrap();

    let result = registry.join_or_create(session.clone(), ClientId::new(), "C".to_string(), fingerprint(2)).await;
    assert_eq!(result.unwrap_err(), SessionError::PassphraseMismatch);

    let members = registry.snapshot_members(&session).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn expired_session_rejects_join_but_accepts_matching_rejoin() {
    let registry = SessionRegistry::new(Duration::milliseconds(0));
    let session = SessionId("s1".to_string());
    let a = ClientId::new();
    registry.join_or_create(session.clone(), a, "A".to_string(), fingerprint(1)).await.unwrap();

    let expired_members = registry.expire(&session).await;
    assert_eq!(expired_members, vec![a]);

    let rejected = registry.join_or_create(session.clone(), ClientId::new(), "B".to_string(), fingerprint(1)).await;
    assert_eq!(rejected.unwrap_err(), SessionError::SessionExpired(session.clone()));

    let revived = registry.rejoin(session.clone(), ClientId::new(), "A".to_string(), fingerprint(1)).await.unwrap();
    assert!(revived.is_new_session);
    assert!(revived.members.is_empty());
}

#[tokio::test]
async fn leave_revokes_token_for_that_member_only() {
    let registry = SessionRegistry::new(Duration::hours(1));
    let session = SessionId("s1".to_string());
    let a = ClientId::new();
    let b = ClientId::new();
    let outcome_a = registry.join_or_create(session.clone(), a, "A".to_string(), fingerprint(1)).await.unwrap();
    let outcome_b = registry.join_or_create(session.clone(), b, "B".to_string(), fingerprint(1)).await.unwrap();

    registry.leave(&session, a).await.unwrap();

    assert!(registry.validate_token(&outcome_a.token).is_none());
    assert_eq!(registry.validate_token(&outcome_b.token), Some((session.clone(), b)));
}
