//! Cross-instance replication scenarios

use crate::common::Cluster;
use crate::{assert_locked, assert_next_message, assert_unlocked};
use listlock::shared::protocol::ServerMessage;
use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_lock_on_one_instance_is_seen_on_another() {
    let cluster = Cluster::new(2);
    let mut a = cluster.connect(0).await;
    let mut b = cluster.connect(1).await;

    a.request_lock("42", "title", "Buy milk").await;
    assert_next_message!(a, ServerMessage::LockAcquired { .. });
    assert_next_message!(b, ServerMessage::LockGranted { ref item_id, ref field } if item_id == "42" && field == "title");

    // Exclusivity holds across instances
    b.request_lock("42", "title", "").await;
    assert_next_message!(b, ServerMessage::LockDenied { .. });

    a.edit("42", "title", "Buy oat milk").await;
    assert_next_message!(b, ServerMessage::ContentChanged { ref content, .. } if content == "Buy oat milk");
    a.assert_silent().await;
}

#[tokio::test]
async fn test_each_client_sees_an_event_once() {
    let cluster = Cluster::new(3);
    let mut owner = cluster.connect(0).await;
    let mut same_instance = cluster.connect(0).await;
    let mut peers = vec![cluster.connect(1).await, cluster.connect(2).await];

    owner.request_lock("5", "title", "").await;
    assert_next_message!(owner, ServerMessage::LockAcquired { .. });

    assert_next_message!(same_instance, ServerMessage::LockGranted { .. });
    same_instance.assert_silent().await;
    for peer in peers.iter_mut() {
        assert_next_message!(peer, ServerMessage::LockGranted { .. });
        peer.assert_silent().await;
    }
    owner.assert_silent().await;
}

#[tokio::test]
async fn test_disconnect_on_one_instance_frees_lock_everywhere() {
    let cluster = Cluster::new(2);
    let mut a = cluster.connect(0).await;
    let mut b = cluster.connect(1).await;

    a.request_lock("42", "title", "").await;
    assert_next_message!(a, ServerMessage::LockAcquired { .. });
    assert_next_message!(b, ServerMessage::LockGranted { .. });

    a.disconnect().await;
    assert_next_message!(b, ServerMessage::LockReleased { ref item_id } if item_id == "42");
    assert_unlocked!(cluster.store, "42");

    b.request_lock("42", "title", "").await;
    assert_next_message!(b, ServerMessage::LockAcquired { .. });
    assert_locked!(cluster.store, "42", owner = b.id);
}

#[tokio::test]
async fn test_refresh_reaches_every_client() {
    let cluster = Cluster::new(2);
    let mut a = cluster.connect(0).await;
    let mut b = cluster.connect(1).await;

    tokio_test::assert_ok!(cluster.instance(1).notify_refresh().await);

    assert_eq!(a.next().await, ServerMessage::RefreshTableData);
    assert_eq!(b.next().await, ServerMessage::RefreshTableData);
}

#[tokio::test]
async fn test_snapshot_is_shared_across_instances() {
    let cluster = Cluster::new(2);
    let mut a = cluster.connect(0).await;

    a.request_lock("x", "title", "").await;
    assert_next_message!(a, ServerMessage::LockAcquired { .. });

    let late = cluster.connect(1).await;
    assert_eq!(late.initial_locks, vec!["x".to_string()]);
}

#[tokio::test]
async fn test_reacquire_after_remote_expiry_is_announced() {
    let cluster = Cluster::new(2);
    let mut a = cluster.connect(0).await;
    let mut b = cluster.connect(1).await;

    a.request_lock("42", "title", "").await;
    assert_next_message!(a, ServerMessage::LockAcquired { .. });
    assert_next_message!(b, ServerMessage::LockGranted { .. });

    // Instance 1 sweeps the lock while instance 0 still lists it locally
    let expired = cluster
        .instance(1)
        .expire_stale(Utc::now() + ChronoDuration::seconds(31))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_next_message!(a, ServerMessage::LockReleased { ref item_id } if item_id == "42");
    assert_next_message!(b, ServerMessage::LockReleased { ref item_id } if item_id == "42");
    assert_unlocked!(cluster.store, "42");

    a.request_lock("42", "title", "").await;
    assert_next_message!(a, ServerMessage::LockAcquired { .. });
    assert_next_message!(b, ServerMessage::LockGranted { ref item_id, .. } if item_id == "42");
    assert_locked!(cluster.store, "42", owner = a.id);
}
