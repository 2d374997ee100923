//! Property-based tests for lock exclusivity
//!
//! Random schedules of requests from several clients, spread over several
//! instances sharing one store, checked against a plain map of owners.

use listlock::backend::backplane::MemoryBackplane;
use listlock::backend::coordinator::{AcquireOutcome, CoordinatorConfig, LockCoordinator};
use listlock::backend::connection::ConnectionRegistry;
use listlock::backend::store::{LockStore, MemoryLockStore};
use listlock::shared::lock::ConnectionId;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

const ITEMS: [&str; 3] = ["1", "2", "3"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn instances(store: &MemoryLockStore, backplane: &MemoryBackplane, n: usize) -> Vec<LockCoordinator> {
    (0..n)
        .map(|_| {
            LockCoordinator::new(
                Arc::new(store.clone()),
                Arc::new(backplane.clone()),
                ConnectionRegistry::new(),
                CoordinatorConfig::default(),
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
enum Op {
    Acquire { client: usize, item: usize },
    Release { client: usize, item: usize },
    Edit { client: usize, item: usize, content: String },
    Disconnect { client: usize },
}

fn op_strategy(clients: usize) -> impl Strategy<Value = Op> {
    let item = 0..ITEMS.len();
    prop_oneof![
        (0..clients, item.clone()).prop_map(|(client, item)| Op::Acquire { client, item }),
        (0..clients, item.clone()).prop_map(|(client, item)| Op::Release { client, item }),
        (0..clients, item, "[a-z]{0,8}")
            .prop_map(|(client, item, content)| Op::Edit { client, item, content }),
        (0..clients).prop_map(|client| Op::Disconnect { client }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_exactly_one_concurrent_acquire_wins(clients in 2usize..12, instance_count in 1usize..4) {
        let (winners, owner) = runtime().block_on(async move {
            let store = MemoryLockStore::new();
            let backplane = MemoryBackplane::new(256);
            let coordinators = instances(&store, &backplane, instance_count);

            let mut tasks = Vec::new();
            for i in 0..clients {
                let coordinator = coordinators[i % instance_count].clone();
                tasks.push(tokio::spawn(async move {
                    let (conn, _rx) = coordinator.connect().await;
                    let outcome = coordinator.acquire(conn, "42", "title", "").await.unwrap();
                    (conn, outcome)
                }));
            }

            let mut winners = Vec::new();
            for task in tasks {
                let (conn, outcome) = task.await.unwrap();
                if outcome == AcquireOutcome::Granted {
                    winners.push(conn);
                }
            }
            let owner = store.record("42").await.unwrap().map(|r| r.owner);
            (winners, owner)
        });

        prop_assert_eq!(winners.len(), 1);
        prop_assert_eq!(owner, Some(winners[0]));
    }

    #[test]
    fn test_random_schedules_match_owner_model(
        ops in prop::collection::vec(op_strategy(4), 1..40),
        instance_count in 1usize..3,
    ) {
        runtime().block_on(async move {
            let store = MemoryLockStore::new();
            let backplane = MemoryBackplane::new(1024);
            let coordinators = instances(&store, &backplane, instance_count);

            // One live connection per client slot; reconnects replace it
            let mut clients = Vec::new();
            for slot in 0..4 {
                let coordinator = coordinators[slot % instance_count].clone();
                let (conn, rx) = coordinator.connect().await;
                clients.push((coordinator, conn, rx));
            }
            let mut owners: HashMap<&str, ConnectionId> = HashMap::new();
            let mut contents: HashMap<&str, String> = HashMap::new();

            for op in ops {
                match op {
                    Op::Acquire { client, item } => {
                        let (coordinator, conn, _) = &clients[client];
                        let outcome = coordinator.acquire(*conn, ITEMS[item], "title", "").await.unwrap();
                        match owners.get(ITEMS[item]) {
                            None => {
                                assert_eq!(outcome, AcquireOutcome::Granted);
                                owners.insert(ITEMS[item], *conn);
                                contents.insert(ITEMS[item], String::new());
                            }
                            Some(owner) if owner == conn => {
                                assert_eq!(outcome, AcquireOutcome::AlreadyOwned);
                                contents.insert(ITEMS[item], String::new());
                            }
                            Some(_) => assert_eq!(outcome, AcquireOutcome::Denied),
                        }
                    }
                    Op::Release { client, item } => {
                        let (coordinator, conn, _) = &clients[client];
                        let released = coordinator.release(*conn, ITEMS[item]).await.unwrap();
                        let is_owner = owners.get(ITEMS[item]) == Some(conn);
                        assert_eq!(released, is_owner);
                        if is_owner {
                            owners.remove(ITEMS[item]);
                            contents.remove(ITEMS[item]);
                        }
                    }
                    Op::Edit { client, item, content } => {
                        let (coordinator, conn, _) = &clients[client];
                        let updated = coordinator
                            .update_content(*conn, ITEMS[item], "title", &content)
                            .await
                            .unwrap();
                        let is_owner = owners.get(ITEMS[item]) == Some(conn);
                        assert_eq!(updated, is_owner);
                        if is_owner {
                            contents.insert(ITEMS[item], content);
                        }
                    }
                    Op::Disconnect { client } => {
                        let (coordinator, conn, _) = &clients[client];
                        let report = coordinator.disconnect(*conn).await;
                        assert!(report.is_clean());

                        let conn = *conn;
                        let mut expected: Vec<String> = owners
                            .iter()
                            .filter(|(_, owner)| **owner == conn)
                            .map(|(item, _)| item.to_string())
                            .collect();
                        expected.sort();
                        assert_eq!(report.released, expected);
                        owners.retain(|_, owner| *owner != conn);
                        contents.retain(|item, _| owners.contains_key(item));

                        let coordinator = coordinator.clone();
                        let (conn, rx) = coordinator.connect().await;
                        clients[client] = (coordinator, conn, rx);
                    }
                }

                let locked: BTreeSet<String> = owners.keys().map(|item| item.to_string()).collect();
                assert_eq!(store.snapshot().await.unwrap(), locked);
                for (item, owner) in &owners {
                    let record = store.record(item).await.unwrap().unwrap();
                    assert_eq!(record.owner, *owner);
                    assert_eq!(&record.pending_content, &contents[item]);
                }
            }
        });
    }
}
