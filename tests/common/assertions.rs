//! Custom assertion macros and utilities
//!
//! Provides assertion macros for the messages a test client receives.

/// Assert that the next message of a client matches a pattern
///
/// Waits for the message, panicking with the actual message when it does
/// not match.
#[macro_export]
macro_rules! assert_next_message {
    ($client:expr, $pattern:pat) => {
        let message = $client.next().await;
        assert!(
            matches!(message, $pattern),
            "Unexpected message for {}: {:?}",
            $client.id,
            message
        );
    };
    ($client:expr, $pattern:pat if $guard:expr) => {
        let message = $client.next().await;
        assert!(
            matches!(message, $pattern if $guard),
            "Unexpected message for {}: {:?}",
            $client.id,
            message
        );
    };
}

/// Assert that an item is locked (or not) in a store
#[macro_export]
macro_rules! assert_locked {
    ($store:expr, $item_id:expr) => {
        assert!(
            $store.record($item_id).await.expect("store reachable").is_some(),
            "Expected {} to be locked",
            $item_id
        );
    };
    ($store:expr, $item_id:expr, owner = $owner:expr) => {
        let record = $store.record($item_id).await.expect("store reachable");
        assert_eq!(
            record.map(|r| r.owner),
            Some($owner),
            "Expected {} to be locked by {}",
            $item_id,
            $owner
        );
    };
}

/// Assert that an item is unlocked in a store
#[macro_export]
macro_rules! assert_unlocked {
    ($store:expr, $item_id:expr) => {
        assert!(
            $store.record($item_id).await.expect("store reachable").is_none(),
            "Expected {} to be unlocked",
            $item_id
        );
    };
}
