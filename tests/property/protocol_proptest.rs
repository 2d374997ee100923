//! Property-based tests for the client wire protocol

use listlock::shared::protocol::{ClientMessage, ServerMessage};
use listlock::shared::SharedError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_parse_never_panics(text in ".*") {
        let _ = ClientMessage::parse(&text);
    }

    #[test]
    fn test_request_lock_keeps_item_and_content(
        item_id in "[A-Za-z0-9_-]{1,24}",
        field in "[a-z]{0,12}",
        content in ".{0,64}",
    ) {
        let frame = serde_json::json!({
            "type": "request-lock",
            "item_id": item_id,
            "field": field,
            "content": content,
        })
        .to_string();

        let message = ClientMessage::parse(&frame).unwrap();
        prop_assert_eq!(
            message,
            ClientMessage::RequestLock { item_id, field, content }
        );
    }

    #[test]
    fn test_blank_item_id_is_rejected(item_id in "[ \t]{0,8}") {
        let frame = serde_json::json!({ "type": "request-unlock", "item_id": item_id }).to_string();
        let is_validation_error = matches!(
            ClientMessage::parse(&frame),
            Err(SharedError::ValidationError { .. })
        );
        prop_assert!(is_validation_error);
    }

    #[test]
    fn test_server_messages_are_tagged(item_ids in prop::collection::vec("[0-9]{1,6}", 0..8)) {
        let json = ServerMessage::InitializeLocks { item_ids: item_ids.clone() }.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(value["type"].as_str(), Some("initialize-locks"));
        prop_assert_eq!(value["item_ids"].as_array().map(|a| a.len()), Some(item_ids.len()));
    }
}
