use prost_types::Timestamp;
use proto::chat;

use crate::models::Message;

pub fn to_api_message(message: &Message) -> chat::Message {
    chat::Message {
        number: message.number,
        room_id: message.room_id.clone(),
        user_id: message.user_id.clone(),
        text: message.text.clone(),
        created_at: Some(Timestamp {
            seconds: message.created_at.timestamp(),
            nanos: message.created_at.timestamp_subsec_nanos() as i32,
        }),
    }
}

pub fn to_api_message_list(messages: &[Message]) -> chat::MessageList {
    chat::MessageList {
        messages: messages.iter().map(to_api_message).collect(),
    }
}

/// Stream frame carrying the history snapshot.
pub fn message_list_frame(messages: &[Message]) -> chat::ConnectResponse {
    chat::ConnectResponse {
        payload: Some(chat::connect_response::Payload::MessageList(
            to_api_message_list(messages),
        )),
    }
}

/// Stream frame carrying one broadcast message.
pub fn message_frame(message: &Message) -> chat::ConnectResponse {
    chat::ConnectResponse {
        payload: Some(chat::connect_response::Payload::Message(to_api_message(
            message,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn maps_fields_and_timestamp() {
        let message = Message {
            number: 7,
            room_id: "r".to_string(),
            user_id: "u".to_string(),
            text: "hello".to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 42).unwrap(),
        };

        let api = to_api_message(&message);
        assert_eq!(api.number, 7);
        assert_eq!(api.text, "hello");

        let created_at = api.created_at.unwrap();
        assert_eq!(created_at.seconds, 1_700_000_000);
        assert_eq!(created_at.nanos, 42);
    }
}
