use base64::Engine;
use loqa_conversations::nats::messages::{
    AudioReply, ConversationSummaryMessage, SessionEventMessage, SessionStartRequest,
};
use loqa_conversations::{
    AgentState, ConnectionState, ConversationSummary, DownloadError, MessageRole, RemoteEvent,
};
use std::collections::HashMap;

#[test]
fn test_session_start_serialization() {
    let mut dynamic_variables = HashMap::new();
    dynamic_variables.insert("user_name".to_string(), "Ada".to_string());

    let msg = SessionStartRequest {
        session_id: "session-1".to_string(),
        agent_id: "agent-1".to_string(),
        dynamic_variables,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"agent_id\":\"agent-1\""));
    assert!(json.contains("\"user_name\":\"Ada\""));

    // Variables are optional on the wire
    let minimal: SessionStartRequest =
        serde_json::from_str(r#"{"session_id": "s", "agent_id": "a"}"#).unwrap();
    assert!(minimal.dynamic_variables.is_empty());
}

#[test]
fn test_connection_event_deserialization() {
    let json = r#"{"type": "connection", "state": "connected"}"#;

    let msg: SessionEventMessage = serde_json::from_str(json).unwrap();
    match RemoteEvent::from(msg) {
        RemoteEvent::Connection(state) => assert_eq!(state, ConnectionState::Active),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_unknown_agent_mode_is_tolerated() {
    let json = r#"{"type": "agent", "mode": "daydreaming"}"#;

    let msg: SessionEventMessage = serde_json::from_str(json).unwrap();
    match RemoteEvent::from(msg) {
        RemoteEvent::Agent(mode) => assert_eq!(mode, AgentState::Other),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_message_event_deserialization() {
    let json = r#"{
        "type": "message",
        "role": "agent",
        "text": "How can I help?",
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: SessionEventMessage = serde_json::from_str(json).unwrap();
    let RemoteEvent::Message(message) = RemoteEvent::from(msg) else {
        panic!("expected a message event");
    };
    assert_eq!(message.role, MessageRole::Agent);
    assert_eq!(message.text, "How can I help?");
    assert_eq!(message.timestamp.to_rfc3339(), "2025-10-27T14:30:05+00:00");
}

#[test]
fn test_message_event_without_timestamp() {
    let json = r#"{"type": "message", "role": "user", "text": "hi"}"#;

    let msg: SessionEventMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(RemoteEvent::from(msg), RemoteEvent::Message(_)));
}

#[test]
fn test_conversation_summary_conversion() {
    let json = r#"{
        "conversation_id": "conv-42",
        "agent_id": null,
        "created_at": null,
        "sort_date": "2025-10-27T14:30:00Z"
    }"#;

    let msg: ConversationSummaryMessage = serde_json::from_str(json).unwrap();
    let summary = ConversationSummary::from(msg);
    assert_eq!(summary.id, "conv-42");
    assert!(summary.created_at.is_none());
    assert_eq!(summary.sort_date.to_rfc3339(), "2025-10-27T14:30:00+00:00");
}

#[test]
fn test_audio_reply_decodes_payload() {
    let reply = AudioReply {
        audio: Some(base64::engine::general_purpose::STANDARD.encode(b"RIFF....WAVE")),
        mime_type: Some("audio/wav".to_string()),
        error: None,
    };

    let audio = reply.into_audio("conv-1").unwrap();
    assert_eq!(audio.data, b"RIFF....WAVE");
    assert_eq!(audio.mime_type.as_deref(), Some("audio/wav"));
}

#[test]
fn test_audio_reply_not_found() {
    let json = r#"{"error": {"code": "not_found", "message": "still processing"}}"#;

    let reply: AudioReply = serde_json::from_str(json).unwrap();
    let result = reply.into_audio("conv-1");
    assert!(matches!(result, Err(DownloadError::NotFound(ref id)) if id == "conv-1"));
}

#[test]
fn test_audio_reply_other_errors_are_transport() {
    let json = r#"{"error": {"code": "unauthorized", "message": "bad key"}}"#;
    let reply: AudioReply = serde_json::from_str(json).unwrap();
    assert!(matches!(reply.into_audio("conv-1"), Err(DownloadError::Transport(_))));

    let garbled = AudioReply {
        audio: Some("not base64!".to_string()),
        mime_type: None,
        error: None,
    };
    let result = garbled.into_audio("conv-1");
    assert!(result.is_err());
    assert!(!result.unwrap_err().is_not_found());
}
