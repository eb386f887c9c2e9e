use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::EventView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub tick: i64,
    pub mode: String,
    pub sender: String,
    pub text: String,
}

impl ChatMessage {
    pub fn is_team(&self) -> bool {
        self.mode.eq_ignore_ascii_case("TEAM")
    }

    pub fn is_server(&self) -> bool {
        self.sender.eq_ignore_ascii_case("SERVER")
    }

    pub fn line(&self) -> String {
        format!("[{}] ({}) {}: {}", self.tick, self.mode, self.sender, self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTranscript {
    pub messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn all_lines(&self) -> Vec<String> {
        self.messages.iter().map(ChatMessage::line).collect()
    }

    pub fn team_lines(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.is_team())
            .map(ChatMessage::line)
            .collect()
    }

    /// Server-sent messages grouped by chat mode, as `(tick, text)`.
    pub fn server_messages(&self) -> BTreeMap<String, Vec<(i64, String)>> {
        let mut out: BTreeMap<String, Vec<(i64, String)>> = BTreeMap::new();
        for msg in self.messages.iter().filter(|m| m.is_server()) {
            let category = if msg.mode.is_empty() {
                "SERVER".to_string()
            } else {
                msg.mode.clone()
            };
            out.entry(category)
                .or_default()
                .push((msg.tick, msg.text.clone()));
        }
        out
    }
}

fn is_chat_type(etype: &str) -> bool {
    etype == "chat_message" || etype.contains("chat") || etype.contains("say")
}

pub fn extract_chat(events: &[Value]) -> ChatTranscript {
    let messages = events
        .iter()
        .filter_map(EventView::new)
        .filter(|ev| is_chat_type(&ev.etype()))
        .map(|ev| {
            let text = ev
                .detail_str("msg")
                .or_else(|| ev.detail_str("message"))
                .unwrap_or_default();
            let mode = ev
                .detail_str("mode")
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "ALL".to_string());
            let sender = ev
                .detail_str("from")
                .or_else(|| ev.detail_str("player_name"))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "UNKNOWN".to_string());
            ChatMessage {
                tick: ev.tick(),
                mode,
                sender,
                text,
            }
        })
        .collect();
    ChatTranscript { messages }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::extract_chat;

    #[test]
    fn splits_team_and_server_messages() {
        let events = vec![
            json!({"type": "chat_message", "tick": 5, "details": {"msg": "gl hf", "from": "alice"}}),
            json!({"type": "chat_message", "tick": 9, "details": {"msg": "rush b", "mode": "TEAM", "from": "bob"}}),
            json!({"type": "chat_message", "tick": 11, "details": {"msg": "Match paused", "mode": "ALL", "from": "Server"}}),
            json!({"type": "player_hurt", "tick": 12}),
        ];
        let chat = extract_chat(&events);
        assert_eq!(chat.messages.len(), 3);
        assert_eq!(chat.all_lines()[0], "[5] (ALL) alice: gl hf");
        assert_eq!(chat.team_lines(), vec!["[9] (TEAM) bob: rush b".to_string()]);
        let server = chat.server_messages();
        assert_eq!(server["ALL"], vec![(11, "Match paused".to_string())]);
    }

    #[test]
    fn missing_sender_is_unknown() {
        let events = vec![json!({"type": "player_say", "data": {"message": "hi"}})];
        let chat = extract_chat(&events);
        assert_eq!(chat.messages[0].sender, "UNKNOWN");
        assert_eq!(chat.messages[0].text, "hi");
        assert_eq!(chat.messages[0].tick, 0);
    }
}
