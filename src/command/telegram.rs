//! Telegram `getUpdates` polling channel.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::{CommandChannel, RemoteCommand};
use crate::config::TelegramSettings;

pub struct TelegramCommandChannel {
    settings: TelegramSettings,
}

impl TelegramCommandChannel {
    pub fn new(settings: TelegramSettings) -> Self {
        Self { settings }
    }

    fn updates_url(&self) -> String {
        format!(
            "{}/bot{}/getUpdates",
            self.settings.api_base, self.settings.bot_token
        )
    }
}

impl CommandChannel for TelegramCommandChannel {
    fn poll_new(&mut self, since: Option<i64>) -> Result<Vec<RemoteCommand>> {
        let mut request = ureq::get(&self.updates_url());
        if let Some(last_id) = since {
            request = request.query("offset", &(last_id + 1).to_string());
        }
        let raw = request
            .call()
            .context("telegram getUpdates")?
            .into_string()
            .context("read getUpdates body")?;
        parse_updates(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    text: Option<String>,
}

/// Every update advances the checkpoint, but only text messages become
/// commands; other update kinds (edits, media, joins) are skipped.
fn parse_updates(raw: &str) -> Result<Vec<RemoteCommand>> {
    let response: UpdatesResponse =
        serde_json::from_str(raw).context("parse getUpdates response")?;
    if !response.ok {
        return Err(anyhow!("telegram getUpdates returned ok=false"));
    }
    Ok(response
        .result
        .into_iter()
        .map(|update| {
            let text = update
                .message
                .and_then(|message| message.text)
                .unwrap_or_default();
            RemoteCommand {
                id: update.update_id,
                text,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_commands_with_ids() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 100, "message": {"text": "/status"}},
                {"update_id": 101, "message": {"text": "/clip"}}
            ]
        }"#;
        let commands = parse_updates(raw).unwrap();
        assert_eq!(
            commands,
            vec![
                RemoteCommand {
                    id: 100,
                    text: "/status".to_string()
                },
                RemoteCommand {
                    id: 101,
                    text: "/clip".to_string()
                },
            ]
        );
    }

    #[test]
    fn non_text_updates_still_carry_their_id() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 7},
                {"update_id": 8, "message": {}}
            ]
        }"#;
        let commands = parse_updates(raw).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].id, 7);
        assert!(commands[0].text.is_empty());
    }

    #[test]
    fn rejects_not_ok_responses() {
        assert!(parse_updates(r#"{"ok": false, "result": []}"#).is_err());
    }
}
