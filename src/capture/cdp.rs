//! Minimal Chrome DevTools protocol client.
//!
//! Commands are issued one at a time over a single browser-level socket;
//! events that arrive while waiting for a command reply are buffered so a
//! later `wait_for_event` can still see them.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const MAX_BUFFERED_EVENTS: usize = 512;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub session_id: Option<String>,
    pub params: Value,
}

impl CdpEvent {
    fn from_frame(mut frame: Value) -> Option<Self> {
        let method = frame.get("method")?.as_str()?.to_string();
        let session_id = frame
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let params = frame.get_mut("params").map(Value::take).unwrap_or(Value::Null);
        Some(Self {
            method,
            session_id,
            params,
        })
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

pub struct CdpConnection {
    socket: Socket,
    next_id: u64,
    events: VecDeque<CdpEvent>,
}

impl CdpConnection {
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .with_context(|| format!("failed to connect to DevTools at {ws_url}"))?;
        Ok(Self {
            socket,
            next_id: 0,
            events: VecDeque::new(),
        })
    }

    /// Send one command and wait for its reply. A protocol-level error reply
    /// becomes an `Err` carrying the method name and the browser's message.
    pub async fn call(
        &mut self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut payload = json!({ "id": id, "method": method, "params": params });
        if let Some(session) = session_id {
            payload["sessionId"] = Value::String(session.to_string());
        }

        self.socket
            .send(Message::Text(payload.to_string().into()))
            .await
            .with_context(|| format!("failed to send {method}"))?;

        loop {
            let mut frame = self.next_frame().await?;
            if frame.get("id").and_then(Value::as_u64) == Some(id) {
                if let Some(err) = frame.get("error") {
                    let message = err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown protocol error");
                    anyhow::bail!("{method} failed: {message}");
                }
                return Ok(frame.get_mut("result").map(Value::take).unwrap_or(Value::Null));
            }
            if let Some(event) = CdpEvent::from_frame(frame) {
                self.buffer(event);
            }
        }
    }

    /// Return the first buffered or incoming event accepted by `matches`.
    /// Non-matching events stay buffered. Not bounded; wrap in a timeout.
    pub async fn wait_for_event<F>(&mut self, mut matches: F) -> Result<CdpEvent>
    where
        F: FnMut(&CdpEvent) -> bool,
    {
        if let Some(pos) = self.events.iter().position(&mut matches)
            && let Some(event) = self.events.remove(pos)
        {
            return Ok(event);
        }

        loop {
            let frame = self.next_frame().await?;
            let Some(event) = CdpEvent::from_frame(frame) else {
                continue;
            };
            if matches(&event) {
                return Ok(event);
            }
            self.buffer(event);
        }
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            tracing::debug!("DevTools socket close failed: {e}");
        }
    }

    fn buffer(&mut self, event: CdpEvent) {
        if self.events.len() >= MAX_BUFFERED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    async fn next_frame(&mut self) -> Result<Value> {
        loop {
            let Some(message) = self.socket.next().await else {
                anyhow::bail!("DevTools connection closed");
            };
            match message.context("DevTools socket error")? {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str())
                        .context("invalid DevTools message");
                }
                Message::Binary(bytes) => {
                    return serde_json::from_slice(&bytes).context("invalid DevTools message");
                }
                Message::Close(_) => anyhow::bail!("DevTools connection closed"),
                _ => {}
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::spawn_fake_devtools;
    use super::*;

    #[tokio::test]
    async fn call_returns_matching_result_and_buffers_events() {
        let url = spawn_fake_devtools(|cmd| {
            let id = cmd["id"].clone();
            vec![
                json!({ "method": "Page.lifecycleEvent", "sessionId": "S1", "params": { "name": "init" } }),
                json!({ "id": id, "result": { "frameId": "F1" } }),
            ]
        })
        .await;

        let mut cdp = CdpConnection::connect(&url).await.unwrap();
        let result = cdp
            .call("Page.navigate", json!({ "url": "https://example.com" }), Some("S1"))
            .await
            .unwrap();
        assert_eq!(result["frameId"], "F1");

        let event = cdp
            .wait_for_event(|e| e.method == "Page.lifecycleEvent")
            .await
            .unwrap();
        assert_eq!(event.param_str("name"), Some("init"));
        assert_eq!(event.session_id.as_deref(), Some("S1"));
    }

    #[tokio::test]
    async fn protocol_error_becomes_err() {
        let url = spawn_fake_devtools(|cmd| {
            vec![json!({ "id": cmd["id"], "error": { "code": -32000, "message": "No target with given id" } })]
        })
        .await;

        let mut cdp = CdpConnection::connect(&url).await.unwrap();
        let err = cdp
            .call("Target.attachToTarget", json!({ "targetId": "nope" }), None)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Target.attachToTarget"));
        assert!(msg.contains("No target with given id"));
    }

    #[tokio::test]
    async fn command_ids_increase() {
        let url = spawn_fake_devtools(|cmd| {
            vec![json!({ "id": cmd["id"], "result": { "echo": cmd["id"] } })]
        })
        .await;

        let mut cdp = CdpConnection::connect(&url).await.unwrap();
        let first = cdp.call("A.a", json!({}), None).await.unwrap();
        let second = cdp.call("B.b", json!({}), None).await.unwrap();
        assert_eq!(first["echo"], 1);
        assert_eq!(second["echo"], 2);
    }
}
