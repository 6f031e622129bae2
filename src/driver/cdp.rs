//! Chrome DevTools Protocol driver over raw WebSocket.
//!
//! Attaches to an already-running Chrome with remote debugging enabled and
//! exposes just the page capabilities the recorder and replayer consume.

use crate::driver::PageDriver;
use crate::error::{RehearseError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// CDP client bound to a single page target.
pub struct CdpDriver {
    ws_tx: Arc<Mutex<WsSink>>,
    responses: Arc<Mutex<HashMap<u32, tokio::sync::oneshot::Sender<serde_json::Value>>>>,
    msg_id: Arc<Mutex<u32>>,
}

impl CdpDriver {
    /// Attach to the first page target of a debugging endpoint
    /// (`http://{host}:{port}`).
    pub async fn attach(host: &str, port: u16) -> Result<Self> {
        let list_url = format!("http://{}:{}/json/list", host, port);
        let targets: serde_json::Value = reqwest::get(&list_url)
            .await
            .map_err(|e| RehearseError::Driver(format!("CDP discovery failed: {}", e)))?
            .json()
            .await
            .map_err(|e| RehearseError::Driver(format!("CDP discovery parse failed: {}", e)))?;

        let ws_url = targets
            .as_array()
            .and_then(|arr| {
                arr.iter()
                    .find(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
            })
            .and_then(|t| t.get("webSocketDebuggerUrl"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| RehearseError::Driver("no page target found".to_string()))?
            .to_string();

        tracing::info!("Connecting to page target WebSocket: {}", ws_url);

        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .map_err(|e| RehearseError::Driver(format!("WebSocket connect failed: {}", e)))?;
        let (tx, mut rx) = StreamExt::split(ws_stream);

        let responses: Arc<Mutex<HashMap<u32, tokio::sync::oneshot::Sender<serde_json::Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        // Route command responses to their waiting callers by message id.
        let responses_reader = responses.clone();
        tokio::spawn(async move {
            while let Some(msg) = StreamExt::next(&mut rx).await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                            if let Some(id) = value.get("id").and_then(|i| i.as_u64()) {
                                if let Some(sender) =
                                    responses_reader.lock().await.remove(&(id as u32))
                                {
                                    let _ = sender.send(value);
                                }
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("CDP WebSocket closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("CDP WebSocket error: {:?}", e);
                    }
                    _ => {}
                }
            }
        });

        let driver = Self {
            ws_tx: Arc::new(Mutex::new(tx)),
            responses,
            msg_id: Arc::new(Mutex::new(1)),
        };

        driver.send_command("Page.enable", json!({})).await?;
        driver.send_command("Runtime.enable", json!({})).await?;
        tracing::info!("CDP driver attached");

        Ok(driver)
    }

    async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let (id, rx) = {
            let mut msg_id = self.msg_id.lock().await;
            let id = *msg_id;
            *msg_id += 1;

            let (tx, rx) = tokio::sync::oneshot::channel();
            self.responses.lock().await.insert(id, tx);
            (id, rx)
        };

        let command = json!({ "id": id, "method": method, "params": params });

        {
            let mut tx = self.ws_tx.lock().await;
            tx.send(WsMessage::Text(command.to_string()))
                .await
                .map_err(|e| RehearseError::Driver(format!("CDP send failed: {}", e)))?;
        }

        match tokio::time::timeout(tokio::time::Duration::from_secs(30), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RehearseError::Driver("response channel closed".to_string())),
            Err(_) => Err(RehearseError::Driver(format!("{} timed out", method))),
        }
    }

    fn unwrap_value(response: &serde_json::Value) -> serde_json::Value {
        response
            .get("result")
            .and_then(|r| r.get("result"))
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn run_script(&self, code: &str) -> Result<serde_json::Value> {
        let response = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": code,
                    "returnByValue": true,
                    "awaitPromise": true
                }),
            )
            .await?;

        if let Some(desc) = response
            .get("result")
            .and_then(|r| r.get("exceptionDetails"))
            .and_then(|d| d.get("text"))
            .and_then(|t| t.as_str())
        {
            return Err(RehearseError::Driver(format!("script threw: {}", desc)));
        }

        Ok(Self::unwrap_value(&response))
    }

    async fn load_url(&self, url: &str) -> Result<()> {
        self.send_command("Page.navigate", json!({ "url": url })).await?;
        tracing::info!("Navigated to: {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.run_script("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RehearseError::Driver("location.href not a string".to_string()))
    }

    async fn capture_page(&self) -> Result<String> {
        let response = self
            .send_command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;

        response
            .get("result")
            .and_then(|r| r.get("data"))
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .ok_or_else(|| RehearseError::Driver("screenshot capture failed".to_string()))
    }
}
