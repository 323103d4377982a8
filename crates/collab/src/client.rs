//! WebSocket client driving a [`NoteSync`] against a note server.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::protocol::{ClientMessage, NoteInfo, ServerMessage};
use crate::sync::{NoteSync, SyncRequest};

/// Client endpoint and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base HTTP URL of the note server, e.g. `http://127.0.0.1:8080`
    pub server_url: String,
    /// Quiet time before editor input is diffed and synced
    #[serde(with = "duration_millis")]
    pub debounce: Duration,
    /// Fixed delay before a reconnection attempt
    #[serde(with = "duration_millis")]
    pub reconnect_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            debounce: Duration::from_millis(500),
            reconnect_backoff: Duration::from_secs(2),
        }
    }
}

/// Events surfaced to the embedding editor
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The note text changed underneath the editor; re-render, restoring
    /// the cursor at its raw character offset as a best effort
    Content { text: String },
    /// Number of connected editors changed
    UserCount { count: usize },
    /// Connection lost; editing is disabled until the next `Content`
    Closed,
}

/// Handle to a live note connection; dropping it stops the driver task
pub struct NoteClient {
    input_tx: mpsc::UnboundedSender<String>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl NoteClient {
    /// Connect to `note_id`, spawning the connection driver task.
    ///
    /// Fails only on the initial note fetch; later transport drops
    /// reconnect internally.
    pub async fn connect(config: ClientConfig, note_id: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let info = fetch_note(&http, &config, note_id).await?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(64);

        let driver = Driver {
            config,
            note_id: note_id.to_string(),
            http,
            input_rx,
            event_tx: event_tx.clone(),
        };
        tokio::spawn(driver.run(info));

        Ok(Self { input_tx, event_tx })
    }

    /// Subscribe to note events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Push the editor's current text; synced after the quiet period
    pub fn set_text(&self, text: impl Into<String>) {
        let _ = self.input_tx.send(text.into());
    }
}

async fn fetch_note(
    http: &reqwest::Client,
    config: &ClientConfig,
    note_id: &str,
) -> Result<NoteInfo> {
    let url = format!(
        "{}/api/note/{}",
        config.server_url.trim_end_matches('/'),
        note_id
    );
    let info = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("fetching {url}"))?
        .json::<NoteInfo>()
        .await
        .context("decoding note info")?;
    Ok(info)
}

fn ws_url(server_url: &str, note_id: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    };
    format!("{base}/ws/note/{note_id}")
}

struct Driver {
    config: ClientConfig,
    note_id: String,
    http: reqwest::Client,
    input_rx: mpsc::UnboundedReceiver<String>,
    event_tx: broadcast::Sender<ClientEvent>,
}

enum SessionEnd {
    /// Server state diverged (conflict or rejected sync); refetch at once
    Reload,
    /// Transport dropped; back off before reconnecting
    Disconnected,
    /// The owning `NoteClient` is gone
    Finished,
}

impl Driver {
    async fn run(mut self, mut info: NoteInfo) {
        loop {
            match session(
                &self.config,
                &self.note_id,
                &self.event_tx,
                &mut self.input_rx,
                info,
            )
            .await
            {
                SessionEnd::Reload => {}
                SessionEnd::Disconnected => {
                    let _ = self.event_tx.send(ClientEvent::Closed);
                    tokio::time::sleep(self.config.reconnect_backoff).await;
                }
                SessionEnd::Finished => return,
            }

            info = loop {
                match fetch_note(&self.http, &self.config, &self.note_id).await {
                    Ok(info) => break info,
                    Err(err) => {
                        tracing::warn!(note = %self.note_id, %err, "note fetch failed; retrying");
                        tokio::time::sleep(self.config.reconnect_backoff).await;
                    }
                }
            };
        }
    }
}

/// One connection lifetime: connect, pump frames, debounce edits.
async fn session(
    config: &ClientConfig,
    note_id: &str,
    events: &broadcast::Sender<ClientEvent>,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
    info: NoteInfo,
) -> SessionEnd {
    let Some(latest_hash) = info.latest_hash else {
        tracing::warn!(note = %note_id, "note has no history yet");
        return SessionEnd::Disconnected;
    };
    let mut sync = NoteSync::new(latest_hash, info.latest_content.unwrap_or_default());

    let url = ws_url(&config.server_url, note_id);
    let (stream, _) = match connect_async(&url).await {
        Ok(pair) => pair,
        Err(err) => {
            tracing::warn!(note = %note_id, %err, "websocket connect failed");
            return SessionEnd::Disconnected;
        }
    };
    tracing::info!(note = %note_id, "connected");

    let (mut ws_tx, mut ws_rx) = stream.split();

    // Writer task: drain the outbound queue into the socket.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws_tx.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let _ = events.send(ClientEvent::Content {
        text: sync.synchronized().to_string(),
    });

    let mut editor_text: Option<String> = None;
    let mut deadline: Option<tokio::time::Instant> = None;

    let end = loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if let Some(end) = handle_server(&mut sync, &out_tx, events, msg) {
                                break end;
                            }
                        }
                        Err(err) => tracing::debug!(%err, "ignoring unparseable frame"),
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(note = %note_id, %err, "websocket error");
                    break SessionEnd::Disconnected;
                }
                None => break SessionEnd::Disconnected,
            },
            input = input_rx.recv() => match input {
                Some(text) => {
                    editor_text = Some(text);
                    deadline = Some(tokio::time::Instant::now() + config.debounce);
                }
                None => break SessionEnd::Finished,
            },
            _ = quiet_period(deadline) => {
                deadline = None;
                if let Some(text) = editor_text.take() {
                    match sync.local_edit(&text) {
                        Ok(Some(request)) => send_sync(&out_tx, request),
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(%err, "local reconciliation failed; reloading");
                            break SessionEnd::Reload;
                        }
                    }
                }
            }
        }
    };

    writer.abort();
    end
}

fn handle_server(
    sync: &mut NoteSync,
    out_tx: &mpsc::UnboundedSender<ClientMessage>,
    events: &broadcast::Sender<ClientEvent>,
    msg: ServerMessage,
) -> Option<SessionEnd> {
    match msg {
        ServerMessage::Ack { new_hash } => match sync.handle_ack(&new_hash) {
            Ok(Some(request)) => {
                send_sync(out_tx, request);
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, "ack reconciliation failed; reloading");
                Some(SessionEnd::Reload)
            }
        },
        ServerMessage::Update {
            latest_hash,
            operations,
        } => match sync.handle_update(&latest_hash, &operations) {
            Ok(()) => match sync.rendered() {
                Ok(text) => {
                    let _ = events.send(ClientEvent::Content { text });
                    None
                }
                Err(err) => {
                    tracing::warn!(%err, "render after update failed; reloading");
                    Some(SessionEnd::Reload)
                }
            },
            Err(err) => {
                tracing::warn!(%err, "update reconciliation failed; reloading");
                Some(SessionEnd::Reload)
            }
        },
        ServerMessage::Conflict { message } => {
            tracing::warn!(%message, "server reported conflict; reloading");
            Some(SessionEnd::Reload)
        }
        ServerMessage::Error { message } => {
            tracing::warn!(%message, "server rejected sync; reloading");
            Some(SessionEnd::Reload)
        }
        ServerMessage::UserCountUpdate { count } => {
            let _ = events.send(ClientEvent::UserCount { count });
            None
        }
    }
}

fn send_sync(out_tx: &mpsc::UnboundedSender<ClientMessage>, request: SyncRequest) {
    let _ = out_tx.send(ClientMessage::Sync {
        base_hash: request.base_hash,
        operations: request.operations,
    });
}

async fn quiet_period(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => futures::future::pending().await,
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
