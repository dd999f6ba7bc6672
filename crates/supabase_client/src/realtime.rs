use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use core_types::{ChangeEvent, ChangeFilter, ChangeKind, ChangeStream, RealtimeClient, Table};
use futures::{Sink, SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::Platform;

/// Postgres change feed over the platform's Phoenix-channel websocket.
#[derive(Debug, Clone)]
pub struct RealtimeApi {
    platform: Platform,
    heartbeat: Duration,
}

impl RealtimeApi {
    pub(crate) fn new(platform: Platform, heartbeat: Duration) -> Self {
        Self {
            platform,
            heartbeat,
        }
    }

    fn socket_url(&self) -> Result<Url> {
        let mut url = self.platform.url("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot use {scheme} for {url}"))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.platform.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

pub(crate) fn topic_for(filter: &ChangeFilter) -> String {
    match filter.owner {
        Some(owner) => format!("realtime:{}_changes:{owner}", filter.table.name()),
        None => format!("realtime:{}_changes", filter.table.name()),
    }
}

pub(crate) fn join_message(topic: &str, filter: &ChangeFilter, access_token: Option<&str>) -> Value {
    let mut change = json!({
        "event": "*",
        "schema": "public",
        "table": filter.table.name(),
    });
    if let Some(row_filter) = filter.row_filter() {
        change["filter"] = Value::String(row_filter);
    }
    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [change],
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_owned());
    }
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": payload,
        "ref": "1",
        "join_ref": "1",
    })
}

fn heartbeat_message(reference: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string(),
    })
}

fn leave_message(topic: &str) -> Value {
    json!({
        "topic": topic,
        "event": "phx_leave",
        "payload": {},
        "ref": null,
    })
}

/// Sends `phx_leave` for `topic`, then closes the sink.
async fn leave<S>(write: &mut S, topic: &str) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    write
        .send(Message::Text(leave_message(topic).to_string().into()))
        .await?;
    write.close().await
}

/// Maps a `postgres_changes` frame on `topic` to a change event; every other
/// frame yields `None`.
pub(crate) fn parse_frame(text: &str, topic: &str) -> Option<ChangeEvent> {
    let frame: Value = serde_json::from_str(text).ok()?;
    let event = frame.get("event").and_then(Value::as_str)?;
    if frame.get("topic").and_then(Value::as_str) != Some(topic) {
        return None;
    }

    if event == "phx_reply" {
        let status = frame.pointer("/payload/status").and_then(Value::as_str);
        if status == Some("error") {
            warn!(topic, reply = %frame["payload"], "realtime join rejected");
        }
        return None;
    }
    if event != "postgres_changes" {
        return None;
    }

    let data = frame.pointer("/payload/data")?;
    let table = data
        .get("table")
        .and_then(Value::as_str)
        .and_then(Table::from_name)?;
    let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;
    let non_null = |key: &str| data.get(key).filter(|value| !value.is_null()).cloned();
    Some(ChangeEvent {
        table,
        kind,
        record: non_null("record"),
        old_record: non_null("old_record"),
    })
}

#[async_trait]
impl RealtimeClient for RealtimeApi {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeStream> {
        let url = self.socket_url()?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .context("failed to open realtime socket")?;
        let (mut write, mut read) = socket.split();

        let topic = topic_for(&filter);
        let token = self.platform.session.access_token();
        let join = join_message(&topic, &filter, token.as_deref());
        write
            .send(Message::Text(join.to_string().into()))
            .await
            .context("failed to join realtime channel")?;
        info!(topic = %topic, "realtime channel joined");

        let (tx, rx) = mpsc::unbounded_channel();
        let heartbeat = self.heartbeat;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat);
            ticker.tick().await;
            let mut next_ref = 2_u64;

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        let frame = heartbeat_message(next_ref);
                        next_ref += 1;
                        if write.send(Message::Text(frame.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_frame(text.as_str(), &topic)
                                && tx.send(event).is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                            warn!(topic = %topic, "realtime socket closed by server");
                            break;
                        }
                        _ => {}
                    }
                }
            }

            match leave(&mut write, &topic).await {
                Ok(()) => debug!(topic = %topic, "realtime channel torn down"),
                Err(err) => debug!(topic = %topic, error = %err, "realtime leave failed"),
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })))
    }
}
