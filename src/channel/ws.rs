use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::transport::{
    encode_frame, lock, parse_text_frame, EventHub, OpenOutcome, ReadyState, Transport,
    TransportEvent,
};
use crate::error::{ChannelError, Result};

/// WebSocket connection to the dashboard server.
///
/// Outbound frames go through an unbounded queue to a writer task so
/// `send` never blocks; a reader task turns inbound text frames into
/// events. Both tasks belong to the current connection only.
#[derive(Clone)]
pub struct WebSocketTransport {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    state: watch::Sender<ReadyState>,
    events: EventHub,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    connection_id: Mutex<Option<Uuid>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ReadyState::Closed);
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                state,
                events: EventHub::default(),
                outbound: Mutex::new(None),
                reader: Mutex::new(None),
                connection_id: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Id of the current (or last) connection, as recorded in the logs.
    pub fn connection_id(&self) -> Option<Uuid> {
        *lock(&self.inner.connection_id)
    }
}

impl Inner {
    fn emit(&self, event: TransportEvent) {
        self.events.emit(event);
    }

    fn report(&self, err: ChannelError) -> ChannelError {
        warn!(error = %err, "websocket send failed");
        self.emit(TransportEvent::Error(err.clone()));
        err
    }

    /// Move to `Closed` exactly once per connection.
    fn finish(&self) {
        lock(&self.outbound).take();
        let changed = self.state.send_if_modified(|state| {
            if *state == ReadyState::Closed {
                false
            } else {
                *state = ReadyState::Closed;
                true
            }
        });
        if changed {
            info!(url = %self.url, "websocket closed");
            self.emit(TransportEvent::Closed);
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self) -> Result<OpenOutcome> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ReadyState::Closed {
                *state = ReadyState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!(url = %self.inner.url, "open() ignored, connection already active");
            return Ok(OpenOutcome::AlreadyActive);
        }

        let stream = match connect_async(self.inner.url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                let err = ChannelError::ConnectFailed(e.to_string());
                warn!(url = %self.inner.url, error = %e, "websocket connect failed");
                self.inner.state.send_replace(ReadyState::Closed);
                self.inner.emit(TransportEvent::Error(err.clone()));
                return Err(err);
            }
        };

        let connection_id = Uuid::new_v4();
        let span = tracing::info_span!("ws", connection_id = %connection_id);
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer_inner = Arc::clone(&self.inner);
        tokio::spawn(
            async move {
                while let Some(msg) = rx.recv().await {
                    if let Err(e) = sink.send(msg).await {
                        writer_inner.report(ChannelError::SendFailed(e.to_string()));
                        break;
                    }
                }
                let _ = sink.close().await;
            }
            .instrument(span.clone()),
        );

        *lock(&self.inner.outbound) = Some(tx);

        // close() may have run while the handshake was in flight.
        let mut still_wanted = false;
        self.inner.state.send_modify(|state| {
            still_wanted = *state == ReadyState::Connecting;
            if still_wanted {
                *state = ReadyState::Open;
            }
        });
        if !still_wanted {
            info!(url = %self.inner.url, "connection closed during handshake");
            // Dropping the sender stops the writer, which closes the sink.
            lock(&self.inner.outbound).take();
            drop(source);
            self.inner.state.send_replace(ReadyState::Closed);
            return Err(ChannelError::NotOpen);
        }

        *lock(&self.inner.connection_id) = Some(connection_id);
        info!(url = %self.inner.url, connection_id = %connection_id, "websocket connected");
        self.inner.emit(TransportEvent::Opened);

        let reader_inner = Arc::clone(&self.inner);
        let reader = tokio::spawn(
            async move {
                while let Some(item) = source.next().await {
                    match item {
                        Ok(Message::Text(text)) => reader_inner.emit(parse_text_frame(&text)),
                        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                            Ok(text) => reader_inner.emit(parse_text_frame(&text)),
                            Err(e) => debug!(error = %e, "ignoring non-UTF-8 binary frame"),
                        },
                        Ok(Message::Close(frame)) => {
                            debug!(?frame, "server closed the connection");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "websocket read failed");
                            reader_inner.emit(TransportEvent::Error(ChannelError::ConnectionLost(
                                e.to_string(),
                            )));
                            break;
                        }
                    }
                }
                reader_inner.finish();
            }
            .instrument(span),
        );

        *lock(&self.inner.reader) = Some(reader);
        Ok(OpenOutcome::Established)
    }

    async fn close(&self) {
        let mut previous = ReadyState::Closed;
        self.inner.state.send_if_modified(|state| {
            previous = *state;
            match *state {
                ReadyState::Open | ReadyState::Connecting => {
                    *state = ReadyState::Closing;
                    true
                }
                ReadyState::Closing | ReadyState::Closed => false,
            }
        });
        if previous != ReadyState::Open {
            // A pending handshake sees `Closing` and abandons the connection.
            return;
        }

        if let Some(tx) = lock(&self.inner.outbound).take() {
            let _ = tx.send(Message::Close(None));
        }
        if let Some(reader) = lock(&self.inner.reader).take() {
            reader.abort();
        }
        self.inner.finish();
    }

    fn ready_state(&self) -> ReadyState {
        *self.inner.state.borrow()
    }

    fn send(&self, frame: serde_json::Value) -> Result<()> {
        if self.ready_state() != ReadyState::Open {
            return Err(ChannelError::NotOpen);
        }

        let text = encode_frame(&frame).map_err(|e| self.inner.report(e))?;

        let outbound = lock(&self.inner.outbound);
        let Some(tx) = outbound.as_ref() else {
            return Err(ChannelError::NotOpen);
        };
        tx.send(Message::Text(text)).map_err(|_| {
            self.inner
                .report(ChannelError::SendFailed("writer task has stopped".to_string()))
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        self.inner.events.subscribe()
    }
}
