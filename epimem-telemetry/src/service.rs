use crate::TelemetryError;
use epimem_core::TelemetryMessage;
use futures::StreamExt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

enum Command {
    Drain(oneshot::Sender<Vec<TelemetryMessage>>),
    Shutdown,
}

/// Handle to a running listener
pub struct TelemetryService {
    local_addr: SocketAddr,
    commands: mpsc::Sender<Command>,
    actor: JoinHandle<()>,
}

impl TelemetryService {
    pub async fn bind(addr: &str) -> Result<Self, TelemetryError> {
        let bind_err = |source| TelemetryError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        let (commands, command_rx) = mpsc::channel(8);
        let actor = tokio::spawn(run_actor(listener, command_rx));
        info!("Telemetry listening on ws://{}", local_addr);
        Ok(Self {
            local_addr,
            commands,
            actor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Takes every message received so far, leaving the buffer empty
    pub async fn drain(&self) -> Result<Vec<TelemetryMessage>, TelemetryError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Drain(reply))
            .await
            .map_err(|_| TelemetryError::Stopped)?;
        let messages = rx.await.map_err(|_| TelemetryError::Stopped)?;
        info!("Drained {} telemetry messages", messages.len());
        Ok(messages)
    }

    /// Shuts the listener down, waiting at most `timeout` for it to finish
    pub async fn stop(mut self, timeout: Duration) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            debug!("Telemetry actor already gone");
        }
        match tokio::time::timeout(timeout, &mut self.actor).await {
            Ok(Ok(())) => info!("Telemetry service on {} stopped", self.local_addr),
            Ok(Err(e)) => warn!("Telemetry actor ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Telemetry service did not stop within {:?}; aborting",
                    timeout
                );
                self.actor.abort();
            }
        }
    }
}

async fn run_actor(listener: TcpListener, mut commands: mpsc::Receiver<Command>) {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<TelemetryMessage>();
    let mut buffer: Vec<TelemetryMessage> = Vec::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, inbound_tx.clone()));
                }
                Err(e) => warn!("Telemetry accept failed: {}", e),
            },
            Some(message) = inbound_rx.recv() => buffer.push(message),
            command = commands.recv() => match command {
                Some(Command::Drain(reply)) => {
                    while let Ok(message) = inbound_rx.try_recv() {
                        buffer.push(message);
                    }
                    if reply.send(std::mem::take(&mut buffer)).is_err() {
                        warn!("Drain requester went away");
                    }
                }
                Some(Command::Shutdown) | None => break,
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.abort_all();
    if !buffer.is_empty() {
        warn!("Discarding {} undrained telemetry messages", buffer.len());
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    inbound: mpsc::UnboundedSender<TelemetryMessage>,
) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Telemetry handshake with {} failed: {}", peer, e);
            return;
        }
    };
    info!("Telemetry client connected: {}", peer);

    while let Some(frame) = ws.next().await {
        let raw = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Telemetry read error from {}: {}", peer, e);
                break;
            }
        };
        if inbound.send(TelemetryMessage::received_now(&raw)).is_err() {
            break;
        }
    }
    info!("Telemetry client disconnected: {}", peer);
}
