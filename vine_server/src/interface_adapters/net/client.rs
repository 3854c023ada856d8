use crate::domain::{InputCommand, Snapshot};
use crate::interface_adapters::protocol::{
    ClientMessage, ServerMessage, encode_snapshot, parse_legacy_command,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{
    ListenerRole, SessionError, SessionHandle, SessionRegistry, Subscription,
};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
    SessionClosed,
    #[allow(dead_code)]
    Rejected(SessionError),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MESSAGES: u32 = 10;
const MAX_NAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<SessionRegistry>) {
    // Connection id correlates logs before a session is known.
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let span = info_span!(
        "conn",
        conn_id,
        session_id = tracing::field::Empty,
        role = tracing::field::Empty
    );
    serve_connection(socket, registry, span.clone())
        .instrument(span)
        .await;
}

async fn serve_connection(
    mut socket: WebSocket,
    registry: Arc<SessionRegistry>,
    span: tracing::Span,
) {
    let mut ctx = match bootstrap_connection(&mut socket, &registry).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    span.record("session_id", ctx.session.session_id);
    span.record("role", ctx.role.as_str());
    info!(name = %ctx.session.name, "client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    disconnect_cleanup(&registry, &ctx).await;
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn reject(socket: &mut WebSocket, message: String, reason: &'static str) {
    let _ = send_message(socket, &ServerMessage::Error { message }).await;
    let _ = send_close_with_reason(socket, close_code::POLICY, reason).await;
}

struct ConnCtx {
    session: SessionHandle,
    subscription: Subscription<Arc<Snapshot>>,
    role: ListenerRole,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_messages: u32,

    last_input_full_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
enum Handshake {
    Join { name: String },
    Spectate { session_id: u64 },
}

fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "player".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// Name carried by a `JOIN <name>` line; `None` unless the first word is exactly `JOIN`.
fn parse_join_line(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    if words.next()? != "JOIN" {
        return None;
    }
    Some(words.collect::<Vec<_>>().join(" "))
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    registry: &SessionRegistry,
) -> Result<ConnCtx, NetError> {
    let handshake = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let (session, subscription, role) = match handshake {
        Handshake::Join { name } => {
            let session = registry.create_session(&name).await;
            match session.attach(ListenerRole::Player) {
                Ok(subscription) => (session, subscription, ListenerRole::Player),
                Err(err) => {
                    // The fresh session has no other owner.
                    let _ = registry.remove_session(session.session_id).await;
                    reject(socket, err.to_string(), "session unavailable").await;
                    return Err(NetError::Rejected(err));
                }
            }
        }
        Handshake::Spectate { session_id } => match registry.attach_spectator(session_id).await {
            Ok((session, subscription)) => (session, subscription, ListenerRole::Spectator),
            Err(err) => {
                reject(socket, err.to_string(), "spectate rejected").await;
                return Err(NetError::Rejected(err));
            }
        },
    };

    // Send Identity Packet
    let identity = ServerMessage::Identity {
        session_id: session.session_id,
        role: role.into(),
    };
    if let Err(err) = send_message(socket, &identity).await {
        release(registry, &session, &subscription, role).await;
        return Err(err);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        session,
        subscription,
        role,
        msgs_in: 1,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out: 0,
        invalid_messages: 0,
        last_input_full_log: now,
        last_invalid_input_log: now,
        close_frame: None,
    })
}

async fn read_handshake(socket: &mut WebSocket) -> Result<Handshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => {
                        return Ok(Handshake::Join {
                            name: sanitize_name(&payload.name),
                        });
                    }
                    Ok(ClientMessage::Spectate(payload)) => {
                        return Ok(Handshake::Spectate {
                            session_id: payload.session_id,
                        });
                    }
                    Ok(ClientMessage::Input(_)) => {}
                    Err(_) => {
                        // Line protocol: `JOIN <name>`.
                        if let Some(name) = parse_join_line(&text) {
                            return Ok(Handshake::Join {
                                name: sanitize_name(&name),
                            });
                        }
                    }
                }

                reject(socket, "join or spectate first".to_string(), "join required").await;
                return Err(NetError::JoinRequired);
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn process_input(ctx: &mut ConnCtx, command: InputCommand) -> Result<LoopControl, NetError> {
    if ctx.role == ListenerRole::Spectator {
        // Spectators are read-only.
        if should_log(&mut ctx.last_invalid_input_log) {
            warn!("spectator input ignored");
        }
        return Ok(LoopControl::Continue);
    }

    match ctx.session.try_send_input(command) {
        Ok(true) => Ok(LoopControl::Continue),
        Ok(false) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!("command queue full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(_) => Err(NetError::SessionClosed),
    }
}

enum ConnEvent {
    Incoming(Option<Result<Message, Error>>),
    Frame(Option<Arc<Snapshot>>),
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let event = tokio::select! {
            incoming = socket.recv() => ConnEvent::Incoming(incoming),
            frame = ctx.subscription.recv() => ConnEvent::Frame(frame),
        };

        let control = match event {
            ConnEvent::Incoming(incoming) => match handle_incoming_ws(incoming, ctx) {
                Ok(control) => control,
                Err(e) => {
                    fatal = Some(e);
                    LoopControl::Disconnect
                }
            },
            ConnEvent::Frame(Some(snapshot)) => forward_snapshot(&snapshot, socket, ctx).await,
            ConnEvent::Frame(None) => {
                // The session ended underneath this connection.
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::NORMAL,
                    reason: "session ended".into(),
                });
                LoopControl::Disconnect
            }
        };

        if let LoopControl::Disconnect = control {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Input(payload)) => {
                        process_input(ctx, payload.command.into())
                    }
                    Ok(ClientMessage::Join(_)) | Ok(ClientMessage::Spectate(_)) => {
                        // One session per connection.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!("duplicate handshake ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => match parse_legacy_command(&text) {
                        Some(command) => process_input(ctx, command),
                        None => {
                            ctx.invalid_messages += 1;
                            if should_log(&mut ctx.last_invalid_input_log) {
                                warn!(
                                    bytes = text.len(),
                                    error = %parse_err,
                                    "failed to parse client message"
                                );
                            }

                            if ctx.invalid_messages > MAX_INVALID_MESSAGES {
                                ctx.close_frame = Some(CloseFrame {
                                    code: close_code::POLICY,
                                    reason: "too many invalid messages".into(),
                                });
                                return Ok(LoopControl::Disconnect);
                            }

                            Ok(LoopControl::Continue)
                        }
                    },
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_snapshot(
    snapshot: &Snapshot,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let txt = match encode_snapshot(snapshot) {
        Ok(txt) => txt,
        Err(e) => {
            error!(error = ?e, tick = snapshot.tick, "failed to serialize snapshot");
            return LoopControl::Continue;
        }
    };

    let bytes_len = txt.len();
    match socket.send(Message::Text(txt.into())).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn release(
    registry: &SessionRegistry,
    session: &SessionHandle,
    subscription: &Subscription<Arc<Snapshot>>,
    role: ListenerRole,
) {
    match role {
        // The owning player takes the session down with them.
        ListenerRole::Player => {
            if let Err(err) = registry.remove_session(session.session_id).await {
                debug!(error = %err, "session already gone");
            }
        }
        ListenerRole::Spectator => {
            session.detach(subscription.id);
        }
    }
}

async fn disconnect_cleanup(registry: &SessionRegistry, ctx: &ConnCtx) {
    release(registry, &ctx.session, &ctx.subscription, ctx.role).await;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_messages = ctx.invalid_messages,
        "connection stats"
    );
    info!("client disconnected");
}
