use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, warn};

use omn_types::access::can_see_requests_to;
use omn_types::events::{Feed, GatewayCommand, GatewayEvent};
use omn_types::session::{Claims, Session};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type Subscriptions = Arc<RwLock<HashSet<Feed>>>;

/// Handle a single WebSocket connection: Identify handshake, Ready, then
/// forward subscribed change events until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let session = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(session) => session,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    let ready = GatewayEvent::Ready {
        user_id: session.user_id,
        name: session.name.clone(),
        role: session.role,
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    let open = dispatcher.connection_opened();
    info!(
        "{} ({}) connected to gateway, {} open",
        session.name, session.user_id, open
    );

    run_connection_loop(sender, receiver, &dispatcher, &session).await;

    let open = dispatcher.connection_closed();
    info!(
        "{} ({}) disconnected from gateway, {} open",
        session.name, session.user_id, open
    );
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: &Dispatcher,
    session: &Session,
) {
    let mut broadcast_rx = dispatcher.subscribe();

    // Nothing is forwarded until the client subscribes.
    let subscriptions: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let send_session = session.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    let forward = match send_subscriptions.read() {
                        Ok(feeds) => should_forward(&event, &feeds, &send_session),
                        Err(_) => break,
                    };
                    if forward && !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping connection",
                                missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_session = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&recv_session, cmd, &subscriptions),
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            recv_session.name,
                            recv_session.user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Session> {
    let timeout = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(Session::from(token_data.claims));
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

fn handle_command(session: &Session, cmd: GatewayCommand, subscriptions: &Subscriptions) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { feeds } => {
            info!(
                "{} ({}) subscribing to {} feeds",
                session.name,
                session.user_id,
                feeds.len()
            );
            match subscriptions.write() {
                Ok(mut subs) => *subs = feeds.into_iter().collect(),
                Err(_) => warn!("Subscription lock poisoned for {}", session.user_id),
            }
        }
    }
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

/// Whether a connection subscribed to `feeds` should receive `event`.
/// Message events go only to their members; request events only to those who
/// may see requests addressed to that house.
pub fn should_forward(event: &GatewayEvent, feeds: &HashSet<Feed>, session: &Session) -> bool {
    let Some(feed) = event.feed() else {
        return false;
    };
    if !feeds.contains(&feed) {
        return false;
    }
    if let Some(members) = event.audience() {
        return members.contains(&session.user_id);
    }
    match event {
        GatewayEvent::EventRequestsChanged { to_house } => {
            let relevant = can_see_requests_to(session.role, *to_house);
            if !relevant {
                debug!("Skipping request event for {}", session.user_id);
            }
            relevant
        }
        _ => true,
    }
}
