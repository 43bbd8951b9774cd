use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use karantene_db::Database;
use karantene_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Sent back to a connection that cheers before its window elapsed.
pub const QUARANTINE_NOTICE: &str = "Rolig nå, du skålte nettopp...";

/// Drive one WebSocket connection. The identity cookie was already
/// checked at the HTTP upgrade, so `navn` is trusted here.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    navn: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} connected to the broadcast channel", navn);

    let (conn_id, mut conn_rx) = dispatcher.register_connection().await;
    let mut broadcast_rx = dispatcher.subscribe();

    // Forward broadcasts + targeted notices to this client
    let mut send_task = tokio::spawn(async move {
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
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                result = conn_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client
    let recv_dispatcher = dispatcher.clone();
    let recv_navn = navn.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(GatewayCommand::Cheers) => {
                        handle_cheer(&recv_dispatcher, &db, conn_id, &recv_navn).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            recv_navn,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever task finishes first tears the connection down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_connection(conn_id).await;
    info!("{} disconnected from the broadcast channel", navn);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap();
    sender.send(Message::Text(text.into())).await
}

/// An accepted cheer is persisted to the activity log and broadcast;
/// a rejected one only earns the originator a quarantine notice.
async fn handle_cheer(dispatcher: &Dispatcher, db: &Arc<Database>, conn_id: Uuid, navn: &str) {
    if !dispatcher.try_cheer(navn) {
        dispatcher
            .send_to_connection(
                conn_id,
                GatewayEvent::CheersQuarantine(QUARANTINE_NOTICE.to_string()),
            )
            .await;
        return;
    }

    let db = db.clone();
    let user = navn.to_string();
    let appended = tokio::task::spawn_blocking(move || {
        db.add_activity(&format!("{user} skålet!"), &user)
    })
    .await;

    match appended {
        Ok(Ok(())) => dispatcher.broadcast(GatewayEvent::Cheers(navn.to_string())),
        Ok(Err(e)) => error!("Failed to record cheer from {}: {:#}", navn, e),
        Err(e) => error!("Cheer task failed for {}: {}", navn, e),
    }
}
