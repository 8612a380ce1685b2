//! Websocket transport.
//!
//! Each socket gets a connection id, a writer task draining its outbound
//! channel, and a read loop that forwards decoded events to the engine.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::engine::{Engine, EngineCommand, EngineHandle, EngineStats};
use crate::error::{ProtocolError, ServerError};
use crate::protocol::{self, ServerEvent};

/// Build the HTTP router.
pub fn router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Start the engine and serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let table = config.damage_table()?;
    let (engine, _task) = Engine::with_seed(table, config.seed).spawn();

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "roast arena listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(engine): State<EngineHandle>) -> Result<Json<EngineStats>, StatusCode> {
    engine
        .stats()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn ws_handler(State(engine): State<EngineHandle>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(engine, socket))
}

async fn handle_socket(engine: EngineHandle, socket: WebSocket) {
    let conn_id = Uuid::new_v4().simple().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let connected = engine
        .send(EngineCommand::Connect {
            conn_id: conn_id.clone(),
            tx,
        })
        .await;
    if !connected {
        tracing::warn!(conn = %conn_id, "engine stopped, closing socket");
        return;
    }

    // Ends once the engine drops this connection's sender
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match protocol::encode(&event) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!(%err, "failed to encode event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => match protocol::decode(&text) {
                Ok(event) => {
                    let command = EngineCommand::Client {
                        conn_id: conn_id.clone(),
                        event,
                    };
                    if !engine.send(command).await {
                        break;
                    }
                }
                Err(err) => tracing::debug!(conn = %conn_id, %err, "frame dropped"),
            },
            Message::Binary(_) => {
                tracing::debug!(conn = %conn_id, err = %ProtocolError::Binary, "frame dropped")
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    engine
        .send(EngineCommand::Disconnect {
            conn_id: conn_id.clone(),
        })
        .await;
    writer.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DamageTable;

    #[tokio::test]
    async fn test_healthz() {
        assert_eq!(healthz().await, "ok");
    }

    #[tokio::test]
    async fn test_stats_reports_engine_load() {
        let (engine, _task) = Engine::with_seed(DamageTable::default(), Some(1)).spawn();

        let Json(snapshot) = stats(State(engine)).await.unwrap();

        assert_eq!(
            snapshot,
            EngineStats {
                connections: 0,
                waiting: false,
                active_battles: 0,
            }
        );
    }
}
