use crate::controller::{ControlError, Controller, RecentGames};
use crate::models::{ClientAction, InternalMsg};
use crate::state::AppState;
use crate::templates::render_controller;
use askama::Template;
use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::IntoResponse,
};
use futures::{
  sink::{Sink, SinkExt},
  stream::{Stream, StreamExt},
};
use std::{
  sync::Arc,
  time::{Duration, Instant},
};
use tokio::sync::{broadcast::error::RecvError, mpsc};

pub async fn ws_handler(
  State(state): State<Arc<AppState>>,
  ws: WebSocketUpgrade,
) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
  let (sender, receiver) = socket.split();
  run_session(sender, receiver, state.controller.clone()).await;
}

/// Serves one browser until it disconnects or stops answering pings.
///
/// Intents run on their own tasks so session updates keep flowing while a
/// request to the game server is outstanding; failures come back as toasts.
async fn run_session<S, R, E>(mut sender: S, mut receiver: R, controller: Arc<Controller>)
where
  S: Sink<Message> + Unpin,
  R: Stream<Item = Result<Message, E>> + Unpin,
{
  const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
  const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);
  let mut heartbeat_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
  heartbeat_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

  let mut broadcast_rx = controller.subscribe();
  let (err_tx, mut err_rx) = mpsc::channel::<String>(16);

  // Initial state
  if send_update(&mut sender, &controller).await.is_err() {
    return;
  }

  // A page load picks the session up wherever the game server is.
  controller.start_polling();
  prime(&controller);

  let mut last_heartbeat = Instant::now();

  loop {
    tokio::select! {
      Some(Ok(msg)) = receiver.next() => {
        last_heartbeat = Instant::now();
        match msg {
          Message::Text(text) => {
            match serde_json::from_str::<ClientAction>(&text) {
              Ok(action) => {
                let controller = controller.clone();
                let err_tx = err_tx.clone();
                tokio::spawn(async move {
                  if let Err(msg) = dispatch(&controller, action).await {
                    let _ = err_tx.send(msg).await;
                  }
                });
              }
              Err(e) => tracing::debug!(error = %e, "ignoring malformed client message"),
            }
          },
          Message::Pong(_) => {},
          Message::Close(_) => break,
          _ => {}
        }
      }
      Some(msg) = err_rx.recv() => {
        if send_toast(&mut sender, &msg, "error").await.is_err() { break; }
        // the browser may have drifted from the session; resync it
        if send_update(&mut sender, &controller).await.is_err() { break; }
      }
      msg = broadcast_rx.recv() => {
        match msg {
          Ok(InternalMsg::StateUpdated) | Err(RecvError::Lagged(_)) => {
            if send_update(&mut sender, &controller).await.is_err() { break; }
          },
          Err(RecvError::Closed) => break,
        }
      }
      // Heartbeat check using interval to avoid reset on other events
      _ = heartbeat_interval.tick() => {
        if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
          tracing::debug!("websocket client timed out");
          break;
        }
        let _ = sender.send(Message::Ping(vec![].into())).await;
      }
    }
  }
}

/// Loads the side data the page shows once, on first connect.
fn prime(controller: &Arc<Controller>) {
  let controller = controller.clone();
  tokio::spawn(async move {
    let snapshot = controller.snapshot().await;
    if matches!(snapshot.recent, RecentGames::NotLoaded) {
      controller.refresh_recent_games().await;
    }
    if snapshot.ollama.is_none() {
      controller.check_ollama().await;
    }
  });
}

/// Runs a browser intent; the error text is what the user gets to see.
async fn dispatch(controller: &Arc<Controller>, action: ClientAction) -> Result<(), String> {
  match action {
    ClientAction::Start { config } => controller.start_game(config).await.map_err(|e| e.to_string()),
    ClientAction::Submit { submission } => {
      controller.submit(submission).await.map_err(|e| match e {
        ControlError::Api(e) => format!("Failed to submit action: {e}"),
        other => other.to_string(),
      })
    }
    ClientAction::Refresh => {
      controller.poll_now().await;
      controller.refresh_recent_games().await;
      Ok(())
    }
  }
}

async fn send_update<S>(sender: &mut S, controller: &Controller) -> Result<(), S::Error>
where
  S: Sink<Message> + Unpin,
{
  let snapshot = controller.snapshot().await;
  let html = match render_controller(&snapshot).render() {
    Ok(html) => html,
    Err(e) => {
      tracing::error!(error = %e, "failed to render controller fragment");
      return Ok(());
    }
  };
  let json = serde_json::json!({ "type": "update", "data": { "html": html } });
  sender.send(Message::text(json.to_string())).await
}

async fn send_toast<S>(sender: &mut S, msg: &str, kind: &str) -> Result<(), S::Error>
where
  S: Sink<Message> + Unpin,
{
  let json = serde_json::json!({ "type": "toast", "data": { "msg": msg, "kind": kind } });
  sender.send(Message::text(json.to_string())).await
}
