//! The game controller session: polls the game server and keeps the view
//! state every connected browser renders.

pub mod session;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use crate::api::{ApiError, GameApi};
use crate::forms::{FormSubmission, ValidationError};
use crate::models::{GameConfig, GameStatus, InternalMsg, OllamaStatus};
pub use session::{RecentGames, SessionState, StartControl};

#[derive(Debug, Error)]
pub enum ControlError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("There is no pending input to answer.")]
  NoPrompt,
  #[error("A game is already starting or running.")]
  Busy,
  #[error(transparent)]
  Api(#[from] ApiError),
}

/// The running poll loop, plus the last sequence number handed out before it
/// started. Answers at or below `floor` belong to an earlier loop.
#[derive(Default)]
struct PollSlot {
  handle: Option<JoinHandle<()>>,
  floor: u64,
}

pub struct Controller {
  api: Arc<dyn GameApi>,
  state: RwLock<SessionState>,
  poller: Mutex<PollSlot>,
  next_seq: AtomicU64,
  tx: broadcast::Sender<InternalMsg>,
  poll_interval: Duration,
  recent_limit: usize,
}

impl Controller {
  pub fn new(api: Arc<dyn GameApi>, poll_interval: Duration, recent_limit: usize) -> Arc<Self> {
    let (tx, _) = broadcast::channel(100);
    Arc::new(Self {
      api,
      state: RwLock::new(SessionState::default()),
      poller: Mutex::new(PollSlot::default()),
      next_seq: AtomicU64::new(0),
      tx,
      poll_interval: poll_interval.max(Duration::from_millis(1)),
      recent_limit,
    })
  }

  pub fn subscribe(&self) -> broadcast::Receiver<InternalMsg> {
    self.tx.subscribe()
  }

  pub async fn snapshot(&self) -> SessionState {
    self.state.read().await.clone()
  }

  fn notify(&self) {
    // no subscribers is fine
    let _ = self.tx.send(InternalMsg::StateUpdated);
  }

  fn poll_slot(&self) -> std::sync::MutexGuard<'_, PollSlot> {
    self.poller.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// (Re)starts the poll loop. The first tick fires immediately.
  ///
  /// Status requests still in flight from before the restart can no longer
  /// change the session.
  pub fn start_polling(self: &Arc<Self>) {
    let mut slot = self.poll_slot();
    if let Some(old) = slot.handle.take() {
      old.abort();
    }
    slot.floor = self.next_seq.load(Ordering::SeqCst);
    let this = Arc::clone(self);
    slot.handle = Some(tokio::spawn(async move { this.poll_loop().await }));
    tracing::debug!(
      interval_ms = self.poll_interval.as_millis() as u64,
      floor = slot.floor,
      "status polling started"
    );
  }

  /// Stops the poll loop. Safe to call when it is not running.
  pub fn stop_polling(&self) {
    let handle = self.poll_slot().handle.take();
    if let Some(handle) = handle {
      handle.abort();
      tracing::debug!("status polling stopped");
    }
  }

  /// Stops the loop only if it is still the one that started at `floor`.
  fn stop_polling_from(&self, floor: u64) {
    let handle = {
      let mut slot = self.poll_slot();
      if slot.floor != floor {
        return;
      }
      slot.handle.take()
    };
    if let Some(handle) = handle {
      handle.abort();
      tracing::debug!(floor, "status polling stopped");
    }
  }

  pub fn is_polling(&self) -> bool {
    self
      .poll_slot()
      .handle
      .as_ref()
      .is_some_and(|h| !h.is_finished())
  }

  async fn poll_loop(self: Arc<Self>) {
    let mut interval = tokio::time::interval(self.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
      interval.tick().await;
      let seq = self.next_seq();
      let this = Arc::clone(&self);
      // each request runs on its own so a slow answer never holds up the next tick
      tokio::spawn(async move { this.poll_once(seq).await });
    }
  }

  fn next_seq(&self) -> u64 {
    self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Fetches the status once, outside the loop.
  pub async fn poll_now(self: &Arc<Self>) {
    let seq = self.next_seq();
    self.poll_once(seq).await;
  }

  async fn poll_once(self: &Arc<Self>, seq: u64) {
    match self.api.game_status().await {
      Ok(status) => self.accept(seq, status).await,
      Err(e) => tracing::warn!(seq, error = %e, "status poll failed"),
    }
  }

  /// Applies a status fetched by poll `seq`. Answers older than the last one
  /// applied, or sent before the current poll loop started, are dropped.
  pub async fn accept(self: &Arc<Self>, seq: u64, status: GameStatus) {
    let (effects, floor) = {
      let mut state = self.state.write().await;
      let floor = self.poll_slot().floor;
      if seq <= state.applied_seq || seq <= floor {
        tracing::debug!(seq, applied = state.applied_seq, floor, "dropping stale status");
        return;
      }
      state.applied_seq = seq;
      (state.reduce(status), floor)
    };

    if effects.stop_polling {
      self.stop_polling_from(floor);
    }
    if effects.changed {
      self.notify();
    }
    if effects.refresh_logs {
      self.refresh_recent_games().await;
    }
  }

  pub async fn start_game(self: &Arc<Self>, config: GameConfig) -> Result<(), ControlError> {
    {
      let mut state = self.state.write().await;
      if !state.start.enabled {
        return Err(ControlError::Busy);
      }
      state.start = StartControl::locked("Starting...");
    }
    self.notify();

    match self.api.start_game(&config.normalized()).await {
      Ok(()) => {
        tracing::info!("game start accepted");
        self.start_polling();
        Ok(())
      }
      Err(e) => {
        tracing::warn!(error = %e, "game start rejected");
        self.state.write().await.start = StartControl::ready("Start Game");
        self.notify();
        Err(e.into())
      }
    }
  }

  /// Validates and sends the player's answer. The panel is hidden before the
  /// request goes out and comes back only if the request fails.
  pub async fn submit(&self, submission: FormSubmission) -> Result<(), ControlError> {
    let begun = self.state.write().await.begin_submit(submission)?;
    let Some((action, submitted)) = begun else {
      return Err(ControlError::NoPrompt);
    };
    self.notify();

    tracing::info!(player = %submitted.player, kind = %submitted.request.kind(), "submitting action");
    if let Err(e) = self.api.submit_action(&action).await {
      tracing::warn!(error = %e, "submit failed");
      if self.state.write().await.restore_prompt(submitted) {
        self.notify();
      }
      return Err(e.into());
    }
    let seq = self.next_seq.load(Ordering::SeqCst);
    self.state.write().await.confirm_submit(&submitted, seq);
    Ok(())
  }

  pub async fn refresh_recent_games(&self) {
    let recent = match self.api.list_logs().await {
      Ok(list) => RecentGames::Loaded(list.logs.into_iter().take(self.recent_limit).collect()),
      Err(e) => {
        tracing::warn!(error = %e, "failed to load game list");
        RecentGames::Failed
      }
    };
    self.state.write().await.recent = recent;
    self.notify();
  }

  pub async fn check_ollama(&self) {
    let ollama = match self.api.check_ollama().await {
      Ok(status) => status,
      Err(e) => {
        tracing::debug!(error = %e, "ollama check failed");
        OllamaStatus {
          available: false,
          models: Vec::new(),
          error: Some(e.to_string()),
        }
      }
    };
    self.state.write().await.ollama = Some(ollama);
    self.notify();
  }
}
