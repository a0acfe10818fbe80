use crate::api::GameApi;
use crate::conf::Config;
use crate::controller::Controller;
use std::sync::Arc;

pub struct AppState {
  pub controller: Arc<Controller>,
  pub api: Arc<dyn GameApi>,
  pub config: Config,
}

impl AppState {
  pub fn new(api: Arc<dyn GameApi>, config: Config) -> Arc<Self> {
    let controller = Controller::new(api.clone(), config.poll_interval(), config.recent_games);
    Arc::new(Self {
      controller,
      api,
      config,
    })
  }
}
