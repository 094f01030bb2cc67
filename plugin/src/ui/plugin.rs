//! Ping UI Plugin for Bevy

use std::sync::Arc;

use bevy::prelude::*;

use crate::config::{BackendKind, PingConfig};
use crate::js::start_script_engine;
use crate::js_bevy::JsPlugin;
use crate::ping::{NativeBackend, PingBackend, PingClient};
use crate::ui::systems::*;
use crate::ui::types::*;

/// Mounts the ping button into the [`PingUiHost`] entity and runs exchanges
/// through the backend chosen by [`PingConfig::backend`].
pub struct PingUiPlugin {
    config: PingConfig,
    backend: Option<Arc<dyn PingBackend>>,
}

impl PingUiPlugin {
    pub fn new(config: PingConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// Use `backend` instead of the one named in the config.
    pub fn with_backend(config: PingConfig, backend: Arc<dyn PingBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    fn select_backend(&self, app: &mut App) -> Arc<dyn PingBackend> {
        if let Some(backend) = &self.backend {
            return backend.clone();
        }

        match self.config.backend {
            BackendKind::Native => Arc::new(NativeBackend),
            BackendKind::Script => {
                let (engine, backend) = start_script_engine();
                app.add_plugins(JsPlugin::new(engine));
                Arc::new(backend)
            }
        }
    }
}

impl Plugin for PingUiPlugin {
    fn build(&self, app: &mut App) {
        log::info!("Building ping UI plugin...");

        let backend = self.select_backend(app);
        let (client, receiver) = PingClient::new(backend);
        log::info!(
            "Pinging {} with {} backend",
            self.config.endpoint,
            client.backend_name()
        );

        app.insert_resource(client)
            .insert_resource(receiver)
            .insert_resource(PingSettings(self.config.clone()))
            .init_resource::<PingDisplay>()
            .init_resource::<PingInFlight>()
            .add_systems(PostStartup, mount_ping_ui)
            .add_systems(
                Update,
                (
                    handle_ping_button,
                    collect_ping_reports,
                    render_ping_display.run_if(resource_changed::<PingDisplay>),
                    render_ping_button,
                )
                    .chain(),
            );

        log::info!("Ping UI plugin configured");
    }
}
