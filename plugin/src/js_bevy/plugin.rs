//! Script engine plugin

use bevy::prelude::*;
use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

use crate::js::{JsEngine, JsEngineClient};

/// Lets systems queue scripts on the engine that backs the ping UI.
#[derive(Resource, Clone)]
pub struct JsClientResource(JsEngineClient);

impl JsClientResource {
    pub fn inner(&self) -> &JsEngineClient {
        &self.0
    }
}

impl Deref for JsClientResource {
    type Target = JsEngineClient;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Owns the engine thread; removing it stops the engine.
#[derive(Resource)]
struct JsEngineResource(#[allow(dead_code)] JsEngine);

/// Hands an already started engine to the app and ticks it every frame.
///
/// ## Usage
///
/// ```ignore
/// let (engine, backend) = bevy_ws_ping::js::start_script_engine();
/// App::new()
///     .add_plugins(JsPlugin::new(engine))
///     .run();
/// ```
pub struct JsPlugin {
    engine: Mutex<Option<JsEngine>>,
}

impl JsPlugin {
    pub fn new(engine: JsEngine) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
        }
    }
}

impl Plugin for JsPlugin {
    fn build(&self, app: &mut App) {
        let Some(engine) = self
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            log::warn!("JsPlugin built twice; the engine was already handed to the app");
            return;
        };

        app.insert_resource(JsClientResource(engine.client()))
            .insert_resource(JsEngineResource(engine));

        app.add_systems(Update, tick_js_engine);

        log::info!("Script engine attached to app");
    }
}

/// Tick the JS event loop each frame.
fn tick_js_engine(client: Option<Res<JsClientResource>>) {
    if let Some(client) = client {
        client.tick();
    }
}
