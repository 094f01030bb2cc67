use std::sync::mpsc::{self, Receiver};

use boa_engine::{Context, JsError};
use boa_runtime::extensions::{ConsoleExtension, MicrotaskExtension};

use crate::js::{JsCommand, JsEngine, JsEngineClient};

/// Something that adds globals to a fresh JS context.
pub trait JsEngineExtension: Send + Sync + 'static {
    fn register(&self, context: &mut Context, client: JsEngineClient) -> Result<(), JsError>;

    /// Called on the engine thread right before it exits.
    fn shutdown(&self) {}
}

pub struct JsEngineBuilder {
    extensions: Vec<Box<dyn JsEngineExtension>>,
    client: JsEngineClient,
    receiver: Receiver<JsCommand>,
}

impl Default for JsEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEngineBuilder {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        JsEngineBuilder {
            extensions: vec![],
            client: JsEngineClient { sender },
            receiver,
        }
    }

    pub fn with_extension(mut self, extension: impl JsEngineExtension) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Spawn the engine thread. The context is built on that thread.
    pub fn start(self) -> JsEngine {
        JsEngine::spawn(self.client, self.receiver, self.extensions)
    }
}

pub(crate) fn build_context(
    extensions: &[Box<dyn JsEngineExtension>],
    client: &JsEngineClient,
) -> Result<Context, JsError> {
    let mut context = Context::builder().build()?;

    // Register Boa runtime extensions
    boa_runtime::register(
        (ConsoleExtension::default(), MicrotaskExtension {}),
        None,
        &mut context,
    )?;

    for extension in extensions {
        extension.register(&mut context, client.clone())?;
    }

    Ok(context)
}
