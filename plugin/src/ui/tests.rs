use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bevy::prelude::*;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use crate::config::PingConfig;
use crate::ping::{PingBackend, PingError, PingRequest};
use crate::ui::style;
use crate::ui::*;

/// Replies with the message it was given.
struct Echo;

impl PingBackend for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
        async move { Ok(request.message) }.boxed()
    }
}

/// Always times out.
struct Failing;

impl PingBackend for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn exchange(&self, _request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
        async move { Err(PingError::TimedOut(Duration::from_millis(5))) }.boxed()
    }
}

/// Holds every exchange until `release` is notified.
#[derive(Default)]
struct Gated {
    calls: AtomicUsize,
    release: Arc<Notify>,
}

impl PingBackend for Gated {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let release = self.release.clone();
        async move {
            release.notified().await;
            Ok(request.message)
        }
        .boxed()
    }
}

fn config() -> PingConfig {
    PingConfig {
        endpoint: "ws://127.0.0.1:9/".to_string(),
        message: "Hello, world!".to_string(),
        ..PingConfig::default()
    }
}

fn app_with(config: PingConfig, backend: Arc<dyn PingBackend>) -> App {
    let mut app = App::new();
    app.add_plugins(PingUiPlugin::with_backend(config, backend));
    app.world_mut().spawn((Node::default(), PingUiHost));
    app.update();
    app
}

fn set_interaction(app: &mut App, value: Interaction) {
    let world = app.world_mut();
    let mut buttons = world.query_filtered::<&mut Interaction, With<PingButton>>();
    for mut interaction in buttons.iter_mut(world) {
        *interaction = value;
    }
    app.update();
}

fn press(app: &mut App) {
    set_interaction(app, Interaction::Pressed);
    set_interaction(app, Interaction::None);
}

fn wait_until_idle(app: &mut App) {
    for _ in 0..200 {
        app.update();
        if !app.world().resource::<PingInFlight>().is_busy() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("exchange never finished");
}

fn display(app: &App) -> PingDisplay {
    app.world().resource::<PingDisplay>().clone()
}

fn result_text(app: &mut App) -> String {
    let world = app.world_mut();
    let mut texts = world.query_filtered::<&Text, With<PingResultText>>();
    texts.single(world).unwrap().0.clone()
}

fn caption(app: &mut App) -> String {
    let world = app.world_mut();
    let mut captions = world.query_filtered::<&Text, With<PingResultCaption>>();
    captions.single(world).unwrap().0.clone()
}

fn panel_display(app: &mut App) -> Display {
    let world = app.world_mut();
    let mut panels = world.query_filtered::<&Node, With<PingResultPanel>>();
    panels.single(world).unwrap().display
}

#[test]
fn mounts_button_and_hidden_panel_under_the_host() {
    let mut app = app_with(config(), Arc::new(Echo));
    let world = app.world_mut();

    let host = world
        .query_filtered::<Entity, With<PingUiHost>>()
        .single(world)
        .unwrap();
    let button_parent = world
        .query_filtered::<&ChildOf, With<PingButton>>()
        .single(world)
        .unwrap()
        .parent();
    let panel_parent = world
        .query_filtered::<&ChildOf, With<PingResultPanel>>()
        .single(world)
        .unwrap()
        .parent();

    assert_eq!(button_parent, host);
    assert_eq!(panel_parent, host);
    assert_eq!(panel_display(&mut app), Display::None);
    assert_eq!(display(&app), PingDisplay::Empty);
}

#[cfg(debug_assertions)]
#[test]
fn missing_host_is_fatal_in_debug_builds() {
    let mut app = App::new();
    app.add_plugins(PingUiPlugin::with_backend(config(), Arc::new(Echo)));
    app.update();

    assert_eq!(app.should_exit(), Some(AppExit::error()));
}

#[test]
fn press_shows_the_reply() {
    let mut app = app_with(config(), Arc::new(Echo));

    press(&mut app);
    wait_until_idle(&mut app);
    app.update();

    assert_eq!(display(&app), PingDisplay::Reply("Hello, world!".to_string()));
    assert_eq!(result_text(&mut app), "Hello, world!");
    assert_eq!(caption(&mut app), REPLY_CAPTION);
    assert_eq!(panel_display(&mut app), Display::Flex);
}

#[test]
fn empty_reply_is_shown_as_a_reply() {
    let config = PingConfig {
        message: String::new(),
        ..config()
    };
    let mut app = app_with(config, Arc::new(Echo));

    press(&mut app);
    wait_until_idle(&mut app);

    assert_eq!(display(&app), PingDisplay::Reply(String::new()));
}

#[test]
fn failures_are_visible_and_release_the_button() {
    let mut app = app_with(config(), Arc::new(Failing));

    press(&mut app);
    wait_until_idle(&mut app);
    app.update();

    assert_eq!(
        display(&app),
        PingDisplay::Failed("no reply within 5ms".to_string())
    );
    assert_eq!(result_text(&mut app), "no reply within 5ms");
    assert_eq!(caption(&mut app), FAILED_CAPTION);

    let world = app.world_mut();
    let background = world
        .query_filtered::<&BackgroundColor, With<PingResultPanel>>()
        .single(world)
        .unwrap()
        .0;
    assert_eq!(background, style::PANEL_FAILED);
}

#[test]
fn presses_while_busy_are_ignored() {
    let backend = Arc::new(Gated::default());
    let mut app = app_with(config(), backend.clone());

    press(&mut app);
    assert!(app.world().resource::<PingInFlight>().is_busy());
    assert_eq!(display(&app), PingDisplay::Pending);
    assert_eq!(result_text(&mut app), "Waiting for reply...");

    press(&mut app);
    press(&mut app);

    backend.release.notify_one();
    wait_until_idle(&mut app);

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(display(&app), PingDisplay::Reply("Hello, world!".to_string()));

    // The guard is released, so the next press starts a new exchange.
    press(&mut app);
    backend.release.notify_one();
    wait_until_idle(&mut app);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn busy_button_is_greyed_out() {
    let backend = Arc::new(Gated::default());
    let mut app = app_with(config(), backend.clone());

    press(&mut app);

    let world = app.world_mut();
    let background = world
        .query_filtered::<&BackgroundColor, With<PingButton>>()
        .single(world)
        .unwrap()
        .0;
    let label = world
        .query_filtered::<&Text, With<PingButtonLabel>>()
        .single(world)
        .unwrap()
        .0
        .clone();
    assert_eq!(background, style::BUTTON_BUSY);
    assert_eq!(label, style::BUTTON_LABEL_BUSY);

    backend.release.notify_one();
    wait_until_idle(&mut app);
}

#[test]
fn invalid_endpoint_fails_without_starting_an_exchange() {
    let backend = Arc::new(Gated::default());
    let config = PingConfig {
        endpoint: "http://example.com/".to_string(),
        ..config()
    };
    let mut app = app_with(config, backend.clone());

    press(&mut app);

    assert!(!app.world().resource::<PingInFlight>().is_busy());
    assert!(matches!(display(&app), PingDisplay::Failed(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
