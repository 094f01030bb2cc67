use bevy::prelude::*;
use bevy_ws_ping::{PingConfig, PingUiHost, PingUiPlugin};

const CONFIG_PATH: &str = "ping.json";

fn main() -> AppExit {
    let config = match PingConfig::load_or_default(CONFIG_PATH).and_then(|c| c.with_env_overrides())
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return AppExit::error();
        }
    };

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(PingUiPlugin::new(config))
        .add_systems(Startup, setup)
        .run()
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);

    // Host element for the ping UI, centered on screen
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        PingUiHost,
    ));
}
