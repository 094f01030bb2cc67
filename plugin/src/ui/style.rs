use bevy::prelude::*;

pub const BUTTON_IDLE: Color = Color::srgb(0.20, 0.45, 0.85);
pub const BUTTON_HOVERED: Color = Color::srgb(0.28, 0.55, 0.95);
pub const BUTTON_PRESSED: Color = Color::srgb(0.15, 0.35, 0.70);
pub const BUTTON_BUSY: Color = Color::srgb(0.45, 0.45, 0.50);

pub const PANEL_REPLY: Color = Color::srgb(0.94, 0.94, 0.94);
pub const PANEL_FAILED: Color = Color::srgb(0.98, 0.86, 0.86);
pub const PANEL_PENDING: Color = Color::srgb(0.90, 0.92, 0.96);

pub const TEXT_LIGHT: Color = Color::WHITE;
pub const TEXT_DARK: Color = Color::srgb(0.10, 0.10, 0.12);
pub const TEXT_FAILED: Color = Color::srgb(0.60, 0.08, 0.08);

pub const BUTTON_LABEL: &str = "Ping websocket";
pub const BUTTON_LABEL_BUSY: &str = "Pinging...";

pub fn button_node() -> Node {
    Node {
        margin: UiRect::all(Val::Px(10.0)),
        padding: UiRect::axes(Val::Px(16.0), Val::Px(8.0)),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        ..default()
    }
}

pub fn panel_node() -> Node {
    Node {
        display: Display::None,
        margin: UiRect::all(Val::Px(10.0)),
        padding: UiRect::all(Val::Px(10.0)),
        flex_direction: FlexDirection::Column,
        ..default()
    }
}

/// Background for the trigger button in its current state.
pub fn button_color(busy: bool, interaction: Interaction) -> Color {
    match (busy, interaction) {
        (true, _) => BUTTON_BUSY,
        (false, Interaction::Pressed) => BUTTON_PRESSED,
        (false, Interaction::Hovered) => BUTTON_HOVERED,
        (false, Interaction::None) => BUTTON_IDLE,
    }
}
