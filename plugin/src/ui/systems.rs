use bevy::prelude::*;

use crate::ping::{ExchangeOutcome, PingClient, PingReportReceiver};
use crate::ui::style;
use crate::ui::types::*;

const PENDING_TEXT: &str = "Waiting for reply...";

pub const REPLY_CAPTION: &str = "Got response from websocket:";
pub const FAILED_CAPTION: &str = "Websocket ping failed:";
pub const PENDING_CAPTION: &str = "Pinging websocket...";

/// Build the button and result panel under the host element.
pub fn mount_ping_ui(
    mut commands: Commands,
    hosts: Query<Entity, With<PingUiHost>>,
    mut exit: MessageWriter<AppExit>,
) {
    let mut hosts = hosts.iter();
    let Some(host) = hosts.next() else {
        if cfg!(debug_assertions) {
            log::error!("No PingUiHost entity found; spawn one during Startup");
            exit.write(AppExit::error());
        } else {
            log::warn!("No PingUiHost entity found, ping UI not mounted");
        }
        return;
    };
    if hosts.next().is_some() {
        log::warn!("Several PingUiHost entities found, mounting into {:?}", host);
    }

    commands.entity(host).with_children(|parent| {
        parent
            .spawn((
                Button,
                PingButton,
                style::button_node(),
                BackgroundColor(style::BUTTON_IDLE),
            ))
            .with_children(|button| {
                button.spawn((
                    Text::new(style::BUTTON_LABEL),
                    TextColor(style::TEXT_LIGHT),
                    PingButtonLabel,
                ));
            });

        parent
            .spawn((
                PingResultPanel,
                style::panel_node(),
                BackgroundColor(style::PANEL_REPLY),
            ))
            .with_children(|panel| {
                panel.spawn((
                    Text::default(),
                    TextColor(style::TEXT_DARK),
                    PingResultCaption,
                ));
                panel.spawn((
                    Text::default(),
                    TextColor(style::TEXT_DARK),
                    PingResultText,
                ));
            });
    });

    log::info!("Mounted ping UI into {:?}", host);
}

/// Start an exchange when the button is pressed and nothing is in flight.
pub fn handle_ping_button(
    buttons: Query<&Interaction, (Changed<Interaction>, With<PingButton>)>,
    client: Res<PingClient>,
    settings: Res<PingSettings>,
    mut in_flight: ResMut<PingInFlight>,
    mut display: ResMut<PingDisplay>,
) {
    for interaction in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }

        if let Some(id) = in_flight.current() {
            log::debug!("[Ping {}] Still in flight, ignoring press", id);
            continue;
        }

        match settings.0.request() {
            Ok(request) => {
                let id = client.submit(request);
                in_flight.begin(id);
                *display = PingDisplay::Pending;
            }
            Err(e) => {
                log::error!("Cannot start ping: {}", e);
                *display = PingDisplay::Failed(e.to_string());
            }
        }
    }
}

/// Move finished exchanges into the display and release the in-flight guard.
pub fn collect_ping_reports(
    reports: Res<PingReportReceiver>,
    mut in_flight: ResMut<PingInFlight>,
    mut display: ResMut<PingDisplay>,
) {
    while let Some(report) = reports.try_recv() {
        if !in_flight.finish(report.id) {
            log::debug!("[Ping {}] Report for an exchange the UI no longer tracks", report.id);
            continue;
        }

        *display = match report.outcome {
            ExchangeOutcome::Reply(text) => {
                log::info!("[Ping {}] Reply received", report.id);
                PingDisplay::Reply(text)
            }
            ExchangeOutcome::Failed(e) => {
                log::error!("[Ping {}] Exchange failed: {}", report.id, e);
                PingDisplay::Failed(e.to_string())
            }
        };
    }
}

pub fn render_ping_display(
    display: Res<PingDisplay>,
    mut panels: Query<(&mut Node, &mut BackgroundColor), With<PingResultPanel>>,
    mut captions: Query<&mut Text, (With<PingResultCaption>, Without<PingResultText>)>,
    mut texts: Query<(&mut Text, &mut TextColor), With<PingResultText>>,
) {
    let (caption, background, foreground, content) = match &*display {
        PingDisplay::Empty => ("", style::PANEL_REPLY, style::TEXT_DARK, ""),
        PingDisplay::Pending => (
            PENDING_CAPTION,
            style::PANEL_PENDING,
            style::TEXT_DARK,
            PENDING_TEXT,
        ),
        PingDisplay::Reply(text) => (
            REPLY_CAPTION,
            style::PANEL_REPLY,
            style::TEXT_DARK,
            text.as_str(),
        ),
        PingDisplay::Failed(message) => (
            FAILED_CAPTION,
            style::PANEL_FAILED,
            style::TEXT_FAILED,
            message.as_str(),
        ),
    };
    let visible = *display != PingDisplay::Empty;

    for (mut node, mut color) in &mut panels {
        node.display = if visible { Display::Flex } else { Display::None };
        color.0 = background;
    }

    for mut text in &mut captions {
        **text = caption.to_string();
    }

    for (mut text, mut text_color) in &mut texts {
        **text = content.to_string();
        text_color.0 = foreground;
    }
}

/// Grey out the button and swap its label while an exchange runs.
pub fn render_ping_button(
    in_flight: Res<PingInFlight>,
    mut buttons: Query<(&Interaction, &mut BackgroundColor), With<PingButton>>,
    mut labels: Query<&mut Text, With<PingButtonLabel>>,
) {
    let busy = in_flight.is_busy();

    for (interaction, mut background) in &mut buttons {
        let color = style::button_color(busy, *interaction);
        if background.0 != color {
            background.0 = color;
        }
    }

    let label = if busy {
        style::BUTTON_LABEL_BUSY
    } else {
        style::BUTTON_LABEL
    };
    for mut text in &mut labels {
        if text.as_str() != label {
            **text = label.to_string();
        }
    }
}
