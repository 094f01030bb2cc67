use bevy::prelude::*;

use crate::config::PingConfig;

/// Marker for the host element the ping UI mounts into.
///
/// Spawn exactly one entity with this component (and a `Node`) during `Startup`.
#[derive(Component, Default)]
pub struct PingUiHost;

/// The trigger button.
#[derive(Component)]
pub struct PingButton;

/// Text inside the trigger button.
#[derive(Component)]
pub struct PingButtonLabel;

/// Container shown once there is something to display.
#[derive(Component)]
pub struct PingResultPanel;

/// Line above the result text saying what it is.
#[derive(Component)]
pub struct PingResultCaption;

/// Text inside the result panel.
#[derive(Component)]
pub struct PingResultText;

/// Fixed endpoint and message used for every press.
#[derive(Resource, Clone, Debug)]
pub struct PingSettings(pub PingConfig);

/// What the result panel shows.
#[derive(Resource, Clone, Debug, Default, PartialEq, Eq)]
pub enum PingDisplay {
    /// Nothing has been requested yet.
    #[default]
    Empty,
    Pending,
    Reply(String),
    Failed(String),
}

/// At most one exchange is outstanding; this holds its id.
#[derive(Resource, Debug, Default)]
pub struct PingInFlight {
    current: Option<u64>,
}

impl PingInFlight {
    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<u64> {
        self.current
    }

    pub(crate) fn begin(&mut self, id: u64) {
        self.current = Some(id);
    }

    /// Release the guard if `id` is the outstanding exchange.
    pub(crate) fn finish(&mut self, id: u64) -> bool {
        if self.current == Some(id) {
            self.current = None;
            true
        } else {
            false
        }
    }
}
