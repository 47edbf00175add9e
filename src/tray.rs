// System tray integration using ksni (StatusNotifierItem over D-Bus)

use chrono::{DateTime, Local};
use ksni::menu::{MenuItem, StandardItem};
use ksni::TrayMethods;
use tokio::sync::mpsc::UnboundedSender;
use tunnelbar_core::presenter::{describe, render};
use tunnelbar_core::vpn::ConnectionStatus;

/// Menu actions delivered to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Copy the tunnel address to the clipboard
    CopyAddress,
    /// Put the status label back after a temporary one
    RestoreLabel,
    /// Disconnect and exit
    Quit,
}

pub struct StatusTray {
    status: ConnectionStatus,
    label: String,
    connected_since: Option<DateTime<Local>>,
    events: UnboundedSender<UiEvent>,
}

impl StatusTray {
    fn new(status: ConnectionStatus, events: UnboundedSender<UiEvent>) -> Self {
        Self {
            label: render(&status),
            status,
            connected_since: None,
            events,
        }
    }

    fn apply_status(&mut self, status: ConnectionStatus) {
        match (&self.status, &status) {
            (ConnectionStatus::Connected(_), ConnectionStatus::Connected(_)) => {}
            (_, ConnectionStatus::Connected(_)) => self.connected_since = Some(Local::now()),
            _ => self.connected_since = None,
        }
        self.label = render(&status);
        self.status = status;
    }

    fn send(&self, event: UiEvent) {
        // Only fails once the event loop is gone
        let _ = self.events.send(event);
    }
}

impl ksni::Tray for StatusTray {
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").into()
    }

    fn title(&self) -> String {
        self.label.clone()
    }

    fn icon_name(&self) -> String {
        match self.status {
            ConnectionStatus::Connected(_) => "network-vpn",
            ConnectionStatus::Connecting => "network-vpn-acquiring",
            ConnectionStatus::Disconnected | ConnectionStatus::Failed(_) => {
                "network-vpn-disconnected"
            }
        }
        .into()
    }

    fn category(&self) -> ksni::Category {
        ksni::Category::ApplicationStatus
    }

    fn status(&self) -> ksni::Status {
        if self.status.is_terminal() {
            ksni::Status::Passive
        } else {
            ksni::Status::Active
        }
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            title: self.label.clone(),
            description: describe(&self.status),
            ..Default::default()
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items: Vec<MenuItem<Self>> = vec![
            StandardItem {
                label: self.label.clone(),
                enabled: false,
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: describe(&self.status),
                enabled: false,
                ..Default::default()
            }
            .into(),
        ];

        if let Some(since) = self.connected_since {
            items.push(
                StandardItem {
                    label: format!("Since {}", since.format("%H:%M:%S")),
                    enabled: false,
                    ..Default::default()
                }
                .into(),
            );
        }

        items.extend([
            MenuItem::Separator,
            StandardItem {
                label: "Copy IP".into(),
                enabled: self.status.address().is_some(),
                activate: Box::new(|tray: &mut Self| tray.send(UiEvent::CopyAddress)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Disconnect".into(),
                activate: Box::new(|tray: &mut Self| tray.send(UiEvent::Quit)),
                ..Default::default()
            }
            .into(),
        ]);

        items
    }
}

/// Handle to the registered tray, or nothing when running headless
pub struct Tray {
    handle: Option<ksni::Handle<StatusTray>>,
}

impl Tray {
    /// Register the tray icon
    ///
    /// Without a StatusNotifierItem host the application keeps running
    /// headless.
    pub async fn spawn(status: ConnectionStatus, events: UnboundedSender<UiEvent>) -> Self {
        match StatusTray::new(status, events).spawn().await {
            Ok(handle) => Self {
                handle: Some(handle),
            },
            Err(e) => {
                tracing::warn!(
                    "System tray unavailable ({}); running without a menu bar icon, press Ctrl+C to disconnect",
                    e
                );
                Self { handle: None }
            }
        }
    }

    /// Show a new connection status
    pub async fn show_status(&self, status: ConnectionStatus) {
        if let Some(handle) = &self.handle {
            handle.update(|tray| tray.apply_status(status)).await;
        }
    }

    /// Replace the label without changing the status
    pub async fn show_label(&self, label: String) {
        if let Some(handle) = &self.handle {
            handle.update(|tray| tray.label = label).await;
        }
    }
}
