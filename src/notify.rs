use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
}

/// Destination for countdown notifications.
pub trait NotificationSink: Send + Sync {
    fn push(&self, notice: Notice);
}

/// Delivers notices as desktop notifications.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn push(&self, notice: Notice) {
        let mut notification = notify_rust::Notification::new();
        notification
            .summary(&notice.title)
            .body(&notice.body)
            .appname("ttimer");

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(match notice.urgency {
            Urgency::Critical => notify_rust::Urgency::Critical,
        });

        #[cfg(target_os = "macos")]
        if notice.urgency == Urgency::Critical {
            notification.sound_name("Glass");
        }

        match notification.show() {
            Ok(_) => debug!(body = %notice.body, "notification sent"),
            Err(e) => warn!("failed to send notification: {e}"),
        }
    }
}
