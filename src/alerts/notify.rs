use crate::alerts::Alert;
use anyhow::Result;
use log::info;

/// Outbound notification transport (mail, chat, paging...)
///
pub trait Notifier: Send + 'static {
    fn send(&mut self, subject: &str, body: &str) -> Result<()>;
}

/// Notifier that drops everything
///
#[derive(Default, Clone, Debug)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send(&mut self, _subject: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Notifier that writes notifications to the log
///
#[derive(Default, Clone, Debug)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&mut self, subject: &str, body: &str) -> Result<()> {
        info!("{}: {}", subject, body);
        Ok(())
    }
}

/// Notification body for the alert
///
pub fn format_body(alert: &Alert) -> String {
    format!(
        "Alert Notification\n==================\n\nTime: {}\nCamera: {}\n\n{}\n\n---\nThis is an automated alert from the surveillance system.\n",
        alert.created_at().format("%Y-%m-%d %H:%M:%S"),
        alert.camera_id(),
        alert.description()
    )
}

#[cfg(test)]
mod tests {
    use crate::alerts::notify::{format_body, LogNotifier, Notifier};
    use crate::alerts::Alert;

    #[test]
    fn body_contains_description() {
        let a = Alert::restricted_zone("CAM_01", 7, "No Entry");
        let body = format_body(&a);
        assert!(body.starts_with("Alert Notification"));
        assert!(body.contains("Restricted Zone Violation (No Entry) - Track 7"));
        assert!(body.contains("Camera: CAM_01"));
    }

    #[test]
    fn log_notifier() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert!(LogNotifier.send("subject", "body").is_ok());
    }
}
