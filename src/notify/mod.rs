use async_trait::async_trait;

use crate::magnitude::Magnitude;

pub mod fcm;

/// Payload handed to the notification publisher for one alert.
///
/// `magnitude` is `None` when no magnitude was computed (the sample window
/// was empty when the alert line arrived); the body template omits the
/// magnitude line in that case.
#[derive(Debug, Clone)]
pub struct AlertNotification {
    pub magnitude: Option<Magnitude>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(
        &self,
        notification: &AlertNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Render the notification body from the fixed template.
pub fn render_body(magnitude: Option<Magnitude>) -> String {
    let mag_text = match magnitude {
        Some(m) => format!("⚠ Magnitude: {} on Richter scale ⚠", m),
        None => String::new(),
    };
    format!("{}\n Follow these instructions:", mag_text)
}
