use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::classifier::{LineClassifier, LineEvent};
use crate::notify::{AlertNotification, Notifier};
use crate::web::stream::WebState;

/// Fan-out coordinator: classifies each line and distributes the resulting
/// event to the dashboard channel and, for alerts, the notification
/// publisher.
pub struct Dispatcher {
    classifier: LineClassifier,
    web: WebState,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(web: WebState, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            classifier: LineClassifier::new(),
            web,
            notifier,
        }
    }

    /// Handle one raw line. The dashboard publish always happens first and
    /// unconditionally; the notification send is spawned so a slow or
    /// failing publisher never blocks intake of the next line.
    pub fn handle_line(&mut self, raw: &str) {
        let Some(event) = self.classifier.classify(raw) else {
            return;
        };

        match event {
            LineEvent::Reading {
                vibration,
                tilt,
                piezo,
            } => {
                debug!("Reading: vibration={} tilt={} piezo={}", vibration, tilt, piezo);
                self.web.broadcast_sensor_data(vibration, tilt, piezo);
            }
            LineEvent::Alert {
                magnitude,
                samples_used,
            } => {
                info!("ALERT detected, estimated magnitude {}", magnitude);
                self.web.broadcast_alert(magnitude);
                self.web.record_alert(magnitude, samples_used);

                if let Some(notifier) = &self.notifier {
                    let notifier = notifier.clone();
                    let notification = AlertNotification {
                        magnitude: (samples_used > 0).then_some(magnitude),
                    };
                    tokio::spawn(async move {
                        if let Err(e) = notifier.send_alert(&notification).await {
                            warn!("Failed to send alert notification: {}", e);
                        }
                    });
                }
            }
            LineEvent::Message(text) => {
                info!("System message: {}", text);
                self.web.broadcast_system_message(text);
            }
        }
    }
}

/// Drive the dispatcher from the intake channel: strictly one line at a
/// time, in arrival order, until the channel closes.
pub async fn run_pipeline(mut rx: mpsc::Receiver<String>, mut dispatcher: Dispatcher) {
    info!("Pipeline started");
    while let Some(line) = rx.recv().await {
        dispatcher.handle_line(&line);
    }
    info!("Pipeline input closed, exiting");
}
