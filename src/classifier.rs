use std::collections::VecDeque;

use crate::magnitude::Magnitude;

/// Most-recent vibration readings kept for magnitude estimation.
pub const WINDOW_CAPACITY: usize = 5;

const ALERT_MARKER_COMMA: &str = "ALERT,ALERT,ALERT";
const ALERT_MARKER_SPACE: &str = "ALERT ALERT ALERT";

/// Result of decoding one trimmed, non-empty line.
///
/// The sensor node speaks an ad hoc framing convention over the line
/// transport: a triple-repeated alert marker, a three-field numeric reading,
/// or free-form status text. Decoding is pure; buffer effects happen in
/// [`LineClassifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Alert,
    Reading { vibration: f64, tilt: f64, piezo: f64 },
    Other,
}

/// Decode one trimmed line into its protocol variant.
///
/// The comma-joined marker is checked before the space-joined one; either
/// triggers. A reading requires exactly 3 comma-separated tokens, every one
/// parsing as a number (tokens are whitespace-trimmed first, NaN does not
/// count) - any failure demotes the whole line to `Other`.
pub fn decode_line(line: &str) -> Decoded {
    if line.contains(ALERT_MARKER_COMMA) || line.contains(ALERT_MARKER_SPACE) {
        return Decoded::Alert;
    }

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() == 3 {
        let values: Option<Vec<f64>> = parts
            .iter()
            .map(|t| t.trim().parse::<f64>().ok().filter(|v| !v.is_nan()))
            .collect();
        if let Some(values) = values {
            return Decoded::Reading {
                vibration: values[0],
                tilt: values[1],
                piezo: values[2],
            };
        }
    }

    Decoded::Other
}

/// Bounded FIFO of the most recent vibration values.
///
/// Holds at most [`WINDOW_CAPACITY`] samples; the oldest is evicted first.
/// Cleared to empty after every alert.
#[derive(Debug, Default)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
}

impl SampleWindow {
    pub fn push(&mut self, vibration: f64) {
        self.samples.push_back(vibration);
        if self.samples.len() > WINDOW_CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Classified event emitted to the fan-out coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// `samples_used` records how many window samples backed the estimate,
    /// so consumers can tell "no magnitude was computed" apart from a low
    /// estimate without overloading the magnitude value.
    Alert {
        magnitude: Magnitude,
        samples_used: usize,
    },
    Reading {
        vibration: f64,
        tilt: f64,
        piezo: f64,
    },
    Message(String),
}

/// Consumes raw lines one at a time, in strict arrival order, and maps each
/// to at most one [`LineEvent`].
///
/// Owns the sample window exclusively; no other component reads or writes
/// it. Malformed lines are never an error - anything that is not an alert
/// marker or a well-formed reading passes through verbatim as a message.
#[derive(Debug, Default)]
pub struct LineClassifier {
    window: SampleWindow,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, raw: &str) -> Option<LineEvent> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        match decode_line(line) {
            Decoded::Alert => {
                let snapshot = self.window.snapshot();
                let magnitude = Magnitude::from_samples(&snapshot);
                self.window.clear();
                Some(LineEvent::Alert {
                    magnitude,
                    samples_used: snapshot.len(),
                })
            }
            Decoded::Reading {
                vibration,
                tilt,
                piezo,
            } => {
                self.window.push(vibration);
                Some(LineEvent::Reading {
                    vibration,
                    tilt,
                    piezo,
                })
            }
            Decoded::Other => Some(LineEvent::Message(line.to_string())),
        }
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_reading_line() {
        let mut c = LineClassifier::new();
        let event = c.classify("12.3,4.5,6.7").unwrap();
        assert_eq!(
            event,
            LineEvent::Reading {
                vibration: 12.3,
                tilt: 4.5,
                piezo: 6.7
            }
        );
        assert_eq!(c.window().snapshot(), vec![12.3]);
    }

    #[test]
    fn test_reading_tokens_may_carry_spaces() {
        let mut c = LineClassifier::new();
        let event = c.classify("12.3, 4.5, 6.7").unwrap();
        assert!(matches!(event, LineEvent::Reading { .. }));
    }

    #[test]
    fn test_alert_after_five_readings() {
        let mut c = LineClassifier::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            c.classify(&format!("{},0.1,0.2", v));
        }
        let event = c.classify("ALERT,ALERT,ALERT").unwrap();
        match event {
            LineEvent::Alert {
                magnitude,
                samples_used,
            } => {
                // mean 3.0 estimates to 4.86
                assert_eq!(magnitude.to_string(), "4.86");
                assert_eq!(samples_used, 5);
            }
            other => panic!("expected alert, got {:?}", other),
        }
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_space_joined_alert_marker() {
        let mut c = LineClassifier::new();
        c.classify("2.0,0.0,0.0");
        let event = c.classify("ALERT ALERT ALERT").unwrap();
        assert!(matches!(event, LineEvent::Alert { samples_used: 1, .. }));
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_alert_marker_as_substring_still_triggers() {
        let mut c = LineClassifier::new();
        let event = c.classify(">> ALERT,ALERT,ALERT <<").unwrap();
        assert!(matches!(event, LineEvent::Alert { .. }));
    }

    #[test]
    fn test_alert_on_empty_window() {
        let mut c = LineClassifier::new();
        let event = c.classify("ALERT,ALERT,ALERT").unwrap();
        match event {
            LineEvent::Alert {
                magnitude,
                samples_used,
            } => {
                assert_eq!(magnitude.to_string(), "0.00");
                assert_eq!(samples_used, 0);
            }
            other => panic!("expected alert, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_tokens_fall_through() {
        let mut c = LineClassifier::new();
        let event = c.classify("foo,bar,baz").unwrap();
        assert_eq!(event, LineEvent::Message("foo,bar,baz".to_string()));
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_field_count_mismatch_falls_through() {
        let mut c = LineClassifier::new();
        assert_eq!(
            c.classify("1,2").unwrap(),
            LineEvent::Message("1,2".to_string())
        );
        assert_eq!(
            c.classify("1,2,3,4").unwrap(),
            LineEvent::Message("1,2,3,4".to_string())
        );
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_one_bad_token_disqualifies_the_line() {
        let mut c = LineClassifier::new();
        let event = c.classify("1.0,abc,3.0").unwrap();
        assert!(matches!(event, LineEvent::Message(_)));
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_empty_and_whitespace_lines_emit_nothing() {
        let mut c = LineClassifier::new();
        assert!(c.classify("").is_none());
        assert!(c.classify("   \t ").is_none());
        assert!(c.window().is_empty());
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut c = LineClassifier::new();
        for n in 1..=12u32 {
            c.classify(&format!("{},0.0,0.0", n));
            assert_eq!(c.window().len(), (n as usize).min(WINDOW_CAPACITY));
        }
        // Last five vibrations, in arrival order.
        assert_eq!(c.window().snapshot(), vec![8.0, 9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_classification_is_total_and_exclusive() {
        let lines = [
            "",
            "  ",
            "ALERT,ALERT,ALERT",
            "ALERT ALERT ALERT",
            "1.0,2.0,3.0",
            "boot: imu ready",
            "1,2",
            "nan,1,2",
        ];
        let mut c = LineClassifier::new();
        for line in lines {
            let event = c.classify(line);
            match (line.trim().is_empty(), event) {
                (true, None) => {}
                (false, Some(_)) => {}
                (empty, ev) => panic!("line {:?}: empty={} event={:?}", line, empty, ev),
            }
        }
    }

    #[test]
    fn test_nan_token_is_not_a_number() {
        assert_eq!(decode_line("NaN,1.0,2.0"), Decoded::Other);
    }
}
