use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Standard gravity, used to normalize raw accelerometer output into g.
const STANDARD_GRAVITY: f64 = 9.81;

/// Shift applied before the logarithm so that an all-zero window stays in
/// the function's domain.
const LOG_EPSILON: f64 = 1e-6;

/// Empirical severity estimate derived from recent vibration samples.
///
/// Formula:
/// ```text
/// g   = mean(samples) / 9.81
/// M   = 3 + (log10(g + 1e-6) + 3) * 0.75
/// ```
///
/// The band map places typical readings in a 3-6 range; this is not a
/// calibrated physical Richter value. The external representation is always
/// the fixed-point two-decimal string (`"0.00"` for an empty window,
/// `"4.86"` etc. otherwise), both in `Display` and in serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Magnitude(f64);

impl Magnitude {
    /// Estimate a magnitude from an ordered window of vibration samples.
    ///
    /// Pure and deterministic: identical input always yields the identical
    /// formatted value. An empty window estimates to zero.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Magnitude(0.0);
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let g = mean / STANDARD_GRAVITY;
        let log = (g + LOG_EPSILON).log10();
        Magnitude(3.0 + (log + 3.0) * 0.75)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Magnitude {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Magnitude {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MagnitudeVisitor;

        impl Visitor<'_> for MagnitudeVisitor {
            type Value = Magnitude;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a magnitude string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Magnitude, E> {
                v.parse::<f64>().map(Magnitude).map_err(de::Error::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Magnitude, E> {
                Ok(Magnitude(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Magnitude, E> {
                Ok(Magnitude(v as f64))
            }
        }

        deserializer.deserialize_any(MagnitudeVisitor)
    }
}
