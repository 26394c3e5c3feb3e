use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A percentage rounded to one decimal place.
///
/// Stored as exact tenths of a percent so that equal inputs always produce
/// equal output, and so retention and churn always sum to 100.0.
/// Rounding is half away from zero (`12.25` becomes `12.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent {
    tenths: u16,
}

const FULL_TENTHS: u16 = 1000;

impl Percent {
    pub const ZERO: Percent = Percent { tenths: 0 };
    pub const HUNDRED: Percent = Percent { tenths: FULL_TENTHS };

    /// `part / whole * 100`, rounded to one decimal.
    ///
    /// Returns `None` when `whole` is zero. `part` is clamped to `whole`.
    pub fn from_ratio(part: usize, whole: usize) -> Option<Self> {
        if whole == 0 {
            return None;
        }
        let part = part.min(whole) as u128;
        let whole = whole as u128;
        // round(part * 1000 / whole), half away from zero, in integers
        let tenths = (2 * part * FULL_TENTHS as u128 + whole) / (2 * whole);
        Some(Percent {
            tenths: tenths as u16,
        })
    }

    pub fn from_tenths(tenths: u16) -> Self {
        Percent {
            tenths: tenths.min(FULL_TENTHS),
        }
    }

    pub fn tenths(&self) -> u16 {
        self.tenths
    }

    pub fn value(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    /// `100 - self`, used to turn retention into churn.
    pub fn complement(&self) -> Self {
        Percent {
            tenths: FULL_TENTHS - self.tenths,
        }
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !(0.0..=100.0).contains(&value) {
            return Err(serde::de::Error::custom(format!(
                "percentage out of range: {}",
                value
            )));
        }
        Ok(Percent::from_tenths((value * 10.0).round() as u16))
    }
}
