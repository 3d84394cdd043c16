use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Piecewise-linear response curve over normalized time.
///
/// Keys are `[time, value]` pairs sorted by time. Sampling before the first
/// key or after the last one holds the end value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct ResponseCurve {
    keys: Vec<[f32; 2]>,
}

impl ResponseCurve {
    pub fn new(keys: Vec<[f32; 2]>) -> Self {
        Self { keys }
    }

    /// The identity ramp from (0, 0) to (1, 1).
    pub fn linear() -> Self {
        Self::new(vec![[0.0, 0.0], [1.0, 1.0]])
    }

    /// A curve that evaluates to `value` everywhere.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![[0.0, value]])
    }

    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    pub fn validate(&self, name: &'static str) -> Result<(), SetupError> {
        if self.keys.is_empty() {
            return Err(SetupError::EmptyCurve(name));
        }
        if self.keys.windows(2).any(|pair| pair[1][0] < pair[0][0]) {
            return Err(SetupError::UnsortedCurve(name));
        }
        Ok(())
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if t <= first[0] {
            return first[1];
        }
        if t >= last[0] {
            return last[1];
        }

        for pair in self.keys.windows(2) {
            let [t0, v0] = pair[0];
            let [t1, v1] = pair[1];
            if t <= t1 {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * ((t - t0) / span);
            }
        }
        last[1]
    }
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::linear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_interpolates_and_holds_ends() {
        let curve = ResponseCurve::linear();
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(0.25), 0.25);
        assert_eq!(curve.evaluate(2.0), 1.0);
    }

    #[test]
    fn multi_key_curve_picks_the_right_segment() {
        let curve = ResponseCurve::new(vec![[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]]);
        assert!((curve.evaluate(0.25) - 0.5).abs() < 1e-6);
        assert!((curve.evaluate(0.5) - 1.0).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn single_key_curve_is_constant() {
        let curve = ResponseCurve::constant(0.3);
        assert_eq!(curve.evaluate(0.0), 0.3);
        assert_eq!(curve.evaluate(0.9), 0.3);
    }

    #[test]
    fn validation_rejects_empty_and_unsorted_keys() {
        assert!(matches!(
            ResponseCurve::new(Vec::new()).validate("charge"),
            Err(SetupError::EmptyCurve("charge"))
        ));
        assert!(matches!(
            ResponseCurve::new(vec![[0.6, 0.0], [0.2, 1.0]]).validate("bonus"),
            Err(SetupError::UnsortedCurve("bonus"))
        ));
        assert!(ResponseCurve::linear().validate("charge").is_ok());
    }
}
