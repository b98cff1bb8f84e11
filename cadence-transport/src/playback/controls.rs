//! Bounded scalar controls (volume, balance, rate)
//!
//! Each control owns its bounds and step. The controller never clamps on its
//! own; it asks the control.

use crate::config::TransportSettings;
use crate::error::{Error, Result};

/// Values are kept on a 1e-9 grid so repeated steps land on exact decimals
const GRID: f64 = 1e9;

/// A scalar with inclusive bounds and a step size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedControl {
    min: f64,
    max: f64,
    step: f64,
}

impl BoundedControl {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) || min >= max || step <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "invalid control bounds min={} max={} step={}",
                min, max, step
            )));
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Clamp an arbitrary value into bounds
    pub fn clamp(&self, value: f64) -> f64 {
        quantize(value.clamp(self.min, self.max))
    }

    /// One step up from `value`, never above `max`
    pub fn increment(&self, value: f64) -> f64 {
        self.clamp(value + self.step)
    }

    /// One step down from `value`, never below `min`
    pub fn decrement(&self, value: f64) -> f64 {
        self.clamp(value - self.step)
    }
}

fn quantize(value: f64) -> f64 {
    (value * GRID).round() / GRID
}

/// The set of controls a transport session uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportControls {
    pub volume: BoundedControl,
    pub balance: BoundedControl,
    pub rate: BoundedControl,
}

impl TransportControls {
    pub fn from_settings(settings: &TransportSettings) -> Result<Self> {
        Ok(Self {
            volume: BoundedControl::new(settings.volume_min, settings.volume_max, settings.volume_step)?,
            balance: BoundedControl::new(-1.0, 1.0, settings.balance_step)?,
            // Rate has no stepping commands; the step is unused
            rate: BoundedControl::new(settings.rate_min, settings.rate_max, 0.25)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_steps_land_on_exact_decimals() {
        let volume = BoundedControl::new(0.0, 1.0, 0.1).unwrap();
        let v = volume.increment(0.5);
        let v = volume.increment(v);
        assert_eq!(v, 0.7);
    }

    #[test]
    fn test_increment_never_exceeds_max() {
        let volume = BoundedControl::new(0.0, 1.0, 0.1).unwrap();
        let mut v = 0.95;
        for _ in 0..5 {
            v = volume.increment(v);
        }
        assert_eq!(v, 1.0);
    }

    #[test]
    fn test_decrement_never_below_min() {
        let balance = BoundedControl::new(-1.0, 1.0, 0.1).unwrap();
        let mut b = -0.85;
        for _ in 0..3 {
            b = balance.decrement(b);
        }
        assert_eq!(b, -1.0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(BoundedControl::new(1.0, 0.0, 0.1).is_err());
        assert!(BoundedControl::new(0.0, 1.0, 0.0).is_err());
        assert!(BoundedControl::new(0.0, f64::INFINITY, 0.1).is_err());
    }

    #[test]
    fn test_controls_from_default_settings() {
        let controls = TransportControls::from_settings(&TransportSettings::default()).unwrap();
        assert_eq!(controls.volume.max(), 1.0);
        assert_eq!(controls.balance.min(), -1.0);
        assert_eq!(controls.rate.clamp(10.0), 4.0);
        assert_eq!(controls.rate.clamp(0.01), 0.25);
    }
}
