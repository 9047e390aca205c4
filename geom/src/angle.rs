use std::{f64, fmt};

use serde::{Deserialize, Serialize};

/// A compass bearing, stored in radians clockwise from north and normalized to (-pi, pi].
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn radians(rads: f64) -> Angle {
        if !rads.is_finite() {
            panic!("Bad Angle {}", rads);
        }
        Angle(normalize_radians(rads))
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle::radians(degs.to_radians())
    }

    /// The reverse bearing, still normalized to (-pi, pi].
    pub fn opposite(self) -> Angle {
        Angle::radians(self.0 + f64::consts::PI)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle::radians(self.0 + degrees.to_radians())
    }

    pub fn inner_radians(self) -> f64 {
        self.0
    }

    /// Compass degrees in [0, 360): 0 is north, 90 east, 180 south, 270 west.
    pub fn normalized_degrees(self) -> f64 {
        let degs = self.0.to_degrees();
        if degs < 0.0 {
            degs + 360.0
        } else {
            degs
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

fn normalize_radians(rads: f64) -> f64 {
    let tau = 2.0 * f64::consts::PI;
    let mut r = rads % tau;
    if r <= -f64::consts::PI {
        r += tau;
    } else if r > f64::consts::PI {
        r -= tau;
    }
    r
}
