//! L1/L2 weight and activity penalties

use serde::{Deserialize, Serialize};

/// `l1 * Σ|x| + l2 * Σx²`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct L1L2 {
    pub l1: f32,
    pub l2: f32,
}

impl L1L2 {
    pub fn new(l1: f32, l2: f32) -> Self {
        Self { l1, l2 }
    }

    /// Both coefficients zero
    pub fn is_zero(&self) -> bool {
        self.l1 == 0.0 && self.l2 == 0.0
    }

    pub fn penalty<'a>(&self, values: impl IntoIterator<Item = &'a f32>) -> f32 {
        values.into_iter().map(|x| self.l1 * x.abs() + self.l2 * x * x).sum()
    }

    /// d penalty / dx
    pub fn gradient(&self, x: f32) -> f32 {
        let sign = if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        };
        self.l1 * sign + 2.0 * self.l2 * x
    }
}
