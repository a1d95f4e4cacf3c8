//! Search objective

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "min")]
    Minimize,
    #[serde(alias = "max")]
    Maximize,
}

/// Metric name plus direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub direction: Direction,
}

impl Objective {
    pub fn minimize(name: impl Into<String>) -> Self {
        Self { name: name.into(), direction: Direction::Minimize }
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self { name: name.into(), direction: Direction::Maximize }
    }

    /// Is `a` strictly better than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Orders scores best first; NaN sorts last
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.direction {
                Direction::Minimize => a.total_cmp(&b),
                Direction::Maximize => b.total_cmp(&a),
            },
        }
    }

    /// Score as a quantity to minimize
    pub fn as_loss(&self, score: f64) -> f64 {
        match self.direction {
            Direction::Minimize => score,
            Direction::Maximize => -score,
        }
    }

    /// Best value of a per-epoch metric series
    pub fn best_of(&self, series: &[f64]) -> Option<f64> {
        series.iter().copied().filter(|v| !v.is_nan()).min_by(|a, b| self.compare(*a, *b))
    }
}

impl Default for Objective {
    fn default() -> Self {
        Self::minimize("root_mean_squared_error")
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Minimize => "min",
            Direction::Maximize => "max",
        };
        write!(f, "{} ({dir})", self.name)
    }
}
