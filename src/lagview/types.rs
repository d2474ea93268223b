use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Absolute tolerance when comparing deltas from the two computation paths
pub const VALUE_TOLERANCE: f64 = 1e-9;

/// One row of the lag view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagRow {
    pub report_date: NaiveDate,
    pub delta: f64,
    /// Delta of the row `periods` positions ahead in date order
    pub delta_lag: Option<f64>,
}

impl LagRow {
    /// Same date and values within [`VALUE_TOLERANCE`]; `None` only equals `None`.
    pub fn matches(&self, other: &LagRow) -> bool {
        self.report_date == other.report_date
            && close(self.delta, other.delta)
            && match (self.delta_lag, other.delta_lag) {
                (Some(a), Some(b)) => close(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE
}

/// A computed lag view, ordered ascending by report date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LagView {
    pub periods: usize,
    pub rows: Vec<LagRow>,
}

impl LagView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lags(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.delta_lag).collect()
    }

    /// First row where the two views differ, if any.
    pub fn diff(&self, other: &LagView) -> Option<LagMismatch> {
        let longest = self.rows.len().max(other.rows.len());
        (0..longest).find_map(|index| {
            let left = self.rows.get(index).copied();
            let right = other.rows.get(index).copied();
            let same = match (&left, &right) {
                (Some(l), Some(r)) => l.matches(r),
                _ => false,
            };
            (!same).then_some(LagMismatch { index, left, right })
        })
    }
}

/// Where two lag views disagree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagMismatch {
    pub index: usize,
    pub left: Option<LagRow>,
    pub right: Option<LagRow>,
}

impl std::fmt::Display for LagMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {:?} vs {:?}", self.index, self.left, self.right)
    }
}
