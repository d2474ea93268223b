//! Columnar in-memory table used by the memory-side lag computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::LagRow;

/// A row as stored, with its surrogate id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: i64,
    pub report_date: NaiveDate,
    pub delta: f64,
}

/// Column-oriented working copy of the store. Row positions keep the fetch
/// order until [`LagFrame::sorted_by_date`] is called.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagFrame {
    ids: Vec<i64>,
    dates: Vec<NaiveDate>,
    deltas: Vec<f64>,
    lags: Vec<Option<f64>>,
}

impl LagFrame {
    pub fn from_rows(rows: &[StoredRow]) -> Self {
        LagFrame {
            ids: rows.iter().map(|r| r.id).collect(),
            dates: rows.iter().map(|r| r.report_date).collect(),
            deltas: rows.iter().map(|r| r.delta).collect(),
            lags: vec![None; rows.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn lags(&self) -> &[Option<f64>] {
        &self.lags
    }

    /// Row positions ordered by (date, id)
    pub fn date_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&pos| (self.dates[pos], self.ids[pos]));
        order
    }

    /// Fill the lag column: each row receives the delta `periods` ranks ahead
    /// in date order, written back at the row's own position.
    pub fn with_lead(mut self, periods: usize) -> Self {
        let order = self.date_order();
        let mut lags = vec![None; self.len()];

        for (rank, &pos) in order.iter().enumerate() {
            lags[pos] = rank
                .checked_add(periods)
                .and_then(|ahead| order.get(ahead))
                .map(|&ahead| self.deltas[ahead]);
        }

        self.lags = lags;
        self
    }

    /// Reorder every column ascending by (date, id)
    pub fn sorted_by_date(self) -> Self {
        let order = self.date_order();
        LagFrame {
            ids: order.iter().map(|&p| self.ids[p]).collect(),
            dates: order.iter().map(|&p| self.dates[p]).collect(),
            deltas: order.iter().map(|&p| self.deltas[p]).collect(),
            lags: order.iter().map(|&p| self.lags[p]).collect(),
        }
    }

    pub fn into_rows(self) -> Vec<LagRow> {
        self.dates
            .into_iter()
            .zip(self.deltas)
            .zip(self.lags)
            .map(|((report_date, delta), delta_lag)| LagRow {
                report_date,
                delta,
                delta_lag,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: i64, month: u32, delta: f64) -> StoredRow {
        StoredRow {
            id,
            report_date: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            delta,
        }
    }

    #[test]
    fn test_lead_aligns_to_original_positions() {
        // Fetched out of date order: Mar, Jan, Apr, Feb
        let frame = LagFrame::from_rows(&[
            stored(3, 3, 30.0),
            stored(1, 1, 10.0),
            stored(4, 4, 40.0),
            stored(2, 2, 20.0),
        ])
        .with_lead(2);

        assert_eq!(frame.lags(), &[None, Some(30.0), None, Some(40.0)]);
    }

    #[test]
    fn test_sorted_rows() {
        let rows = LagFrame::from_rows(&[
            stored(3, 3, 30.0),
            stored(1, 1, 10.0),
            stored(4, 4, 40.0),
            stored(2, 2, 20.0),
        ])
        .with_lead(2)
        .sorted_by_date()
        .into_rows();

        let deltas: Vec<f64> = rows.iter().map(|r| r.delta).collect();
        let lags: Vec<Option<f64>> = rows.iter().map(|r| r.delta_lag).collect();
        assert_eq!(deltas, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(lags, vec![Some(30.0), Some(40.0), None, None]);
    }

    #[test]
    fn test_short_frames_have_no_lag() {
        let frame = LagFrame::from_rows(&[stored(1, 1, 1.0), stored(2, 2, 2.0)]).with_lead(2);
        assert_eq!(frame.lags(), &[None, None]);

        let empty = LagFrame::from_rows(&[]).with_lead(2).sorted_by_date();
        assert!(empty.is_empty());
        assert!(empty.into_rows().is_empty());
    }

    #[test]
    fn test_equal_dates_ordered_by_id() {
        let frame = LagFrame::from_rows(&[stored(9, 1, 9.0), stored(2, 1, 2.0), stored(5, 2, 5.0)]);
        assert_eq!(frame.date_order(), vec![1, 0, 2]);
    }

    #[test]
    fn test_huge_offset_leaves_every_lag_empty() {
        let frame = LagFrame::from_rows(&[stored(1, 1, 1.0), stored(2, 2, 2.0), stored(3, 3, 3.0)])
            .with_lead(usize::MAX);
        assert_eq!(frame.lags(), &[None, None, None]);
    }

    #[test]
    fn test_zero_periods_copies_delta() {
        let rows = LagFrame::from_rows(&[stored(1, 1, 1.5), stored(2, 2, 2.5)])
            .with_lead(0)
            .into_rows();
        assert_eq!(rows[0].delta_lag, Some(1.5));
        assert_eq!(rows[1].delta_lag, Some(2.5));
    }
}
