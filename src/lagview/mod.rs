//! Lag view: each stored record next to the delta `periods` rows ahead in
//! date order.
//!
//! Two independent computations, one in SQL and one in memory, which must
//! agree row for row. "Ahead" counts rows, not calendar
//! months: a missing period is bridged silently.

pub mod types;
pub mod frame;
pub mod format;
pub mod export;
mod storage;

pub use types::*;
pub use frame::{LagFrame, StoredRow};
pub use format::render_table;
pub use export::export_lag_view;

use crate::database::{Database, DbError};

/// Default look-ahead, in reporting periods
pub const DEFAULT_LAG_PERIODS: usize = 2;

/// A way of computing the lag view from the store
pub trait LagComputation {
    fn name(&self) -> &'static str;
    fn compute(&self, db: &Database) -> Result<LagView, DbError>;
}

/// `LEAD(Delta, n) OVER (ORDER BY Rep_dt)` evaluated by SQLite
#[derive(Debug, Clone, Copy)]
pub struct QueryLag {
    pub periods: usize,
}

impl LagComputation for QueryLag {
    fn name(&self) -> &'static str {
        "query"
    }

    fn compute(&self, db: &Database) -> Result<LagView, DbError> {
        Ok(LagView {
            periods: self.periods,
            rows: db.query_lag_rows(self.periods)?,
        })
    }
}

/// Unordered fetch, then sort, shift and re-sort in a [`LagFrame`]
#[derive(Debug, Clone, Copy)]
pub struct MemoryLag {
    pub periods: usize,
}

impl LagComputation for MemoryLag {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn compute(&self, db: &Database) -> Result<LagView, DbError> {
        let stored = db.fetch_stored_rows()?;
        let rows = LagFrame::from_rows(&stored)
            .with_lead(self.periods)
            .sorted_by_date()
            .into_rows();

        Ok(LagView {
            periods: self.periods,
            rows,
        })
    }
}

/// Entry point for reporting. Each call reads the store afresh; nothing is
/// cached or persisted.
#[derive(Debug, Clone)]
pub struct LagViewBuilder {
    db: Database,
    periods: usize,
}

impl LagViewBuilder {
    pub fn new(db: Database) -> Self {
        LagViewBuilder {
            db,
            periods: DEFAULT_LAG_PERIODS,
        }
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn compute_via_query(&self) -> Result<LagView, DbError> {
        QueryLag { periods: self.periods }.compute(&self.db)
    }

    pub fn compute_via_memory(&self) -> Result<LagView, DbError> {
        MemoryLag { periods: self.periods }.compute(&self.db)
    }

    /// Both computations, in a fixed order: query first, then memory.
    pub fn computations(&self) -> [Box<dyn LagComputation>; 2] {
        [
            Box::new(QueryLag { periods: self.periods }),
            Box::new(MemoryLag { periods: self.periods }),
        ]
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
