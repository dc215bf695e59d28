//! Row-store callback contract.
//!
//! The host engine owns the row store. For every projected row the connector
//! calls [`RowSink::add_row`], handing over ownership of the row; the return
//! value tells the pagination loop whether to keep going. Abort is a normal
//! early termination, not an error, and is honored per record, mid-page.

use crate::domain::Row;

/// Continue-or-abort signal returned by the row store for each added row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Keep emitting rows.
    Continue,
    /// Stop immediately; no further rows are emitted and no further pages
    /// are requested.
    Abort,
}

/// Destination for projected rows.
///
/// Implemented by the host's row store. Any `FnMut(Row) -> ControlSignal`
/// closure also implements this trait, which is the convenient form in
/// tests and simple callers.
pub trait RowSink: Send {
    /// Adds one row to the store and signals whether to continue.
    fn add_row(&mut self, row: Row) -> ControlSignal;
}

impl<F> RowSink for F
where
    F: FnMut(Row) -> ControlSignal + Send,
{
    fn add_row(&mut self, row: Row) -> ControlSignal {
        self(row)
    }
}
