//!  Storage is organized through [key_value::KeyValueStore] and [statistics::StatisticsStore].
//!  The basic idea is:
//!   - Every key holds one json document, always replaced as a whole.
//!   - Statistics live in the local scope, settings in the synced scope.
//!   - Lifetime totals and per-day totals are separate documents.

pub mod entities;
pub mod key_value;
pub mod statistics;
