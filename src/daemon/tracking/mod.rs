//! Turns tab focus into attributed time. [tracker::TimeTracker] holds the active set and the
//! periodic tick, [auto_pause::AutoPause] decides when a gap means the user was away.

pub mod auto_pause;
pub mod domain;
pub mod tracker;
