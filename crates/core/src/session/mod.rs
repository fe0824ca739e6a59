//! Session lifecycle ports and rules

pub mod outcome;
pub mod ports;
pub mod schedule;
