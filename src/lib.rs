//! due-sort: keeps task board lists in step with card due dates.

pub mod board;
pub mod config;
pub mod error;
pub mod sync;
