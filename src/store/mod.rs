//! Data-access layer over the legacy SRTN schema.
//!
//! - `elements` — reads and column writes on the equipment table
//! - `spectra`  — acceleration sets, plots, and point series

pub mod elements;
pub mod spectra;
