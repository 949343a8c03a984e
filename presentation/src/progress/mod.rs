//! Live rendering of session progress

pub mod reporter;
