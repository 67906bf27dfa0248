#![allow(
    clippy::upper_case_acronyms,
    non_camel_case_types,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::too_many_lines,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

pub mod cache;
pub mod config;
pub mod experiment;
pub mod hierarchy;
pub mod mshr;
pub mod report;
pub mod tag_array;
pub mod trace;

#[cfg(test)]
pub mod testing;

pub use experiment::{simulate, Row, Runner};
pub use hierarchy::{Hierarchy, Level};

pub type address = u64;
