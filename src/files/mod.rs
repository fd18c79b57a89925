//! File naming for skim outputs.

pub mod naming;
