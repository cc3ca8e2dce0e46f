//! Command handlers

pub mod bib;
pub mod cite;
pub mod config;
pub mod library;
