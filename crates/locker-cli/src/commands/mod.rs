//! Command handlers

pub mod backup;
pub mod bookmark;
pub mod collection;
pub mod config;
pub mod status;
pub mod tag;
