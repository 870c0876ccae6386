//! Shared wire and domain types for the BizMate backend.

pub mod api;
pub mod models;
