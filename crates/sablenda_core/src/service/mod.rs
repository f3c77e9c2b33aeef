//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the calendar's query API.
//! - Keep UI and CLI layers decoupled from storage details.

pub mod calendar_service;
