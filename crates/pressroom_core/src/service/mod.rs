//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls, the settings cache and the event bus into
//!   use-case level APIs.
//! - Keep storage details away from helpers, serializers and boot code.

pub mod labs;
pub mod members_service;
pub mod settings_service;
