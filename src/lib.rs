//! Arogya Assist: a health chat assistant with guided service search,
//! insurance recommendations and booking wizards.

pub mod advisory;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod profile;
pub mod render;
pub mod schedule;
pub mod server;
pub mod session;
pub mod wizard;
