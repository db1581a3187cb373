//! Signal Bridge — mailbox push notifications to trading signal API.

pub mod config;
pub mod error;
pub mod forwarder;
pub mod mail;
pub mod pipeline;
pub mod webhook;
