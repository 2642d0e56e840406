//! Email auto-responder core: turns an inbound message into an HTML reply payload with
//! attachments, using priority-ordered chat models for the text and closed label sets for
//! the attachments. Shared by the CLI and its gateway.

pub mod assets;
pub mod cache;
pub mod classify;
pub mod config;
pub mod gateway;
pub mod image;
pub mod init;
pub mod llm;
pub mod pipeline;
pub mod policy;
pub mod reply;
pub mod text;
