//! Gateway: the HTTP surface the mail-sending script talks to.
//!
//! `GET /` is a health check; `POST /webhook` takes `{from, subject, body}` and answers with the
//! reply payload. Every accepted request gets HTTP 200; degraded content signals failures.

mod server;

pub use server::{router, run_gateway, GatewayState, WEBHOOK_SECRET_HEADER};
