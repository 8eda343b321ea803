#![forbid(unsafe_code)]

//! systemd ask-password agent engine.
//!
//! Implements the PasswordAgent protocol described at
//! <https://systemd.io/PASSWORD_AGENTS/>: pending requests appear as
//! `ask.*` files under a watched directory, and answers are written to the
//! datagram socket named inside each request. This crate wires request
//! discovery, passphrase retrieval, and reply delivery into one watch loop
//! with unbounded per-request fan-out.

pub mod reply;
pub mod request;
pub mod retrieve;
pub mod server;

pub use reply::send_passphrase;
pub use request::{cryptsetup_id, parse_request};
pub use retrieve::get_passphrase;
pub use server::{process_request, AgentServer, OutcomeSender};
