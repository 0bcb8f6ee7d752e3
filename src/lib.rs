//! Seat reservation service backed by a job queue.
//!
//! Reservations are queued as `reserve_seat` jobs and applied one at a time
//! to a shared seat counter; push notifications run on a two-worker pool;
//! a control channel listener reacts to a remote shutdown message.

pub mod config;
pub mod dto;
pub mod handlers;
pub mod interceptors;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod services;
pub mod utils;
