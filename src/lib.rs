//! Formgate - fixed-window rate limiting for website forms and APIs
//!
//! This crate implements an in-memory, per-client request limiter with named
//! policies for the endpoints a marketing site exposes (contact form, quote
//! requests, newsletter signup, search and so on), an axum middleware that
//! applies them, and a small HTTP decision API.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
