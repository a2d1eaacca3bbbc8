//! Check schema, submission and review model for background-verification cases.
//!
//! The crate is organised leaves first: `checks` describes check types and how
//! their forms are laid out, `intake` accumulates admin and candidate input into
//! backend payloads, `review` reconciles stored checks and documents for admin
//! review, and `cases` composes everything behind a service and HTTP router.

pub mod backend;
pub mod cases;
pub mod checks;
pub mod config;
pub mod error;
pub mod intake;
pub mod review;
pub mod telemetry;
