//! Client-side synchronisation for online Connect 4 matches.
//!
//! The backend owns every match record. This crate mirrors one match at a
//! time from the backend's realtime pushes, tracks whether the opponent is
//! connected, and forwards moves, joins and rematch requests to the
//! backend's procedures.

pub mod config;
pub mod models;
pub mod repositories;
pub mod services;
