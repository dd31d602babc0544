//! Herald boundary API.
//!
//! Thin axum handlers over the engine's services. Authorization belongs to
//! the surrounding system; handlers take recipient and school ids explicitly.

pub mod routes;
pub mod state;
