//! Data models for the BananaKart API.
//!
//! Field names are snake_case to match the JSON the front ends already send and read.

mod analyze;
mod cart;
mod recipe;
mod simulation;
mod sourcing;

pub use analyze::*;
pub use cart::*;
pub use recipe::*;
pub use simulation::*;
pub use sourcing::*;
