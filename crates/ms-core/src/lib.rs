//! `ms-core` — foundational types for the `ms` modular simulator.
//!
//! This crate is a dependency of every other `ms-*` crate.  It intentionally
//! has no `ms-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | [`ids`]    | `ElementId`, `AtomId`                                 |
//! | [`time`]   | `Step`, `Time`, `SimClock`                            |
//! | [`config`] | `RunConfig`, every interval the scheduler consults    |
//! | [`rng`]    | `AtomRng`, per-atom deterministic streams             |
//! | [`error`]  | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by checkpointing in `ms-control`.                 |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::RunConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{AtomId, ElementId};
pub use rng::AtomRng;
pub use time::{SimClock, Step, Time};
