//! Seating rotation for multi-round events: every participant gets a table in
//! every round, repeated pairings are kept rare, and everyone meets about as
//! many distinct people as everyone else.
//!
//! The pipeline is [`baseline::generate`] → [`improve::improve`] →
//! [`equity::enforce`], driven end to end by [`planner::Planner`].

pub mod action;
pub mod analysis;
pub mod baseline;
pub mod cache;
pub mod equity;
pub mod error;
pub mod export;
pub mod history;
pub mod improve;
pub mod model;
pub mod planner;
pub mod swap;
pub mod tuning;
pub mod validate;

pub use error::{Error, Result};
pub use history::{compute_metrics, meeting_history, Metrics};
pub use model::condition::{ConstraintSet, GroupConstraint, GroupKind};
pub use model::config::Config;
pub use model::entity::{Id, Participant};
pub use model::group::{Plan, Round, Table};
pub use planner::{generate_optimized_plan, Planner};
pub use swap::evaluate_swap;
pub use tuning::{TieBreak, Tuning};
pub use validate::{validate, would_violate};
