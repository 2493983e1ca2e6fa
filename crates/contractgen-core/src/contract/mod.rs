//! Operation contracts: the canonical, target-independent form of every
//! operation, and the builder that produces them from a description.

mod builder;
mod types;

pub use builder::{build_contracts, normalize_route, BuildOptions, ContractBuilder};
pub use types::*;
