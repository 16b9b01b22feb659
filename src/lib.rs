pub mod audit;
pub mod cli;
pub mod config;
pub mod enforcer;
pub mod logging;
pub mod permissions;
pub mod tools;
pub mod types;
pub mod utils;
pub mod web;

#[cfg(test)]
mod tests;

pub use enforcer::{PermissionEnforcer, ToolResponse};
pub use types::{Decision, DenialKind, Operation, PermissionMode, RiskTier};
