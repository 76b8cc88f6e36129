//! API Routes

pub mod billing;
pub mod blueprints;
pub mod features;
pub mod health;
pub mod resources;
pub mod teams;
