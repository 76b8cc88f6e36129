//! Request middleware and extractors

pub mod permissions;

pub use permissions::{Caller, Permission, Role};
