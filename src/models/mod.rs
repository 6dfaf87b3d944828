//! Domain model module declarations.

pub mod decision;
pub mod permission;
pub mod session;
