//! CLI command handling

pub mod htpasswd;
pub mod output;
pub mod returner;

pub use htpasswd::*;
pub use output::*;
pub use returner::*;
