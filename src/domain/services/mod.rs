mod action;
mod registry;
mod snapshot;

pub use action::*;
pub use registry::*;
pub use snapshot::*;
