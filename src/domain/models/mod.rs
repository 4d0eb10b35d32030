mod action;
mod dashboard;
mod entry;
mod server;
mod stats;

pub use action::*;
pub use dashboard::*;
pub use entry::*;
pub use server::*;
pub use stats::*;
