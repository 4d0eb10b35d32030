mod actions;
mod dashboard;
mod health;

pub use actions::*;
pub use dashboard::*;
pub use health::*;
