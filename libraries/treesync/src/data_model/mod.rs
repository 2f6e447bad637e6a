#[path = "1-path.rs"]
mod path;

#[path = "2-outcome.rs"]
mod outcome;

#[path = "3-record.rs"]
mod record;

#[path = "4-change.rs"]
mod change;

#[path = "5-reconcile.rs"]
mod reconcile;

#[path = "6-mirror.rs"]
mod mirror;

#[path = "7-health.rs"]
mod health;

pub use change::*;
pub use health::*;
pub use mirror::*;
pub use outcome::*;
pub use path::*;
pub use reconcile::*;
pub use record::*;
