//! Management commands.
//!
//! Library-level command objects that wire configuration input to the
//! extraction pipeline. Hosts embed these behind whatever process interface
//! they have (a task runner, a CLI, a build script).

pub mod harvest;

pub use self::harvest::{HarvestCommand, HarvestOptions};
