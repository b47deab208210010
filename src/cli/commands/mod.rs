//! Command implementations.

pub mod completions;
pub mod init;
pub mod plot;
pub mod record;
pub mod session;
pub mod status;
pub mod sync;
pub mod tag;
pub mod version;
pub mod workout;
