//! CLI Commands

pub mod hash;
pub mod shards;
pub mod verify;

pub use hash::run as hash;
pub use shards::run as shards;
pub use verify::run as verify;
