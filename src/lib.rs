pub mod chat;
pub mod config;
pub mod damage;
pub mod event;
pub mod export;
pub mod loader;
pub mod report;
pub mod roster;
pub mod rounds;
pub mod scout;
pub mod stats;
pub mod steam_id;

pub use stats::{AdvancedStats, BasicStats, compute_stats};
pub use steam_id::steam64_to_steam2;
