pub mod analytics;
pub mod dummy_store;
pub mod memory_builder;
pub mod postgres_store;
pub mod store;

pub use analytics::{HourStats, OverallStats, StreakInfo, StreakKind, ZoneStats};
pub use dummy_store::DummyLedgerStore;
pub use memory_builder::MemoryContextBuilder;
pub use postgres_store::PgLedgerStore;
pub use store::LedgerStore;
