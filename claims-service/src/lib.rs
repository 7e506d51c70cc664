pub mod app;
pub mod claims;
pub mod config;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod staging;
pub mod store;

pub use crate::app::{build_router, AppState};
pub use crate::claims::{compose_claims, ClaimsResponse, CustomClaims, DataSource};
pub use crate::config::{ClaimsConfig, StoreConfig};
pub use crate::events::TokenIssuanceEvent;
pub use crate::metrics::ClaimsMetrics;
pub use crate::staging::{ConsumeOutcome, StagedRecord, StagingService, STAGING_TTL};
pub use crate::store::{init_store, KvStore, MemoryStore, RedisStore, SharedStore, StoreInit, StoreKind};
