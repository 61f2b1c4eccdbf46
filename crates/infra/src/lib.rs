//! Infrastructure layer: persistence, configuration, external services.

pub mod config;
pub mod external;
pub mod store;


pub use config::{AppConfig, ConfigError};
pub use external::StaticExchangeRates;
pub use store::{
    ClientPortal, InMemoryStore, InitialData, InvoiceReceipt, PostgresStore, Store, StoreError,
    StoreResult,
};
