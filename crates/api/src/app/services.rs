use std::sync::Arc;

use fatoura_core::{Currency, ExchangeRateProvider};
use fatoura_infra::{InMemoryStore, StaticExchangeRates, Store};

/// Collaborators shared by every handler.
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub rates: Arc<dyn ExchangeRateProvider>,
    /// Currency reports are expressed in unless the request asks for another.
    pub reporting_currency: Currency,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, reporting_currency: Currency) -> Self {
        Self {
            store,
            rates: Arc::new(StaticExchangeRates),
            reporting_currency,
        }
    }

    /// Fresh in-memory store with the static rate table (dev/tests).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), Currency::Mad)
    }
}
