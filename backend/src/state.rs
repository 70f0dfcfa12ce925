//! Application state management

use std::sync::Arc;
use std::time::Duration;

use shop_storage::{
    cart::CartAggregator, gateway::ConditionalWriteGateway, product::ProductStorage,
    scanner::RangeScanner, store::KeyValueStore, user::UserStorage,
};

/// Storage clients shared across handlers, all backed by one store
#[derive(Clone)]
pub struct AppState {
    /// User account operations
    pub users: Arc<UserStorage>,
    /// Catalog operations
    pub products: Arc<ProductStorage>,
    /// Cart operations
    pub cart: Arc<CartAggregator>,
    /// Upper bound on a whole request
    pub request_timeout: Duration,
}

/// Store round trips a handler may make one after another. Clearing a cart scans, then
/// deletes; the extra round is headroom for everything around the store calls.
const STORE_ROUNDS_PER_REQUEST: u32 = 3;

impl AppState {
    /// Wires every storage client to `store`
    ///
    /// # Arguments
    ///
    /// * `store` - Store shared by all clients
    /// * `call_timeout` - Upper bound on a single store call
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, call_timeout: Duration) -> Self {
        let gateway = Arc::new(ConditionalWriteGateway::new(store.clone(), call_timeout));
        let scanner = Arc::new(RangeScanner::new(store, call_timeout));

        Self {
            users: Arc::new(UserStorage::new(gateway.clone(), scanner.clone())),
            products: Arc::new(ProductStorage::new(gateway.clone(), scanner.clone())),
            cart: Arc::new(CartAggregator::new(gateway, scanner)),
            request_timeout: call_timeout * STORE_ROUNDS_PER_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_storage::store::MemoryStore;

    #[test]
    fn test_request_outlasts_sequential_store_calls() {
        let call_timeout = Duration::from_millis(3000);
        let state = AppState::new(Arc::new(MemoryStore::new()), call_timeout);

        assert!(state.request_timeout > call_timeout * 2);
    }
}
