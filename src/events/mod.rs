//! Backend event subscription
//!
//! A reference-counted registration of the backend event listeners:
//! any number of observers may hold a subscription, but the underlying
//! listener is registered exactly once on the first acquire and torn down
//! exactly once on the last release.

mod manager;

pub use manager::{EventSubscriptionManager, SubscriptionHandle};
