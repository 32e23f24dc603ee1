//! Request-processing engine: rate limiting, event storage, the middleware
//! pipeline, autocomplete, the per-connection session runtime, the method
//! dispatcher, and the transports that feed it.

pub mod autocomplete;
pub mod dispatcher;
pub mod error;
pub mod event_store;
pub mod managers;
pub mod middleware;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod testing;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::ServerError;
pub use event_store::{EventStore, EventStoreAdapter, InMemoryEventStore};
pub use managers::Managers;
pub use server::{ServerBuilder, ServerCore};
pub use session::Session;
