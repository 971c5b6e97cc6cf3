//! Friend-relationship core for a chat-bot plugin: the durable relationship
//! graph ([`store::RelationStore`]) and the request-lifecycle operations on
//! top of it ([`service::RelationService`]). The host's command dispatcher
//! parses platform messages and calls the service; nothing platform-specific
//! crosses that boundary.

pub mod error;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use service::RelationService;
pub use store::RelationStore;
