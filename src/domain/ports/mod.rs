//! Port definitions for external collaborators.

mod object_store_port;

pub use object_store_port::ObjectStorePort;
