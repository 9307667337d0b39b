//! The shard-side half of the workspace gateway: the inbound handler chain
//! (§4.B), the core-group discovery merger (§4.C), and the virtual-workspace
//! authorizer (§4.D). `workspace-core` supplies the typed context carriers and
//! data model these build on; this crate is where they become running axum
//! middleware.

pub mod authorizer;
pub mod discovery;
pub mod middleware;

pub use middleware::install_handler_chain;
