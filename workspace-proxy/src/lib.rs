//! Boot sequence for the workspace gateway's front proxy (§4.F): mapping
//! file, admin client derivation, serving certificate, child process, and
//! readiness loop. Exposed as a library so it can be exercised directly from
//! integration tests, with [`crate::main`]'s binary as a thin CLI wrapper.

pub mod admin_client;
pub mod boot;
pub mod cert;
pub mod cli;
pub mod kubeconfig;
pub mod mapping;
pub mod process;
pub mod readiness;
