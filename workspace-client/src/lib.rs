//! A thin HTTP client for talking to a Kubernetes-shaped API server.
//!
//! This crate provides [`Client`], a raw request/response client built on
//! `tower` middleware, and [`Config`] for locating and authenticating against
//! a cluster from a kubeconfig file or the in-cluster service account.
//!
//! # Example
//!
//! ```rust,no_run
//! use workspace_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Read the environment to find config for the client.
//!     // Note that this tries an in-cluster configuration first,
//!     // then falls back on a kubeconfig file.
//!     let client = Client::try_default().await?;
//!
//!     let version = client.apiserver_version().await?;
//!     println!("connected to {}.{}", version.major, version.minor);
//!
//!     Ok(())
//! }
//! ```
//!
//! For more details, see:
//!
//! - [`client`](crate::client) for the extensible client and its middleware stack
//! - [`config`](crate::config) for the kubeconfig/in-cluster config abstraction
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

macro_rules! cfg_client {
    ($($item:item)*) => {
        $(
            #[cfg_attr(docsrs, doc(cfg(feature = "client")))]
            #[cfg(feature = "client")]
            $item
        )*
    }
}
macro_rules! cfg_config {
    ($($item:item)*) => {
        $(
            #[cfg_attr(docsrs, doc(cfg(feature = "config")))]
            #[cfg(feature = "config")]
            $item
        )*
    }
}

macro_rules! cfg_error {
    ($($item:item)*) => {
        $(
            #[cfg_attr(docsrs, doc(cfg(any(feature = "config", feature = "client"))))]
            #[cfg(any(feature = "config", feature = "client"))]
            $item
        )*
    }
}

cfg_client! {
    pub mod client;

    #[doc(inline)]
    pub use client::Client;
}

cfg_config! {
    pub mod config;
    #[doc(inline)]
    pub use config::Config;
}

cfg_error! {
    pub mod error;
    #[doc(inline)] pub use error::Error;
    /// Convenient alias for `Result<T, Error>`
    pub type Result<T, E = Error> = std::result::Result<T, E>;
}

pub use workspace_core::{Resource, ResourceExt};
/// Re-exports from `workspace_core`
pub use workspace_core as core;
