//! Gateway client core for build frontends.
//!
//! A build frontend runs as a short-lived subprocess of the build
//! daemon: it receives its options through the environment, opens a
//! single RPC channel over its standard streams, issues solve
//! operations against the daemon's graph compiler, optionally runs
//! interactive container processes inside the daemon, and finally
//! returns a result (or error) for export.
//!
//! The usual entry point is [`run_from_environment`]:
//!
//! ```no_run
//! use gangway_core::{run_from_environment, SolveRequest};
//!
//! # async fn example() -> gangway_core::Result<()> {
//! run_from_environment(|client| async move {
//!     let res = client.solve(SolveRequest {
//!         frontend: "dockerfile.v0".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!     Ok(Some(res))
//! })
//! .await
//! # }
//! ```
//!
//! Feature support is negotiated per capability during the initial
//! handshake ([`caps`]); container process I/O is multiplexed over one
//! bidirectional stream per client ([`exec`]).

pub mod caps;
pub mod client;
pub mod env;
pub mod error;
pub mod exec;
pub mod reference;
pub mod result;
pub mod signal;
pub mod stdio;
pub mod types;

pub use caps::CapSet;
pub use client::{run_from_environment, GatewayClient};
pub use env::{WorkerInfo, WorkerPlatform};
pub use error::{GatewayError, Result};
pub use exec::{Container, ContainerProcess};
pub use reference::Reference;
pub use result::{Attestation, BuildResult};
pub use types::{
    BuildOpts, ContainerMount, FileRange, ImageOpt, NewContainerRequest, OciLayoutOpt,
    ReadDirRequest, ReadRequest, ResolveOpt, ResolvedImage, SolveRequest, SourceMetaResponse,
    StartRequest, StatRequest, StoreRef, WarnOpts, WinSize,
};
