//! Gangway bridge protocol.
//!
//! This crate defines the gRPC protocol spoken between a build frontend and
//! the build daemon's bridge service. The frontend runs as a short-lived
//! subprocess of the daemon and carries exactly one connection over its
//! standard I/O streams; every message below travels over that channel.
//!
//! The message structs are hand-maintained `prost` derives rather than
//! build-time codegen, so building this crate needs no protobuf toolchain.
//! Field tags are part of the wire contract and must never be reused or
//! renumbered.
//!
//! Layout mirrors the two protocol layers:
//!
//! - [`ops`]: build-graph level messages (definitions, source ops, mounts),
//!   opaque to the bridge except for per-node capability tags.
//! - [`bridge`]: the bridge service surface: solve, resolve, read, return,
//!   container lifecycle and the multiplexed exec envelope.
//! - [`client`]: the client stub for issuing bridge RPCs over a channel.

pub mod bridge;
pub mod client;
pub mod ops;

pub use client::LlbBridgeClient;
