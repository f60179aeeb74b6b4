//! Build-graph level wire messages.
//!
//! A build definition is an opaque list of serialized graph nodes plus
//! per-node metadata. The bridge client never interprets node contents;
//! it only reads the capability tags attached to each node so it can
//! refuse definitions the daemon will not understand.

use prost::Message;
use std::collections::HashMap;

/// A serialized build graph: opaque node blobs plus per-node metadata
/// keyed by node digest.
#[derive(Clone, PartialEq, Message)]
pub struct Definition {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub def: Vec<Vec<u8>>,
    #[prost(map = "string, message", tag = "2")]
    pub metadata: HashMap<String, OpMetadata>,
}

/// Metadata attached to a single graph node.
#[derive(Clone, PartialEq, Message)]
pub struct OpMetadata {
    #[prost(bool, tag = "1")]
    pub ignore_cache: bool,
    #[prost(map = "string, string", tag = "2")]
    pub description: HashMap<String, String>,
    /// Capability tags this node relies on. The client checks each one
    /// against the negotiated LLB capability set before submitting.
    #[prost(map = "string, bool", tag = "5")]
    pub caps: HashMap<String, bool>,
}

/// A source node: a scheme-prefixed identifier plus free-form attributes.
#[derive(Clone, PartialEq, Message)]
pub struct SourceOp {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(map = "string, string", tag = "2")]
    pub attrs: HashMap<String, String>,
}

/// Target platform for a build or resolution.
#[derive(Clone, PartialEq, Message)]
pub struct Platform {
    #[prost(string, tag = "1")]
    pub architecture: String,
    #[prost(string, tag = "2")]
    pub os: String,
    #[prost(string, tag = "3")]
    pub variant: String,
    #[prost(string, tag = "4")]
    pub os_version: String,
    #[prost(string, repeated, tag = "5")]
    pub os_features: Vec<String>,
}

/// Process metadata for an exec: argv, environment, working directory.
#[derive(Clone, PartialEq, Message)]
pub struct Meta {
    #[prost(string, repeated, tag = "1")]
    pub args: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub env: Vec<String>,
    #[prost(string, tag = "3")]
    pub cwd: String,
    #[prost(string, tag = "4")]
    pub user: String,
    #[prost(string, tag = "7")]
    pub hostname: String,
    #[prost(bool, tag = "12")]
    pub remove_mount_stubs_recursive: bool,
}

/// A mount inside a container, possibly backed by a build result.
#[derive(Clone, PartialEq, Message)]
pub struct Mount {
    #[prost(string, tag = "2")]
    pub selector: String,
    #[prost(string, tag = "3")]
    pub dest: String,
    #[prost(bool, tag = "5")]
    pub readonly: bool,
    #[prost(int32, tag = "6")]
    pub mount_type: i32,
    #[prost(message, optional, tag = "20")]
    pub cache_opt: Option<CacheOpt>,
    #[prost(message, optional, tag = "21")]
    pub secret_opt: Option<SecretOpt>,
    #[prost(message, optional, tag = "22")]
    pub ssh_opt: Option<SshOpt>,
    #[prost(string, tag = "23")]
    pub result_id: String,
}

/// Mount type discriminants for [`Mount::mount_type`].
pub mod mount_type {
    pub const BIND: i32 = 0;
    pub const SECRET: i32 = 1;
    pub const SSH: i32 = 2;
    pub const CACHE: i32 = 3;
    pub const TMPFS: i32 = 4;
}

#[derive(Clone, PartialEq, Message)]
pub struct CacheOpt {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(int32, tag = "2")]
    pub sharing: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SecretOpt {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub uid: u32,
    #[prost(uint32, tag = "3")]
    pub gid: u32,
    #[prost(uint32, tag = "4")]
    pub mode: u32,
    #[prost(bool, tag = "5")]
    pub optional: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct SshOpt {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub uid: u32,
    #[prost(uint32, tag = "3")]
    pub gid: u32,
    #[prost(uint32, tag = "4")]
    pub mode: u32,
    #[prost(bool, tag = "5")]
    pub optional: bool,
}

/// A secret exposed to a process as an environment variable.
#[derive(Clone, PartialEq, Message)]
pub struct SecretEnv {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub optional: bool,
}

/// A policy rewriting or pinning sources before the daemon fetches them.
/// Passed through verbatim by the client.
#[derive(Clone, PartialEq, Message)]
pub struct SourcePolicy {
    #[prost(int64, tag = "1")]
    pub version: i64,
    #[prost(message, repeated, tag = "2")]
    pub rules: Vec<PolicyRule>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PolicyRule {
    #[prost(int32, tag = "1")]
    pub action: i32,
    #[prost(message, optional, tag = "2")]
    pub selector: Option<PolicySelector>,
    #[prost(message, optional, tag = "3")]
    pub updates: Option<PolicyUpdate>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PolicySelector {
    #[prost(string, tag = "1")]
    pub identifier: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct PolicyUpdate {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(map = "string, string", tag = "2")]
    pub attrs: HashMap<String, String>,
}

/// Origin of a definition fragment, used to attribute warnings to source
/// locations in the frontend's input.
#[derive(Clone, PartialEq, Message)]
pub struct SourceInfo {
    #[prost(string, tag = "1")]
    pub filename: String,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub definition: Option<Definition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Range {
    #[prost(message, optional, tag = "1")]
    pub start: Option<Position>,
    #[prost(message, optional, tag = "2")]
    pub end: Option<Position>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Position {
    #[prost(int32, tag = "1")]
    pub line: i32,
    #[prost(int32, tag = "2")]
    pub character: i32,
}

/// Scheduling constraints restricting which workers may run a container.
#[derive(Clone, PartialEq, Message)]
pub struct WorkerConstraints {
    #[prost(string, repeated, tag = "1")]
    pub filter: Vec<String>,
}

/// An extra hosts entry for a container's resolver configuration.
#[derive(Clone, PartialEq, Message)]
pub struct HostIp {
    #[prost(string, tag = "1")]
    pub host: String,
    #[prost(string, tag = "2")]
    pub ip: String,
}

/// Attribute keys understood on `oci-layout://` source ops.
pub const ATTR_OCI_LAYOUT_SESSION_ID: &str = "oci.session";
/// See [`ATTR_OCI_LAYOUT_SESSION_ID`].
pub const ATTR_OCI_LAYOUT_STORE_ID: &str = "oci.store";
