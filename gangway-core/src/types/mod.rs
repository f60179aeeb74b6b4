//! Client-facing request and option types.
//!
//! These are the arguments a build function hands to the client. Wire
//! conversion happens inside the client; graph-level payloads
//! (definitions, policies, platforms) are reused from the protocol
//! crate since they pass through untouched.

use crate::caps::CapSet;
use crate::env::WorkerInfo;
use crate::reference::Reference;
use gangway_api::bridge::CacheOptionsEntry;
use gangway_api::ops;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncWrite};

/// A build (solve) request against the daemon's graph compiler.
#[derive(Debug, Clone, Default)]
pub struct SolveRequest {
    /// Serialized build graph, checked against the negotiated LLB
    /// capability set before submission.
    pub definition: Option<ops::Definition>,
    /// Name of a frontend to run instead of a raw definition.
    pub frontend: String,
    pub frontend_opt: HashMap<String, String>,
    pub frontend_inputs: HashMap<String, ops::Definition>,
    pub cache_imports: Vec<CacheOptionsEntry>,
    pub source_policies: Vec<ops::SourcePolicy>,
    /// Ask the daemon to materialize the result before returning.
    pub evaluate: bool,
}

/// Options for image/source resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOpt {
    pub log_name: String,
    pub platform: Option<ops::Platform>,
    pub image: Option<ImageOpt>,
    pub oci_layout: Option<OciLayoutOpt>,
    pub source_policies: Vec<ops::SourcePolicy>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageOpt {
    pub resolve_mode: String,
}

#[derive(Debug, Clone, Default)]
pub struct OciLayoutOpt {
    pub store: StoreRef,
}

/// Locates a client-side OCI layout store.
#[derive(Debug, Clone, Default)]
pub struct StoreRef {
    pub session_id: String,
    pub store_id: String,
}

/// Response to source-metadata resolution: the op (with a possibly
/// rewritten identifier) plus the image payload when the source
/// resolved to one.
#[derive(Debug, Clone)]
pub struct SourceMetaResponse {
    pub op: ops::SourceOp,
    pub image: Option<ResolvedImage>,
}

#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub digest: String,
    pub config: Vec<u8>,
}

/// A file read against a build result.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub filename: String,
    pub range: Option<FileRange>,
}

#[derive(Debug, Clone, Copy)]
pub struct FileRange {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReadDirRequest {
    pub path: String,
    pub include_pattern: String,
}

#[derive(Debug, Clone, Default)]
pub struct StatRequest {
    pub path: String,
}

/// Request to create an interactive container inside the daemon.
#[derive(Debug, Clone, Default)]
pub struct NewContainerRequest {
    pub mounts: Vec<ContainerMount>,
    pub platform: Option<ops::Platform>,
    pub constraints: Option<ops::WorkerConstraints>,
    pub net_mode: i32,
    pub extra_hosts: Vec<ops::HostIp>,
    pub hostname: String,
}

/// A mount for a new container, backed either by a reference or by a
/// raw result id.
#[derive(Debug, Clone, Default)]
pub struct ContainerMount {
    pub dest: String,
    pub selector: String,
    pub readonly: bool,
    pub mount_type: i32,
    /// Takes precedence over `result_id` when present.
    pub r#ref: Option<Reference>,
    pub result_id: String,
    pub cache_opt: Option<ops::CacheOpt>,
    pub secret_opt: Option<ops::SecretOpt>,
    pub ssh_opt: Option<ops::SshOpt>,
}

/// Request to start a process inside a container.
///
/// Only supplied streams are serviced: the daemon is told which fds the
/// client opened, and data for an unsupplied output fd is a protocol
/// error.
#[derive(Default)]
pub struct StartRequest {
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub secret_env: Vec<ops::SecretEnv>,
    pub user: String,
    pub cwd: String,
    pub tty: bool,
    pub stdin: Option<Box<dyn AsyncRead + Send + Unpin>>,
    pub stdout: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    pub stderr: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    pub security_mode: i32,
    pub remove_mount_stubs_recursive: bool,
}

/// Terminal dimensions for a resize.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinSize {
    pub rows: u32,
    pub cols: u32,
}

/// Options accompanying a build warning.
#[derive(Debug, Clone, Default)]
pub struct WarnOpts {
    pub level: i64,
    pub source_info: Option<ops::SourceInfo>,
    pub range: Vec<ops::Range>,
    pub detail: Vec<Vec<u8>>,
    pub url: String,
}

/// Everything the frontend was invoked with, as negotiated during
/// construction.
#[derive(Debug, Clone)]
pub struct BuildOpts {
    pub opts: HashMap<String, String>,
    pub session_id: String,
    pub workers: Vec<WorkerInfo>,
    pub product: String,
    pub caps: CapSet,
    pub llb_caps: CapSet,
}
