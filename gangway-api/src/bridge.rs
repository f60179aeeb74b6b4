//! Bridge service wire messages.
//!
//! # Exec envelope
//!
//! Container process I/O is multiplexed over a single bidirectional
//! stream per client. Every frame shares one envelope:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ process_id   │ one of: Init File Resize Signal              │
//! │              │         Started Exit Done                    │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Init, Resize and Signal flow client → daemon; Started, Exit and Done
//! flow daemon → client; File flows both ways (stdin out, stdout and
//! stderr in).

use crate::ops;
use prost::Message;
use std::collections::HashMap;

/// Exit code reported when the daemon could not determine the real
/// process status. An exit with this code carries only the status error,
/// never a meaningful code.
pub const UNKNOWN_EXIT_STATUS: u32 = 255;

/// An RPC status triple, used to carry typed errors across the bridge.
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<prost_types::Any>,
}

/// A named capability advertised by one side of the bridge.
#[derive(Clone, PartialEq, Message)]
pub struct ApiCap {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(bool, tag = "2")]
    pub enabled: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct PingRequest {}

/// Ping response: the daemon's capability lists. An empty list means the
/// daemon predates capability negotiation and the client substitutes its
/// frozen defaults.
#[derive(Clone, PartialEq, Message)]
pub struct PongResponse {
    #[prost(message, repeated, tag = "1")]
    pub frontend_api_caps: Vec<ApiCap>,
    #[prost(message, repeated, tag = "2")]
    pub llb_caps: Vec<ApiCap>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SolveRequest {
    #[prost(message, optional, tag = "1")]
    pub definition: Option<ops::Definition>,
    #[prost(string, tag = "2")]
    pub frontend: String,
    #[prost(map = "string, string", tag = "3")]
    pub frontend_opt: HashMap<String, String>,
    /// Always set by current clients; lets the daemon return a structured
    /// result instead of the legacy inline ref.
    #[prost(bool, tag = "5")]
    pub allow_result_return: bool,
    #[prost(bool, tag = "6")]
    pub allow_result_array_ref: bool,
    /// Legacy close-out: marks the re-submitted request that finishes an
    /// inline-return build.
    #[prost(bool, tag = "10")]
    pub r#final: bool,
    #[prost(bytes = "vec", tag = "11")]
    pub exporter_attr: Vec<u8>,
    #[prost(message, repeated, tag = "12")]
    pub cache_imports: Vec<CacheOptionsEntry>,
    #[prost(map = "string, message", tag = "13")]
    pub frontend_inputs: HashMap<String, ops::Definition>,
    #[prost(bool, tag = "14")]
    pub evaluate: bool,
    #[prost(message, repeated, tag = "15")]
    pub source_policies: Vec<ops::SourcePolicy>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CacheOptionsEntry {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(map = "string, string", tag = "2")]
    pub attrs: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SolveResponse {
    /// Legacy inline return: the single result ref id.
    #[prost(string, tag = "1")]
    pub r#ref: String,
    #[prost(message, optional, tag = "3")]
    pub result: Option<Result>,
}

/// A typed handle to a daemon-side build artifact.
#[derive(Clone, PartialEq, Message)]
pub struct Ref {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, optional, tag = "2")]
    pub def: Option<ops::Definition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RefMap {
    #[prost(map = "string, message", tag = "1")]
    pub refs: HashMap<String, Ref>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RefMapDeprecated {
    #[prost(map = "string, string", tag = "1")]
    pub refs: HashMap<String, String>,
}

/// A solve result in one of four wire encodings; which pair is legal
/// depends on the negotiated capabilities.
#[derive(Clone, PartialEq, Message)]
pub struct Result {
    #[prost(oneof = "result::Result", tags = "1, 2, 3, 4")]
    pub result: Option<result::Result>,
    #[prost(map = "string, bytes", tag = "10")]
    pub metadata: HashMap<String, Vec<u8>>,
    #[prost(map = "string, message", tag = "11")]
    pub attestations: HashMap<String, Attestations>,
}

pub mod result {
    /// The four ref encodings. Deprecated variants carry bare ids and are
    /// emitted only for daemons without the ref-array capability.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Result {
        #[prost(string, tag = "1")]
        RefDeprecated(String),
        #[prost(message, tag = "2")]
        RefsDeprecated(super::RefMapDeprecated),
        #[prost(message, tag = "3")]
        Ref(super::Ref),
        #[prost(message, tag = "4")]
        Refs(super::RefMap),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Attestations {
    #[prost(message, repeated, tag = "1")]
    pub attestation: Vec<Attestation>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Attestation {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(map = "string, bytes", tag = "2")]
    pub metadata: HashMap<String, Vec<u8>>,
    #[prost(message, optional, tag = "3")]
    pub r#ref: Option<Ref>,
    #[prost(string, tag = "4")]
    pub path: String,
    #[prost(string, tag = "5")]
    pub in_toto_predicate_type: String,
    #[prost(message, repeated, tag = "6")]
    pub in_toto_subjects: Vec<InTotoSubject>,
}

#[derive(Clone, PartialEq, Message)]
pub struct InTotoSubject {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(string, repeated, tag = "2")]
    pub digest: Vec<String>,
    #[prost(string, tag = "3")]
    pub name: String,
}

/// Attestation kind discriminants.
pub mod attestation_kind {
    pub const IN_TOTO: i32 = 0;
    pub const BUNDLE: i32 = 1;
}

/// Final report from the frontend: a result or an error, never both.
#[derive(Clone, PartialEq, Message)]
pub struct ReturnRequest {
    #[prost(message, optional, tag = "1")]
    pub result: Option<Result>,
    #[prost(message, optional, tag = "2")]
    pub error: Option<RpcStatus>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReturnResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct ResolveImageConfigRequest {
    #[prost(string, tag = "1")]
    pub r#ref: String,
    #[prost(message, optional, tag = "2")]
    pub platform: Option<ops::Platform>,
    #[prost(string, tag = "3")]
    pub resolve_mode: String,
    #[prost(string, tag = "4")]
    pub log_name: String,
    #[prost(int32, tag = "5")]
    pub resolver_type: i32,
    #[prost(string, tag = "6")]
    pub session_id: String,
    #[prost(string, tag = "7")]
    pub store_id: String,
    #[prost(message, repeated, tag = "8")]
    pub source_policies: Vec<ops::SourcePolicy>,
}

/// Resolver type discriminants for [`ResolveImageConfigRequest::resolver_type`].
pub mod resolver_type {
    pub const REGISTRY: i32 = 0;
    pub const OCI_LAYOUT: i32 = 1;
}

#[derive(Clone, PartialEq, Message)]
pub struct ResolveImageConfigResponse {
    #[prost(string, tag = "1")]
    pub digest: String,
    #[prost(bytes = "vec", tag = "2")]
    pub config: Vec<u8>,
    #[prost(string, tag = "3")]
    pub r#ref: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResolveSourceMetaRequest {
    #[prost(message, optional, tag = "1")]
    pub source: Option<ops::SourceOp>,
    #[prost(message, optional, tag = "2")]
    pub platform: Option<ops::Platform>,
    #[prost(string, tag = "3")]
    pub log_name: String,
    #[prost(message, repeated, tag = "4")]
    pub source_policies: Vec<ops::SourcePolicy>,
}

/// Response to source-metadata resolution. `source` echoes the op with a
/// possibly rewritten identifier; `image` is present only when the source
/// resolved to an image.
#[derive(Clone, PartialEq, Message)]
pub struct ResolveSourceMetaResponse {
    #[prost(message, optional, tag = "1")]
    pub source: Option<ops::SourceOp>,
    #[prost(message, optional, tag = "2")]
    pub image: Option<ResolveSourceImageResponse>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResolveSourceImageResponse {
    #[prost(string, tag = "1")]
    pub digest: String,
    #[prost(bytes = "vec", tag = "2")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReadFileRequest {
    #[prost(string, tag = "1")]
    pub r#ref: String,
    #[prost(string, tag = "2")]
    pub file_path: String,
    #[prost(message, optional, tag = "3")]
    pub range: Option<FileRange>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FileRange {
    #[prost(int64, tag = "1")]
    pub offset: i64,
    #[prost(int64, tag = "2")]
    pub length: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReadFileResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReadDirRequest {
    #[prost(string, tag = "1")]
    pub r#ref: String,
    #[prost(string, tag = "2")]
    pub dir_path: String,
    #[prost(string, tag = "3")]
    pub include_pattern: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReadDirResponse {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<Stat>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StatFileRequest {
    #[prost(string, tag = "1")]
    pub r#ref: String,
    #[prost(string, tag = "2")]
    pub path: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct StatFileResponse {
    #[prost(message, optional, tag = "1")]
    pub stat: Option<Stat>,
}

/// File metadata for read-dir and stat results.
#[derive(Clone, PartialEq, Message)]
pub struct Stat {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(uint32, tag = "2")]
    pub mode: u32,
    #[prost(uint32, tag = "3")]
    pub uid: u32,
    #[prost(uint32, tag = "4")]
    pub gid: u32,
    #[prost(int64, tag = "5")]
    pub size: i64,
    #[prost(int64, tag = "6")]
    pub mod_time: i64,
    #[prost(string, tag = "7")]
    pub linkname: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct EvaluateRequest {
    #[prost(string, tag = "1")]
    pub r#ref: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct EvaluateResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct WarnRequest {
    #[prost(string, tag = "1")]
    pub digest: String,
    #[prost(int64, tag = "2")]
    pub level: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub short: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub detail: Vec<Vec<u8>>,
    #[prost(string, tag = "5")]
    pub url: String,
    #[prost(message, optional, tag = "6")]
    pub info: Option<ops::SourceInfo>,
    #[prost(message, repeated, tag = "7")]
    pub ranges: Vec<ops::Range>,
}

#[derive(Clone, PartialEq, Message)]
pub struct WarnResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct InputsRequest {}

#[derive(Clone, PartialEq, Message)]
pub struct InputsResponse {
    #[prost(map = "string, message", tag = "1")]
    pub definitions: HashMap<String, ops::Definition>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NewContainerRequest {
    #[prost(string, tag = "1")]
    pub container_id: String,
    #[prost(message, repeated, tag = "2")]
    pub mounts: Vec<ops::Mount>,
    #[prost(message, optional, tag = "3")]
    pub platform: Option<ops::Platform>,
    #[prost(message, optional, tag = "4")]
    pub constraints: Option<ops::WorkerConstraints>,
    #[prost(int32, tag = "5")]
    pub network: i32,
    #[prost(message, repeated, tag = "6")]
    pub extra_hosts: Vec<ops::HostIp>,
    #[prost(string, tag = "7")]
    pub hostname: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct NewContainerResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct ReleaseContainerRequest {
    #[prost(string, tag = "1")]
    pub container_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ReleaseContainerResponse {}

/// One frame on the exec stream: a process id and a tagged payload.
#[derive(Clone, PartialEq, Message)]
pub struct ExecMessage {
    #[prost(string, tag = "1")]
    pub process_id: String,
    #[prost(oneof = "exec_message::Input", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub input: Option<exec_message::Input>,
}

pub mod exec_message {
    /// The closed set of exec frame payloads.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Input {
        #[prost(message, tag = "2")]
        Init(super::InitMessage),
        #[prost(message, tag = "3")]
        File(super::FdMessage),
        #[prost(message, tag = "4")]
        Resize(super::ResizeMessage),
        #[prost(message, tag = "5")]
        Started(super::StartedMessage),
        #[prost(message, tag = "6")]
        Exit(super::ExitMessage),
        #[prost(message, tag = "7")]
        Done(super::DoneMessage),
        #[prost(message, tag = "8")]
        Signal(super::SignalMessage),
    }
}

/// Starts a process inside a previously created container. `fds` declares
/// which of stdin (0), stdout (1) and stderr (2) the client will service.
#[derive(Clone, PartialEq, Message)]
pub struct InitMessage {
    #[prost(string, tag = "1")]
    pub container_id: String,
    #[prost(message, optional, tag = "2")]
    pub meta: Option<ops::Meta>,
    #[prost(uint32, repeated, tag = "3")]
    pub fds: Vec<u32>,
    #[prost(bool, tag = "4")]
    pub tty: bool,
    #[prost(int32, tag = "5")]
    pub security: i32,
    #[prost(message, repeated, tag = "6")]
    pub secretenv: Vec<ops::SecretEnv>,
}

/// A chunk of stream data for one fd, or an EOF marker for that fd.
#[derive(Clone, PartialEq, Message)]
pub struct FdMessage {
    #[prost(uint32, tag = "1")]
    pub fd: u32,
    #[prost(bool, tag = "2")]
    pub eof: bool,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResizeMessage {
    #[prost(uint32, tag = "1")]
    pub rows: u32,
    #[prost(uint32, tag = "2")]
    pub cols: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignalMessage {
    /// Canonical signal name without the `SIG` prefix, e.g. `TERM`.
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct StartedMessage {}

#[derive(Clone, PartialEq, Message)]
pub struct ExitMessage {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(message, optional, tag = "2")]
    pub error: Option<RpcStatus>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DoneMessage {}
