//! The gateway client.
//!
//! One client per frontend invocation: it owns the transport, the
//! negotiated capability sets, the solve-request cache used by the
//! legacy inline-return path, and the exec stream multiplexer. Build
//! functions receive a clone and drive everything through it.

use crate::caps::{self, frontend, CapSet};
use crate::env::{self, WorkerInfo};
use crate::error::{GatewayError, Result};
use crate::exec::forwarder::MessageForwarder;
use crate::exec::{self, Container};
use crate::reference::Reference;
use crate::result::{convert_ref, result_from_wire, result_to_wire, BuildResult};
use crate::stdio;
use crate::types::{
    BuildOpts, NewContainerRequest, ResolveOpt, ResolvedImage, SolveRequest, SourceMetaResponse,
    StatRequest, WarnOpts,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gangway_api::bridge::{self, resolver_type};
use gangway_api::ops;
use gangway_api::LlbBridgeClient;
use prost::Message as _;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::transport::Channel;
use tracing::{debug, warn};

/// Deadline applied to the capability handshake. Everything after the
/// handshake is caller-driven.
const PING_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the daemon mounts the frontend's own definition, when there is
/// one.
pub const FRONTEND_DEFINITION_PATH: &str = "/run/config/buildkit/metadata/frontend.bin";

struct ClientInner {
    bridge: LlbBridgeClient<Channel>,
    opts: HashMap<String, String>,
    session_id: String,
    product: String,
    workers: Vec<WorkerInfo>,
    caps: CapSet,
    llb_caps: CapSet,
    requests: Mutex<HashMap<String, bridge::SolveRequest>>,
    exec: Arc<MessageForwarder>,
}

/// Client handle for one frontend invocation. Cheap to clone; all
/// clones share the transport and multiplexer.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("session_id", &self.inner.session_id)
            .finish_non_exhaustive()
    }
}

/// Construct the client from the process environment and run the build
/// function against it.
pub async fn run_from_environment<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce(GatewayClient) -> Fut,
    Fut: Future<Output = Result<Option<BuildResult>>>,
{
    let client = GatewayClient::connect().await?;
    client.run(f).await
}

impl GatewayClient {
    /// Dial the stdio channel and negotiate capabilities.
    pub async fn connect() -> Result<Self> {
        let channel = stdio::connect().await?;
        let bridge = LlbBridgeClient::new(channel)
            .max_decoding_message_size(stdio::MAX_MESSAGE_SIZE)
            .max_encoding_message_size(stdio::MAX_MESSAGE_SIZE);
        Self::new(bridge, env::frontend_opts(), env::session_id(), env::product(), env::workers())
            .await
    }

    /// Build a client over an established channel: ping the daemon
    /// under a bounded deadline and install the capability sets,
    /// substituting the frozen defaults for any list the daemon leaves
    /// empty.
    pub async fn new(
        mut bridge: LlbBridgeClient<Channel>,
        opts: HashMap<String, String>,
        session_id: String,
        product: String,
        workers: Vec<WorkerInfo>,
    ) -> Result<Self> {
        let pong = tokio::time::timeout(PING_TIMEOUT, bridge.ping(bridge::PingRequest {}))
            .await
            .map_err(|_| {
                GatewayError::Rpc(tonic::Status::deadline_exceeded("ping to daemon timed out"))
            })??
            .into_inner();

        let api_caps = if pong.frontend_api_caps.is_empty() {
            caps::default_frontend_caps()
        } else {
            pong.frontend_api_caps
        };
        let llb_caps =
            if pong.llb_caps.is_empty() { caps::default_llb_caps() } else { pong.llb_caps };

        let exec = Arc::new(MessageForwarder::new(bridge.clone()));
        Ok(Self {
            inner: Arc::new(ClientInner {
                bridge,
                opts,
                session_id,
                product,
                workers,
                caps: CapSet::from_list(&api_caps),
                llb_caps: CapSet::from_list(&llb_caps),
                requests: Mutex::new(HashMap::new()),
                exec,
            }),
        })
    }

    pub(crate) fn bridge(&self) -> LlbBridgeClient<Channel> {
        self.inner.bridge.clone()
    }

    pub(crate) fn caps(&self) -> &CapSet {
        &self.inner.caps
    }

    pub(crate) fn forwarder(&self) -> Arc<MessageForwarder> {
        self.inner.exec.clone()
    }

    /// References are only valid for the client that produced them;
    /// clones share identity.
    pub(crate) fn same_client(&self, other: &GatewayClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Everything the frontend was invoked with.
    pub fn build_opts(&self) -> BuildOpts {
        BuildOpts {
            opts: self.inner.opts.clone(),
            session_id: self.inner.session_id.clone(),
            workers: self.inner.workers.clone(),
            product: self.inner.product.clone(),
            caps: self.inner.caps.clone(),
            llb_caps: self.inner.llb_caps.clone(),
        }
    }

    /// Run the build function and report its outcome to the daemon.
    ///
    /// With a capability-aware daemon the outcome travels through a
    /// final Return RPC, result or error. Older daemons get the legacy
    /// close-out instead: the cached solve request re-submitted as
    /// final, with the metadata as exporter attributes. The exec
    /// multiplexer is released on every exit path, and a build error is
    /// never masked by anything that fails later.
    pub async fn run<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce(GatewayClient) -> Fut,
        Fut: Future<Output = Result<Option<BuildResult>>>,
    {
        let export = self.inner.caps.supports(frontend::RETURN_RESULT).is_ok();

        let mut ret = f(self.clone()).await;

        if let Ok(Some(res)) = &ret {
            if res.ref_count() > 1 {
                if let Err(e) = self.inner.caps.supports(frontend::RETURN_MAP) {
                    ret = Err(e);
                }
            }
        }

        if !export {
            if let Ok(Some(res)) = &ret {
                if let Err(e) = self.finish_inline(res).await {
                    ret = Err(e);
                }
            }
        }

        if let Err(release_err) = self.inner.exec.release().await {
            match &ret {
                Err(err) => {
                    warn!("releasing exec stream failed after build error {err}: {release_err}")
                }
                Ok(_) => ret = Err(release_err),
            }
        }

        if export {
            let req = match &ret {
                Ok(maybe) => {
                    let empty = BuildResult::new();
                    let res = maybe.as_ref().unwrap_or(&empty);
                    result_to_wire(res, &self.inner.caps, self)
                        .map(|wire| bridge::ReturnRequest { result: Some(wire), error: None })
                }
                Err(e) => Ok(bridge::ReturnRequest { result: None, error: Some(error_status(e)) }),
            };
            let req = match req {
                Ok(req) => req,
                Err(e) => {
                    let payload =
                        bridge::ReturnRequest { result: None, error: Some(error_status(&e)) };
                    ret = Err(e);
                    payload
                }
            };
            if let Err(e) = self.bridge().r#return(req).await {
                if ret.is_ok() {
                    ret = Err(e.into());
                }
            }
        }

        ret.map(|_| ())
    }

    /// Issue a build against the daemon's graph compiler.
    pub async fn solve(&self, mut creq: SolveRequest) -> Result<BuildResult> {
        // refuse definitions the daemon will not understand, before any RPC
        if let Some(def) = &creq.definition {
            for md in def.metadata.values() {
                for cap in md.caps.keys() {
                    self.inner.llb_caps.supports(cap)?;
                }
            }
        }

        // options inherited from the frontend invocation
        for key in ["cache-imports", "cache-from"] {
            if !creq.frontend_opt.contains_key(key) {
                if let Some(v) = self.inner.opts.get(key) {
                    creq.frontend_opt.insert(key.to_string(), v.clone());
                }
            }
        }

        let mut req = bridge::SolveRequest {
            definition: creq.definition,
            frontend: creq.frontend,
            frontend_opt: creq.frontend_opt,
            frontend_inputs: creq.frontend_inputs,
            allow_result_return: true,
            allow_result_array_ref: true,
            cache_imports: creq.cache_imports,
            source_policies: creq.source_policies,
            ..Default::default()
        };

        // backwards compatibility with inline return
        if self.inner.caps.supports(frontend::RETURN_RESULT).is_err() {
            req.exporter_attr = b"{}".to_vec();
        }

        let mut eval_fallback = false;
        if creq.evaluate {
            if self.inner.caps.supports(frontend::GATEWAY_EVALUATE_SOLVE).is_ok() {
                req.evaluate = true;
            } else {
                eval_fallback = true;
            }
        }

        let resp = self.bridge().solve(req.clone()).await?.into_inner();
        let res = self.decode_solve_response(req, resp)?;

        if eval_fallback {
            // daemons without solve-time evaluation materialize on stat
            for r in res.all_refs() {
                r.stat_file(StatRequest { path: ".".to_string() }).await?;
            }
        }

        Ok(res)
    }

    /// Decode a solve response in any of its five encodings. The legacy
    /// inline encoding (no embedded result) caches the originating
    /// request so the close-out path can find it again.
    fn decode_solve_response(
        &self,
        req: bridge::SolveRequest,
        resp: bridge::SolveResponse,
    ) -> Result<BuildResult> {
        if let Some(wire) = resp.result {
            return result_from_wire(wire, self);
        }
        let mut res = BuildResult::new();
        if !resp.r#ref.is_empty() {
            self.inner.requests.lock().unwrap().insert(resp.r#ref.clone(), req);
        }
        res.set_ref(Some(Reference::new(self, resp.r#ref, None)));
        Ok(res)
    }

    fn request_for_ref(&self, r: Option<&Reference>) -> Result<bridge::SolveRequest> {
        let empty = bridge::SolveRequest {
            definition: Some(ops::Definition::default()),
            ..Default::default()
        };
        let Some(r) = r else { return Ok(empty) };
        if !r.client.same_client(self) {
            return Err(GatewayError::InvalidReference);
        }
        if r.id.is_empty() {
            return Ok(empty);
        }
        self.inner
            .requests
            .lock()
            .unwrap()
            .get(&r.id)
            .cloned()
            .ok_or_else(|| GatewayError::MissingRequest { id: r.id.clone() })
    }

    /// The final request that closes out an inline-return build.
    fn inline_return_request(&self, res: &BuildResult) -> Result<bridge::SolveRequest> {
        let metadata: serde_json::Map<String, serde_json::Value> = res
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(STANDARD.encode(v))))
            .collect();
        let exporter_attr = serde_json::to_vec(&serde_json::Value::Object(metadata))?;

        let mut req = self.request_for_ref(res.single_ref())?;
        req.r#final = true;
        req.exporter_attr = exporter_attr;
        Ok(req)
    }

    async fn finish_inline(&self, res: &BuildResult) -> Result<()> {
        let req = self.inline_return_request(res)?;
        self.bridge().solve(req).await?;
        Ok(())
    }

    /// Resolve an image reference to a pinned ref, digest and config.
    pub async fn resolve_image_config(
        &self,
        reference: &str,
        opt: &ResolveOpt,
    ) -> Result<(String, String, Vec<u8>)> {
        if self.inner.caps.supports(frontend::SOURCE_META_RESOLVER).is_ok() {
            return self.resolve_image_config_via_source_meta(reference, opt).await;
        }

        let mut req = bridge::ResolveImageConfigRequest {
            r#ref: reference.to_string(),
            platform: opt.platform.clone(),
            log_name: opt.log_name.clone(),
            source_policies: opt.source_policies.clone(),
            ..Default::default()
        };
        if let Some(iopt) = &opt.image {
            req.resolve_mode = iopt.resolve_mode.clone();
            req.resolver_type = resolver_type::REGISTRY;
        }
        if let Some(l) = &opt.oci_layout {
            req.resolver_type = resolver_type::OCI_LAYOUT;
            req.store_id = l.store.store_id.clone();
            req.session_id = l.store.session_id.clone();
        }

        let resp = self.bridge().resolve_image_config(req).await?.into_inner();
        // an empty ref means the daemon is too old to return one
        let new_ref =
            if resp.r#ref.is_empty() { reference.to_string() } else { resp.r#ref };
        Ok((new_ref, resp.digest, resp.config))
    }

    async fn resolve_image_config_via_source_meta(
        &self,
        reference: &str,
        opt: &ResolveOpt,
    ) -> Result<(String, String, Vec<u8>)> {
        let mut op = ops::SourceOp {
            identifier: format!("docker-image://{}", reference),
            ..Default::default()
        };
        if let Some(l) = &opt.oci_layout {
            op.identifier = format!("oci-layout://{}", reference);
            op.attrs
                .insert(ops::ATTR_OCI_LAYOUT_SESSION_ID.to_string(), l.store.session_id.clone());
            op.attrs.insert(ops::ATTR_OCI_LAYOUT_STORE_ID.to_string(), l.store.store_id.clone());
        }

        let req = bridge::ResolveSourceMetaRequest {
            source: Some(op),
            platform: opt.platform.clone(),
            log_name: opt.log_name.clone(),
            source_policies: opt.source_policies.clone(),
        };
        let resp = self.bridge().resolve_source_meta(req).await?.into_inner();
        let source = resp.source.unwrap_or_default();
        let Some(image) = resp.image else {
            return Err(GatewayError::ResolveToNonImage {
                reference: reference.to_string(),
                updated: source.identifier,
            });
        };
        let stripped = source
            .identifier
            .strip_prefix("docker-image://")
            .or_else(|| source.identifier.strip_prefix("oci-layout://"))
            .unwrap_or(&source.identifier)
            .to_string();
        Ok((stripped, image.digest, image.config))
    }

    /// Resolve metadata for a source op, preserving the op in the
    /// response. Daemons without the unified resolver are handled by
    /// resolving through the legacy RPC and rewriting the identifier,
    /// so callers see the modern contract either way.
    pub async fn resolve_source_metadata(
        &self,
        mut op: ops::SourceOp,
        opt: &ResolveOpt,
    ) -> Result<SourceMetaResponse> {
        if self.inner.caps.supports(frontend::SOURCE_META_RESOLVER).is_err() {
            let parts = split_scheme(&op.identifier).map(|(s, r)| (s, r.to_string()));
            let Some((scheme, reference)) = parts else {
                return Ok(SourceMetaResponse { op, image: None });
            };
            let (resolved, digest, config) = self.resolve_image_config(&reference, opt).await?;
            op.identifier = format!("{}://{}", scheme, resolved);
            return Ok(SourceMetaResponse { op, image: Some(ResolvedImage { digest, config }) });
        }

        let req = bridge::ResolveSourceMetaRequest {
            source: Some(op.clone()),
            platform: opt.platform.clone(),
            log_name: opt.log_name.clone(),
            source_policies: opt.source_policies.clone(),
        };
        let resp = self.bridge().resolve_source_meta(req).await?.into_inner();
        Ok(SourceMetaResponse {
            op: resp.source.unwrap_or(op),
            image: resp.image.map(|i| ResolvedImage { digest: i.digest, config: i.config }),
        })
    }

    /// Emit a build warning attributed to a vertex digest.
    pub async fn warn(&self, digest: &str, msg: &str, opts: WarnOpts) -> Result<()> {
        let req = bridge::WarnRequest {
            digest: digest.to_string(),
            level: opts.level,
            short: msg.as_bytes().to_vec(),
            detail: opts.detail,
            url: opts.url,
            info: opts.source_info,
            ranges: opts.range,
        };
        self.bridge().warn(req).await?;
        Ok(())
    }

    /// Named inputs this frontend was invoked with.
    pub async fn inputs(&self) -> Result<HashMap<String, ops::Definition>> {
        self.inner.caps.supports(frontend::FRONTEND_INPUTS)?;
        let resp = self.bridge().inputs(bridge::InputsRequest {}).await?.into_inner();
        Ok(resp.definitions)
    }

    /// The definition the frontend itself was built from, when the
    /// daemon mounted one. A missing file is not an error.
    pub async fn current_frontend(&self) -> Result<Option<ops::Definition>> {
        read_frontend_definition(Path::new(FRONTEND_DEFINITION_PATH)).await
    }

    /// Create an interactive container in the daemon. Starts the exec
    /// stream on first use.
    pub async fn new_container(&self, req: NewContainerRequest) -> Result<Container> {
        self.inner.caps.supports(frontend::GATEWAY_EXEC)?;
        let id = exec::new_id();

        let mut mounts = Vec::with_capacity(req.mounts.len());
        for m in &req.mounts {
            let result_id = match &m.r#ref {
                Some(r) => convert_ref(Some(r), self)?.id,
                None => m.result_id.clone(),
            };
            mounts.push(ops::Mount {
                selector: m.selector.clone(),
                dest: m.dest.clone(),
                readonly: m.readonly,
                mount_type: m.mount_type,
                cache_opt: m.cache_opt.clone(),
                secret_opt: m.secret_opt.clone(),
                ssh_opt: m.ssh_opt.clone(),
                result_id,
            });
        }

        debug!("|---> NewContainer {}", id);
        self.bridge()
            .new_container(bridge::NewContainerRequest {
                container_id: id.clone(),
                mounts,
                platform: req.platform,
                constraints: req.constraints,
                network: req.net_mode,
                extra_hosts: req.extra_hosts,
                hostname: req.hostname,
            })
            .await?;

        self.inner.exec.start().await?;

        Ok(Container { id, client: self.clone() })
    }
}

fn split_scheme(identifier: &str) -> Option<(&'static str, &str)> {
    if let Some(rest) = identifier.strip_prefix("docker-image://") {
        return Some(("docker-image", rest));
    }
    if let Some(rest) = identifier.strip_prefix("oci-layout://") {
        return Some(("oci-layout", rest));
    }
    None
}

/// Encode an error as the RPC status triple the Return payload carries.
fn error_status(err: &GatewayError) -> bridge::RpcStatus {
    match err {
        GatewayError::Rpc(status) => bridge::RpcStatus {
            code: status.code() as i32,
            message: status.message().to_string(),
            details: Vec::new(),
        },
        other => bridge::RpcStatus {
            code: tonic::Code::Unknown as i32,
            message: other.to_string(),
            details: Vec::new(),
        },
    }
}

pub(crate) async fn read_frontend_definition(path: &Path) -> Result<Option<ops::Definition>> {
    if tokio::fs::metadata(path).await.is_err() {
        return Ok(None);
    }
    let dt = tokio::fs::read(path).await?;
    Ok(Some(ops::Definition::decode(dt.as_slice())?))
}

/// A client that can never reach a daemon, for exercising the pure
/// request/decode paths.
#[cfg(test)]
pub(crate) fn test_client(caps: CapSet, llb_caps: CapSet) -> GatewayClient {
    use hyper_util::rt::TokioIo;
    use tonic::transport::{Endpoint, Uri};

    let channel = Endpoint::try_from(stdio::PSEUDO_ADDR).unwrap().connect_with_connector_lazy(
        tower::service_fn(|_: Uri| async {
            Err::<TokioIo<tokio::io::DuplexStream>, std::io::Error>(std::io::Error::new(
                std::io::ErrorKind::Other,
                "test channel is not connectable",
            ))
        }),
    );
    let bridge = LlbBridgeClient::new(channel);
    GatewayClient {
        inner: Arc::new(ClientInner {
            bridge: bridge.clone(),
            opts: HashMap::new(),
            session_id: "test-session".to_string(),
            product: String::new(),
            workers: Vec::new(),
            caps,
            llb_caps,
            requests: Mutex::new(HashMap::new()),
            exec: Arc::new(MessageForwarder::new(bridge)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_api::bridge::ApiCap;
    use prost::Message as _;

    fn caps_of(ids: &[&str]) -> CapSet {
        CapSet::from_list(
            &ids.iter().map(|id| ApiCap { id: id.to_string(), enabled: true }).collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_solve_rejects_unknown_node_capability() {
        let client = test_client(
            CapSet::from_list(&caps::default_frontend_caps()),
            CapSet::from_list(&caps::default_llb_caps()),
        );

        let mut md = ops::OpMetadata::default();
        md.caps.insert("exec.mount.ssh".to_string(), true);
        let mut def = ops::Definition::default();
        def.metadata.insert("sha256:node0".to_string(), md);

        // fails on the capability check before any RPC is attempted
        let err = client
            .solve(SolveRequest { definition: Some(def), ..Default::default() })
            .await
            .unwrap_err();
        assert!(err.is_missing_capability("exec.mount.ssh"));
    }

    #[tokio::test]
    async fn test_legacy_inline_solve_caches_request() {
        let client = test_client(
            CapSet::from_list(&caps::default_frontend_caps()),
            CapSet::from_list(&caps::default_llb_caps()),
        );

        let req = bridge::SolveRequest {
            frontend: "dockerfile.v0".to_string(),
            exporter_attr: b"{}".to_vec(),
            allow_result_return: true,
            allow_result_array_ref: true,
            ..Default::default()
        };
        let resp = bridge::SolveResponse { r#ref: "r1".to_string(), result: None };

        let mut res = client.decode_solve_response(req, resp).unwrap();
        assert_eq!(res.single_ref().unwrap().id(), "r1");

        // the close-out request is the cached one, finalized, with the
        // metadata as exporter attributes
        res.metadata.insert("k".to_string(), b"v".to_vec());
        let finished = client.inline_return_request(&res).unwrap();
        assert!(finished.r#final);
        assert_eq!(finished.frontend, "dockerfile.v0");
        assert_eq!(finished.exporter_attr, br#"{"k":"dg=="}"#.to_vec());
    }

    #[tokio::test]
    async fn test_request_for_ref_rejects_foreign_reference() {
        let a = test_client(CapSet::default(), CapSet::default());
        let b = test_client(CapSet::default(), CapSet::default());

        let foreign = Reference::new(&b, "r1".to_string(), None);
        assert!(matches!(
            a.request_for_ref(Some(&foreign)).unwrap_err(),
            GatewayError::InvalidReference
        ));
    }

    #[tokio::test]
    async fn test_request_for_ref_unknown_id() {
        let client = test_client(CapSet::default(), CapSet::default());
        let r = Reference::new(&client, "never-solved".to_string(), None);
        assert!(matches!(
            client.request_for_ref(Some(&r)).unwrap_err(),
            GatewayError::MissingRequest { .. }
        ));

        // no ref at all falls back to an empty request
        let empty = client.request_for_ref(None).unwrap();
        assert!(empty.definition.is_some());
    }

    #[tokio::test]
    async fn test_run_multi_ref_requires_return_map() {
        // a daemon without return support runs in legacy mode, so run
        // fails on the capability check without touching the network
        let client = test_client(
            CapSet::from_list(&caps::default_frontend_caps()),
            CapSet::default(),
        );

        let err = client
            .run(|c| async move {
                let mut res = BuildResult::new();
                res.add_ref("a", Some(Reference::new(&c, "x".to_string(), None)));
                res.add_ref("b", Some(Reference::new(&c, "y".to_string(), None)));
                Ok(Some(res))
            })
            .await
            .unwrap_err();
        assert!(err.is_missing_capability(frontend::RETURN_MAP));
    }

    #[tokio::test]
    async fn test_run_without_result_in_legacy_mode() {
        let client = test_client(
            CapSet::from_list(&caps::default_frontend_caps()),
            CapSet::default(),
        );
        assert!(client.run(|_| async move { Ok(None) }).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_preserves_build_error_in_legacy_mode() {
        let client = test_client(
            CapSet::from_list(&caps::default_frontend_caps()),
            CapSet::default(),
        );
        let err = client
            .run(|_| async move {
                Err(GatewayError::Protocol { reason: "front fell off".to_string() })
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "front fell off");
    }

    #[tokio::test]
    async fn test_resolve_source_metadata_passes_through_other_schemes() {
        // without the unified resolver, only image schemes are resolved
        // client-side; everything else passes through untouched
        let client = test_client(caps_of(&[frontend::SOLVE_BASE]), CapSet::default());
        let op = ops::SourceOp {
            identifier: "git://github.com/moby/buildkit".to_string(),
            ..Default::default()
        };
        let resp =
            client.resolve_source_metadata(op.clone(), &ResolveOpt::default()).await.unwrap();
        assert_eq!(resp.op, op);
        assert!(resp.image.is_none());
    }

    #[test]
    fn test_split_scheme() {
        assert_eq!(split_scheme("docker-image://alpine"), Some(("docker-image", "alpine")));
        assert_eq!(
            split_scheme("oci-layout://store@sha256:abc"),
            Some(("oci-layout", "store@sha256:abc"))
        );
        assert_eq!(split_scheme("local://context"), None);
    }

    #[test]
    fn test_error_status_encoding() {
        let rpc = GatewayError::Rpc(tonic::Status::not_found("missing"));
        let st = error_status(&rpc);
        assert_eq!(st.code, tonic::Code::NotFound as i32);
        assert_eq!(st.message, "missing");

        let other = GatewayError::Protocol { reason: "boom".to_string() };
        let st = error_status(&other);
        assert_eq!(st.code, tonic::Code::Unknown as i32);
        assert_eq!(st.message, "boom");
    }

    #[tokio::test]
    async fn test_read_frontend_definition() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("frontend.bin");
        assert!(read_frontend_definition(&missing).await.unwrap().is_none());

        let def = ops::Definition {
            def: vec![b"node0".to_vec()],
            metadata: HashMap::new(),
        };
        let path = dir.path().join("present.bin");
        std::fs::write(&path, def.encode_to_vec()).unwrap();

        let loaded = read_frontend_definition(&path).await.unwrap().unwrap();
        assert_eq!(loaded, def);
    }
}
