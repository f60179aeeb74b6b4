//! Client stub for the bridge service.
//!
//! Hand-written mirror of the stub `tonic-build` would generate for the
//! service, kept in source so the crate builds without a protobuf
//! toolchain. Method paths follow the daemon's registered service name
//! and must stay in sync with it.

use crate::bridge::*;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::*;

const SERVICE: &str = "moby.buildkit.v1.frontend.LLBBridge";

/// Typed client for the daemon's bridge service.
#[derive(Debug, Clone)]
pub struct LlbBridgeClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> LlbBridgeClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    pub fn new(inner: T) -> Self {
        Self { inner: tonic::client::Grpc::new(inner) }
    }

    /// Limit the maximum size of a decoded message.
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Limit the maximum size of an encoded message.
    pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_encoding_message_size(limit);
        self
    }

    async fn ready(&mut self) -> std::result::Result<(), tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
        })
    }

    pub async fn ping(
        &mut self,
        request: impl tonic::IntoRequest<PingRequest>,
    ) -> std::result::Result<tonic::Response<PongResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Ping");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Ping"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn solve(
        &mut self,
        request: impl tonic::IntoRequest<SolveRequest>,
    ) -> std::result::Result<tonic::Response<SolveResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Solve");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Solve"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn resolve_image_config(
        &mut self,
        request: impl tonic::IntoRequest<ResolveImageConfigRequest>,
    ) -> std::result::Result<tonic::Response<ResolveImageConfigResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path =
            PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ResolveImageConfig");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ResolveImageConfig"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn resolve_source_meta(
        &mut self,
        request: impl tonic::IntoRequest<ResolveSourceMetaRequest>,
    ) -> std::result::Result<tonic::Response<ResolveSourceMetaResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path =
            PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ResolveSourceMeta");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ResolveSourceMeta"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn read_file(
        &mut self,
        request: impl tonic::IntoRequest<ReadFileRequest>,
    ) -> std::result::Result<tonic::Response<ReadFileResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ReadFile");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ReadFile"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn read_dir(
        &mut self,
        request: impl tonic::IntoRequest<ReadDirRequest>,
    ) -> std::result::Result<tonic::Response<ReadDirResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ReadDir");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ReadDir"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn stat_file(
        &mut self,
        request: impl tonic::IntoRequest<StatFileRequest>,
    ) -> std::result::Result<tonic::Response<StatFileResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/StatFile");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "StatFile"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn evaluate(
        &mut self,
        request: impl tonic::IntoRequest<EvaluateRequest>,
    ) -> std::result::Result<tonic::Response<EvaluateResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Evaluate");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Evaluate"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn warn(
        &mut self,
        request: impl tonic::IntoRequest<WarnRequest>,
    ) -> std::result::Result<tonic::Response<WarnResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Warn");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Warn"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn inputs(
        &mut self,
        request: impl tonic::IntoRequest<InputsRequest>,
    ) -> std::result::Result<tonic::Response<InputsResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Inputs");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Inputs"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn new_container(
        &mut self,
        request: impl tonic::IntoRequest<NewContainerRequest>,
    ) -> std::result::Result<tonic::Response<NewContainerResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/NewContainer");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "NewContainer"));
        self.inner.unary(req, path, codec).await
    }

    pub async fn release_container(
        &mut self,
        request: impl tonic::IntoRequest<ReleaseContainerRequest>,
    ) -> std::result::Result<tonic::Response<ReleaseContainerResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path =
            PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ReleaseContainer");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ReleaseContainer"));
        self.inner.unary(req, path, codec).await
    }

    /// The multiplexed exec stream. Opened at most once per client; all
    /// container process traffic shares it.
    pub async fn exec_process(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = ExecMessage>,
    ) -> std::result::Result<tonic::Response<tonic::codec::Streaming<ExecMessage>>, tonic::Status>
    {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/ExecProcess");
        let mut req = request.into_streaming_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "ExecProcess"));
        self.inner.streaming(req, path, codec).await
    }

    pub async fn r#return(
        &mut self,
        request: impl tonic::IntoRequest<ReturnRequest>,
    ) -> std::result::Result<tonic::Response<ReturnResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static("/moby.buildkit.v1.frontend.LLBBridge/Return");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(SERVICE, "Return"));
        self.inner.unary(req, path, codec).await
    }
}
