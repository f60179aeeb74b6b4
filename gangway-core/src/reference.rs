//! Typed handles to daemon-side build results.
//!
//! A reference is produced by a solve and stays valid until the client
//! that produced it is released. It carries a back-pointer to that
//! client; ownership is unidirectional, the client holds no pointers to
//! its references.

use crate::caps::frontend;
use crate::client::GatewayClient;
use crate::error::{GatewayError, Result};
use crate::types::{ReadDirRequest, ReadRequest, StatRequest};
use gangway_api::bridge;
use gangway_api::ops;

/// A handle to a build artifact held by the daemon.
#[derive(Debug, Clone)]
pub struct Reference {
    pub(crate) id: String,
    pub(crate) def: Option<ops::Definition>,
    pub(crate) client: GatewayClient,
}

impl Reference {
    pub(crate) fn new(client: &GatewayClient, id: String, def: Option<ops::Definition>) -> Self {
        Self { id, def, client: client.clone() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The build definition that produced this reference, turned back
    /// into a graph state usable as a solve input.
    pub fn to_state(&self) -> Result<ops::Definition> {
        self.client.caps().supports(frontend::REFERENCE_OUTPUT)?;
        self.def.clone().ok_or_else(|| GatewayError::Protocol {
            reason: "daemon did not return reference with definition".to_string(),
        })
    }

    /// Force materialization of the result behind this reference.
    pub async fn evaluate(&self) -> Result<()> {
        let req = bridge::EvaluateRequest { r#ref: self.id.clone() };
        self.client.bridge().evaluate(req).await?;
        Ok(())
    }

    /// Read a file (or a byte range of it) out of the result.
    pub async fn read_file(&self, req: ReadRequest) -> Result<Vec<u8>> {
        let mut rfr = bridge::ReadFileRequest {
            r#ref: self.id.clone(),
            file_path: req.filename,
            range: None,
        };
        if let Some(r) = req.range {
            rfr.range = Some(bridge::FileRange { offset: r.offset as i64, length: r.length as i64 });
        }
        let resp = self.client.bridge().read_file(rfr).await?;
        Ok(resp.into_inner().data)
    }

    /// List a directory of the result.
    pub async fn read_dir(&self, req: ReadDirRequest) -> Result<Vec<bridge::Stat>> {
        self.client.caps().supports(frontend::READ_DIR)?;
        let rdr = bridge::ReadDirRequest {
            r#ref: self.id.clone(),
            dir_path: req.path,
            include_pattern: req.include_pattern,
        };
        let resp = self.client.bridge().read_dir(rdr).await?;
        Ok(resp.into_inner().entries)
    }

    /// Stat a path of the result.
    pub async fn stat_file(&self, req: StatRequest) -> Result<bridge::Stat> {
        self.client.caps().supports(frontend::STAT_FILE)?;
        let sfr = bridge::StatFileRequest { r#ref: self.id.clone(), path: req.path };
        let resp = self.client.bridge().stat_file(sfr).await?;
        Ok(resp.into_inner().stat.unwrap_or_default())
    }
}
