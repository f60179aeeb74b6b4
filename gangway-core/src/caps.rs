//! Capability negotiation.
//!
//! Features are gated by named capabilities exchanged during the Ping
//! handshake, never by version numbers. Two independent sets are
//! carried: the frontend API set (what bridge RPCs and fields the daemon
//! understands) and the LLB set (what graph nodes it can solve).
//!
//! Daemons that predate capability negotiation return empty lists; the
//! client substitutes the frozen default sets below so those daemons
//! keep working.

use crate::error::{GatewayError, Result};
use gangway_api::bridge::ApiCap;
use std::collections::HashMap;

/// Frontend API capability ids.
pub mod frontend {
    pub const SOLVE_BASE: &str = "solve.base";
    pub const SOLVE_INLINE_RETURN: &str = "solve.inlinereturn";
    pub const RESOLVE_IMAGE: &str = "resolveimage";
    pub const READ_FILE: &str = "readfile";
    pub const RETURN_RESULT: &str = "return";
    pub const RETURN_MAP: &str = "returnmap";
    pub const READ_DIR: &str = "readdir";
    pub const STAT_FILE: &str = "statfile";
    pub const IMPORT_CACHES: &str = "importcaches";
    pub const PROTO_REF_ARRAY: &str = "proto.refarray";
    pub const REFERENCE_OUTPUT: &str = "reference.output";
    pub const FRONTEND_INPUTS: &str = "frontend.inputs";
    pub const GATEWAY_SOLVE_METADATA: &str = "gateway.solvemetadata";
    pub const GATEWAY_EXEC: &str = "gateway.exec";
    pub const GATEWAY_EXEC_SECRET_ENV: &str = "gateway.exec.secretenv";
    pub const GATEWAY_EVALUATE_SOLVE: &str = "gateway.evaluatesolve";
    pub const GATEWAY_EVALUATE: &str = "gateway.evaluate";
    pub const GATEWAY_WARNINGS: &str = "gateway.warnings";
    pub const SOURCE_META_RESOLVER: &str = "source.metaresolver";
}

/// LLB capability ids checked against per-node metadata.
pub mod llb {
    pub const SOURCE_IMAGE: &str = "source.image";
    pub const SOURCE_LOCAL: &str = "source.local";
    pub const SOURCE_LOCAL_UNIQUE: &str = "source.local.unique";
    pub const SOURCE_LOCAL_SESSION_ID: &str = "source.local.sessionid";
    pub const SOURCE_LOCAL_INCLUDE_PATTERNS: &str = "source.local.includepatterns";
    pub const SOURCE_LOCAL_FOLLOW_PATHS: &str = "source.local.followpaths";
    pub const SOURCE_LOCAL_EXCLUDE_PATTERNS: &str = "source.local.excludepatterns";
    pub const SOURCE_LOCAL_SHARED_KEY_HINT: &str = "source.local.sharedkeyhint";
    pub const SOURCE_GIT: &str = "source.git";
    pub const SOURCE_GIT_KEEP_DIR: &str = "source.git.keepgitdir";
    pub const SOURCE_GIT_FULL_URL: &str = "source.git.fullurl";
    pub const SOURCE_HTTP: &str = "source.http";
    pub const SOURCE_HTTP_CHECKSUM: &str = "source.http.checksum";
    pub const SOURCE_HTTP_PERM: &str = "source.http.perm";
    pub const SOURCE_HTTP_UID_GID: &str = "source.http.uidgid";
    pub const BUILD_OP_LLB_FILE_NAME: &str = "source.buildop.llbfilename";
    pub const EXEC_META_BASE: &str = "exec.meta.base";
    pub const EXEC_META_PROXY: &str = "exec.meta.proxyenv";
    pub const EXEC_MOUNT_BIND: &str = "exec.mount.bind";
    pub const EXEC_MOUNT_CACHE: &str = "exec.mount.cache";
    pub const EXEC_MOUNT_CACHE_SHARING: &str = "exec.mount.cachesharing";
    pub const EXEC_MOUNT_SELECTOR: &str = "exec.mount.selector";
    pub const EXEC_MOUNT_TMPFS: &str = "exec.mount.tmpfs";
    pub const EXEC_MOUNT_SECRET: &str = "exec.mount.secret";
    pub const CONSTRAINTS: &str = "constraints";
    pub const PLATFORM: &str = "platform";
    pub const META_IGNORE_CACHE: &str = "meta.ignorecache";
    pub const META_DESCRIPTION: &str = "meta.description";
    pub const META_EXPORT_CACHE: &str = "meta.exportcache";
}

/// An immutable set of named capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapSet {
    caps: HashMap<String, bool>,
}

impl CapSet {
    /// Build a set from a wire capability list.
    pub fn from_list(list: &[ApiCap]) -> Self {
        let caps = list.iter().map(|c| (c.id.clone(), c.enabled)).collect();
        Self { caps }
    }

    /// Succeeds exactly when `id` is present and enabled.
    pub fn supports(&self, id: &str) -> Result<()> {
        match self.caps.get(id) {
            Some(true) => Ok(()),
            _ => Err(GatewayError::MissingCapability { id: id.to_string() }),
        }
    }

    /// Whether `id` is present and enabled.
    pub fn contains(&self, id: &str) -> bool {
        self.supports(id).is_ok()
    }
}

fn enabled(ids: &[&str]) -> Vec<ApiCap> {
    ids.iter().map(|id| ApiCap { id: (*id).to_string(), enabled: true }).collect()
}

/// The frontend API capabilities that were implemented when capability
/// negotiation was added. This list is frozen and must never change.
pub fn default_frontend_caps() -> Vec<ApiCap> {
    enabled(&[
        frontend::SOLVE_BASE,
        frontend::SOLVE_INLINE_RETURN,
        frontend::RESOLVE_IMAGE,
        frontend::READ_FILE,
    ])
}

/// The LLB capabilities that were implemented when capability
/// negotiation was added. This list is frozen and must never change.
pub fn default_llb_caps() -> Vec<ApiCap> {
    enabled(&[
        llb::SOURCE_IMAGE,
        llb::SOURCE_LOCAL,
        llb::SOURCE_LOCAL_UNIQUE,
        llb::SOURCE_LOCAL_SESSION_ID,
        llb::SOURCE_LOCAL_INCLUDE_PATTERNS,
        llb::SOURCE_LOCAL_FOLLOW_PATHS,
        llb::SOURCE_LOCAL_EXCLUDE_PATTERNS,
        llb::SOURCE_LOCAL_SHARED_KEY_HINT,
        llb::SOURCE_GIT,
        llb::SOURCE_GIT_KEEP_DIR,
        llb::SOURCE_GIT_FULL_URL,
        llb::SOURCE_HTTP,
        llb::SOURCE_HTTP_CHECKSUM,
        llb::SOURCE_HTTP_PERM,
        llb::SOURCE_HTTP_UID_GID,
        llb::BUILD_OP_LLB_FILE_NAME,
        llb::EXEC_META_BASE,
        llb::EXEC_META_PROXY,
        llb::EXEC_MOUNT_BIND,
        llb::EXEC_MOUNT_CACHE,
        llb::EXEC_MOUNT_CACHE_SHARING,
        llb::EXEC_MOUNT_SELECTOR,
        llb::EXEC_MOUNT_TMPFS,
        llb::EXEC_MOUNT_SECRET,
        llb::CONSTRAINTS,
        llb::PLATFORM,
        llb::META_IGNORE_CACHE,
        llb::META_DESCRIPTION,
        llb::META_EXPORT_CACHE,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_present_and_enabled() {
        let set = CapSet::from_list(&[
            ApiCap { id: "a".to_string(), enabled: true },
            ApiCap { id: "b".to_string(), enabled: false },
        ]);

        assert!(set.supports("a").is_ok());
        assert!(set.supports("b").is_err());
        assert!(set.supports("c").is_err());
    }

    #[test]
    fn test_supports_names_missing_capability() {
        let set = CapSet::default();
        let err = set.supports(frontend::GATEWAY_EXEC).unwrap_err();
        assert!(err.is_missing_capability(frontend::GATEWAY_EXEC));
        assert!(err.to_string().contains("gateway.exec"));
    }

    #[test]
    fn test_default_sets_are_enabled() {
        let caps = CapSet::from_list(&default_frontend_caps());
        assert!(caps.supports(frontend::SOLVE_BASE).is_ok());
        assert!(caps.supports(frontend::SOLVE_INLINE_RETURN).is_ok());
        assert!(caps.supports(frontend::RESOLVE_IMAGE).is_ok());
        assert!(caps.supports(frontend::READ_FILE).is_ok());
        // anything newer must be announced explicitly
        assert!(caps.supports(frontend::RETURN_RESULT).is_err());
        assert!(caps.supports(frontend::GATEWAY_EXEC).is_err());

        let llb_caps = CapSet::from_list(&default_llb_caps());
        assert!(llb_caps.supports(llb::SOURCE_IMAGE).is_ok());
        assert!(llb_caps.supports(llb::EXEC_MOUNT_SECRET).is_ok());
        assert!(llb_caps.supports("exec.mount.ssh").is_err());
    }
}
