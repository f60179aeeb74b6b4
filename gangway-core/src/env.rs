//! Frontend process environment decoding.
//!
//! The daemon passes build options to the frontend subprocess through
//! its environment: a session id, the exported product name, a JSON
//! worker list, and one prefixed variable per frontend option.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Prefix of the per-option environment variables. The variable's value
/// is itself of the form `name=value`.
pub const FRONTEND_OPT_PREFIX: &str = "BUILDKIT_FRONTEND_OPT_";
/// Caller-supplied session id.
pub const ENV_SESSION_ID: &str = "BUILDKIT_SESSION_ID";
/// Product name used for capability attribution.
pub const ENV_EXPORTED_PRODUCT: &str = "BUILDKIT_EXPORTEDPRODUCT";
/// JSON-encoded worker info list.
pub const ENV_WORKERS: &str = "BUILDKIT_WORKERS";

/// A worker advertised by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerInfo {
    pub id: String,
    pub labels: HashMap<String, String>,
    pub platforms: Vec<WorkerPlatform>,
}

/// A platform a worker can execute for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPlatform {
    pub architecture: String,
    pub os: String,
    #[serde(rename = "os.version", skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(rename = "os.features", skip_serializing_if = "Vec::is_empty")]
    pub os_features: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

/// Frontend options from the current process environment.
pub fn frontend_opts() -> HashMap<String, String> {
    decode_frontend_opts(std::env::vars())
}

/// Decode frontend options from an environment-shaped iterator.
///
/// Only variables named with [`FRONTEND_OPT_PREFIX`] contribute. The
/// variable value is split on its first `=`; the left side becomes the
/// option key. A value with no `=` yields an empty option value.
pub fn decode_frontend_opts(
    vars: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    let mut opts = HashMap::new();
    for (name, value) in vars {
        if !name.starts_with(FRONTEND_OPT_PREFIX) {
            continue;
        }
        match value.split_once('=') {
            Some((k, v)) => opts.insert(k.to_string(), v.to_string()),
            None => opts.insert(value, String::new()),
        };
    }
    opts
}

/// Encode an option map into `BUILDKIT_FRONTEND_OPT_<n>` variables, the
/// form a daemon uses when launching a frontend. Inverse of
/// [`decode_frontend_opts`].
pub fn encode_frontend_opts(opts: &HashMap<String, String>) -> Vec<(String, String)> {
    opts.iter()
        .enumerate()
        .map(|(i, (k, v))| (format!("{}{}", FRONTEND_OPT_PREFIX, i), format!("{}={}", k, v)))
        .collect()
}

/// Session id from the environment, empty when unset.
pub fn session_id() -> String {
    std::env::var(ENV_SESSION_ID).unwrap_or_default()
}

/// Exported product name from the environment, empty when unset.
pub fn product() -> String {
    std::env::var(ENV_EXPORTED_PRODUCT).unwrap_or_default()
}

/// Worker list from the environment. Malformed JSON yields an empty
/// list rather than a failure.
pub fn workers() -> Vec<WorkerInfo> {
    let raw = std::env::var(ENV_WORKERS).unwrap_or_default();
    match serde_json::from_str(&raw) {
        Ok(w) => w,
        Err(e) => {
            debug!("ignoring malformed {}: {}", ENV_WORKERS, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frontend_opts() {
        let vars = vec![
            ("BUILDKIT_FRONTEND_OPT_0".to_string(), "target=release".to_string()),
            ("BUILDKIT_FRONTEND_OPT_1".to_string(), "build-arg:A=b=c".to_string()),
            ("BUILDKIT_FRONTEND_OPT_2".to_string(), "dangling".to_string()),
            ("BUILDKIT_SESSION_ID".to_string(), "s1".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];

        let opts = decode_frontend_opts(vars);
        assert_eq!(opts.len(), 3);
        assert_eq!(opts["target"], "release");
        // keys split on the first `=` only
        assert_eq!(opts["build-arg:A"], "b=c");
        assert_eq!(opts["dangling"], "");
    }

    #[test]
    fn test_frontend_opt_env_round_trip() {
        let mut opts = HashMap::new();
        opts.insert("target".to_string(), "release".to_string());
        opts.insert("build-arg:A".to_string(), "b=c".to_string());
        opts.insert("empty".to_string(), String::new());

        let decoded = decode_frontend_opts(encode_frontend_opts(&opts));
        assert_eq!(decoded, opts);
    }

    #[test]
    fn test_worker_info_json() {
        let raw = r#"[{"id":"w0","labels":{"org.mobyproject.buildkit.worker.executor":"oci"},
            "platforms":[{"architecture":"amd64","os":"linux"}]}]"#;
        let workers: Vec<WorkerInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].id, "w0");
        assert_eq!(workers[0].platforms[0].os, "linux");

        let bad: std::result::Result<Vec<WorkerInfo>, _> = serde_json::from_str("not json");
        assert!(bad.is_err());
    }
}
