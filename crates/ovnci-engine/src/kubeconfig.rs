//! Kubeconfig server rewrite.

use camino::Utf8Path;
use serde_yaml::Value;

use ovnci_utils::atomic_write::write_file_atomic;
use ovnci_utils::error::{ClusterError, OvnCiError, Result};

/// Point every cluster entry of a kubeconfig document at `server`.
///
/// Returns the rewritten document and the number of entries changed.
pub fn rewrite_server_in(content: &str, server: &str) -> std::result::Result<(String, usize), String> {
    let mut doc: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

    let clusters = doc
        .get_mut("clusters")
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| "missing 'clusters' list".to_string())?;

    let mut rewritten = 0;
    for (i, entry) in clusters.iter_mut().enumerate() {
        let cluster = entry
            .get_mut("cluster")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| format!("clusters[{i}] has no 'cluster' mapping"))?;
        cluster.insert(
            Value::String("server".to_string()),
            Value::String(server.to_string()),
        );
        rewritten += 1;
    }

    let rendered = serde_yaml::to_string(&doc).map_err(|e| e.to_string())?;
    Ok((rendered, rewritten))
}

/// Rewrite the kubeconfig at `path` in place.
pub fn rewrite_server(path: &Utf8Path, server: &str) -> Result<usize> {
    let invalid = |reason: String| -> OvnCiError {
        ClusterError::KubeconfigInvalid {
            path: path.to_string(),
            reason,
        }
        .into()
    };

    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let (rendered, rewritten) = rewrite_server_in(&content, server).map_err(invalid)?;

    write_file_atomic(path, &rendered).map_err(|e| OvnCiError::filesystem(path, format!("{e:#}")))?;
    tracing::info!(path = %path, server = %server, clusters = rewritten, "Rewrote kubeconfig server");

    Ok(rewritten)
}
