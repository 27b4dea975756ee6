//! Deterministic appliance object names.
//!
//! Names are derived from the routing inputs alone so that re-running a
//! provision for the same intent always addresses the same objects. The
//! appliance uses `.` and `/` as path separators in its own addressing, so
//! both are replaced with `_`.
//!
//! Plain inputs (no `_` in host or path, path empty or rooted at `/`) map
//! onto readable names that can be reversed by eye. Anything else gets a
//! short digest suffix of the raw inputs so that, for example, `/a_b` and
//! `/a/b` never share a policy.

use sha2::{Digest, Sha256};

/// Path segment used when an intent routes on host only.
pub const NIL_PATH: &str = "nilpath";

const DIGEST_LEN: usize = 4;

/// Name of the load-balancing vserver fronting every path of `host`.
pub fn lb_name(_namespace: &str, host: &str) -> String {
    let mut name = format!("lb_{}", sanitize(host));
    if !is_plain_host(host) {
        name.push('-');
        name.push_str(&digest(&[host]));
    }
    name
}

/// Name of the content-switching policy for `(host, path)`.
pub fn policy_name(_namespace: &str, host: &str, path: &str) -> String {
    format!("{}_policy", route_stem(host, path))
}

/// Name of the content-switching action for `(host, path)`.
pub fn action_name(_namespace: &str, host: &str, path: &str) -> String {
    format!("{}_action", route_stem(host, path))
}

/// Name of the content-switching vserver for a caller-side route group.
pub fn cs_vserver_name(namespace: &str, group: &str) -> String {
    format!("cs_{}_{}", namespace, group)
}

fn route_stem(host: &str, path: &str) -> String {
    let path_segment = if path.is_empty() {
        NIL_PATH.to_string()
    } else {
        path.replace('/', "_")
    };

    let mut stem = format!("{}-{}", sanitize(host), path_segment);
    if !is_plain_host(host) || !is_plain_path(path) {
        stem.push('-');
        stem.push_str(&digest(&[host, path]));
    }
    stem
}

fn sanitize(segment: &str) -> String {
    segment.replace(['.', '/'], "_")
}

fn is_plain_host(host: &str) -> bool {
    !host.contains(['_', '/'])
}

fn is_plain_path(path: &str) -> bool {
    path.is_empty() || (path.starts_with('/') && !path.contains('_'))
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize()[..DIGEST_LEN]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
