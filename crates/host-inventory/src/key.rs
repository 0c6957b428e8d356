//! Durable host keys.
//!
//! A binding reference is the string form `<namespace>/<name>`. Decoding
//! rejects malformed keys with a parse error rather than returning an empty
//! result, so a corrupted annotation surfaces instead of silently unbinding.

use crate::error::StoreError;
use crds::BareMetalHost;

/// Encodes a durable key for a host identified by namespace and name.
pub fn host_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Encodes the durable key for a host record.
pub fn host_key_for(host: &BareMetalHost) -> Result<String, StoreError> {
    let name = host
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| StoreError::MissingMetadata("host has no name".to_string()))?;
    let namespace = host
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| StoreError::MissingMetadata(format!("host {name} has no namespace")))?;
    Ok(host_key(namespace, name))
}

/// Decodes a durable key into `(namespace, name)`.
pub fn parse_host_key(key: &str) -> Result<(String, String), StoreError> {
    match key.split('/').collect::<Vec<_>>().as_slice() {
        [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
            Ok(((*namespace).to_string(), (*name).to_string()))
        }
        _ => Err(StoreError::MalformedKey(key.to_string())),
    }
}
