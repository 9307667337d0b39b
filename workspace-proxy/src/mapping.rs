//! The front-proxy mapping file: a YAML list of path prefixes to backend
//! shards, written once at boot and handed to the spawned proxy process via
//! `--mapping-file`.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

/// One routed prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingEntry {
    /// Path prefix this entry routes, e.g. `/clusters/root`.
    pub path: String,
    /// Backend shard's base URL.
    pub backend: String,
    /// PEM-encoded CA bundle used to verify `backend`.
    pub backend_server_ca: String,
    /// PEM-encoded client certificate the proxy presents to `backend`.
    pub proxy_client_cert: String,
    /// PEM-encoded client key paired with `proxy_client_cert`.
    pub proxy_client_key: String,
}

/// The full mapping document: an ordered list of [`MappingEntry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Mapping(pub Vec<MappingEntry>);

impl Mapping {
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let yaml = serde_yaml::to_string(&self.0)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(path, yaml)
    }

    pub fn read_from(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let entries: Vec<MappingEntry> =
            serde_yaml::from_str(&text).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(Mapping(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, backend: &str) -> MappingEntry {
        MappingEntry {
            path: path.to_owned(),
            backend: backend.to_owned(),
            backend_server_ca: "ca-pem".to_owned(),
            proxy_client_cert: "cert-pem".to_owned(),
            proxy_client_key: "key-pem".to_owned(),
        }
    }

    #[test]
    fn round_trips_at_least_two_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mapping.yaml");
        let mapping = Mapping(vec![
            entry("/clusters/root", "https://root-shard:6443"),
            entry("/clusters/org-a", "https://org-a-shard:6443"),
        ]);
        mapping.write_to(&file).unwrap();

        let read_back = Mapping::read_from(&file).unwrap();
        assert_eq!(read_back, mapping);
        assert!(read_back.0.len() >= 2);
    }
}
