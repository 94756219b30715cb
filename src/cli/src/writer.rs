//! Manifest sinks: per-cluster directory tree and stdout

use rolegen_core::CoreError;
use rolegen_rbac::{GeneratedManifest, GeneratedManifestSet, ManifestSink, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Directory name holding cluster-scoped objects of a cluster
pub const CLUSTER_SCOPE_DIR: &str = "_cluster";

/// Marker left in every cluster directory this sink writes
pub const MARKER_FILE: &str = ".rolegen-managed";

/// Writes one file per object and target cluster:
/// `<root>/<cluster>/<namespace>/<kind>-<name>.yaml` for namespaced objects,
/// `<root>/<cluster>/_cluster/<kind>-<name>.yaml` for cluster-scoped ones
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    prune: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prune: false,
        }
    }

    /// Remove cluster directories left over from earlier runs before writing
    ///
    /// Only directories carrying the marker file are removed.
    pub fn pruning(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative location of an object within one cluster's tree
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster or namespace is not a single plain
    /// path segment.
    pub fn relative_path(manifest: &GeneratedManifest, cluster: &str) -> Result<PathBuf> {
        let scope = manifest.namespace.as_deref().unwrap_or(CLUSTER_SCOPE_DIR);
        let file = format!(
            "{}-{}.yaml",
            manifest.object.kind().to_lowercase(),
            manifest.object.name()
        );
        for segment in [cluster, scope, file.as_str()] {
            if !is_plain_segment(segment) {
                return Err(CoreError::configuration(format!(
                    "refusing to write '{}' outside its cluster directory",
                    segment
                ))
                .into());
            }
        }
        Ok(PathBuf::from(cluster).join(scope).join(file))
    }

    fn prune_clusters(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if path.join(MARKER_FILE).is_file() {
                debug!(path = %path.display(), "pruning stale cluster directory");
                std::fs::remove_dir_all(&path)?;
            } else {
                debug!(path = %path.display(), "keeping unmanaged directory");
            }
        }
        Ok(())
    }
}

fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl ManifestSink for DirectorySink {
    fn write(&self, manifests: &GeneratedManifestSet) -> Result<usize> {
        if self.prune {
            self.prune_clusters()?;
        }

        let mut written = 0;
        let mut clusters = BTreeSet::new();
        for manifest in manifests {
            let yaml = manifest.to_yaml()?;
            for cluster in &manifest.clusters {
                let path = self.root.join(Self::relative_path(manifest, cluster)?);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, &yaml)?;
                clusters.insert(cluster.as_str());
                written += 1;
            }
        }

        for cluster in clusters {
            std::fs::write(self.root.join(cluster).join(MARKER_FILE), "")?;
        }

        info!(root = %self.root.display(), files = written, "wrote manifests");
        Ok(written)
    }
}

/// Prints the set as one multi-document YAML stream on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ManifestSink for StdoutSink {
    fn write(&self, manifests: &GeneratedManifestSet) -> Result<usize> {
        let rendered = manifests.render_yaml()?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(manifests.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegen_core::RawDefinition;
    use rolegen_rbac::{Generator, TemplateCatalog};

    fn manifests() -> GeneratedManifestSet {
        let records = vec![
            RawDefinition::new("foo", "oncall")
                .with_namespaces(&["payments"])
                .with_clusters(&["prod-eu", "prod-us"]),
            RawDefinition::new("foo", "oncall")
                .with_namespaces(&["ledger"])
                .with_clusters(&["prod-eu"])
                .reusing(),
        ];
        Generator::new(TemplateCatalog::builtin())
            .unwrap()
            .generate(&records)
            .unwrap()
            .manifests
            .unwrap()
    }

    #[test]
    fn test_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        let written = DirectorySink::new(dir.path()).write(&manifests()).unwrap();

        // ClusterRole + ClusterRoleBinding on 2 clusters, Role + RoleBinding on 3 scopes
        assert_eq!(written, 10);

        let root = dir.path();
        assert!(root.join("prod-eu/_cluster/clusterrole-impersonate-foo.yaml").is_file());
        assert!(root.join("prod-us/_cluster/clusterrolebinding-auth-foo.yaml").is_file());
        assert!(root.join("prod-eu/ledger/role-foo.yaml").is_file());
        assert!(root.join("prod-us/payments/rolebinding-foo.yaml").is_file());
        assert!(!root.join("prod-us/ledger").exists());

        let role = std::fs::read_to_string(root.join("prod-eu/payments/role-foo.yaml")).unwrap();
        assert!(role.contains("kind: Role"));
        assert!(role.contains("namespace: payments"));
    }

    #[test]
    fn test_prune_removes_stale_clusters() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("retired-cluster/payments");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("role-foo.yaml"), "stale").unwrap();
        std::fs::write(dir.path().join("retired-cluster").join(MARKER_FILE), "").unwrap();

        DirectorySink::new(dir.path())
            .pruning(true)
            .write(&manifests())
            .unwrap();

        assert!(!dir.path().join("retired-cluster").exists());
        assert!(dir.path().join("prod-eu").is_dir());
        assert!(dir.path().join("prod-eu").join(MARKER_FILE).is_file());
    }

    #[test]
    fn test_prune_keeps_unmanaged_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();

        let sink = DirectorySink::new(dir.path()).pruning(true);
        sink.write(&manifests()).unwrap();
        // second run prunes its own output and nothing else
        sink.write(&manifests()).unwrap();

        assert!(dir.path().join(".git/objects").is_dir());
        assert!(dir.path().join("src/main.rs").is_file());
        assert!(dir.path().join("prod-us/_cluster/clusterrole-impersonate-foo.yaml").is_file());
    }

    #[test]
    fn test_refuses_path_outside_root() {
        let base = tempfile::tempdir().unwrap();
        let out = base.path().join("out");

        let mut set: Vec<GeneratedManifest> = manifests().iter().cloned().collect();
        for manifest in &mut set {
            manifest.clusters = vec!["../escaped".to_string()];
        }
        let set = GeneratedManifestSet::new(set);

        assert!(DirectorySink::new(&out).write(&set).is_err());
        assert!(!base.path().join("escaped").exists());
    }

    #[test]
    fn test_without_prune_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("retired-cluster");
        std::fs::create_dir_all(&stale).unwrap();

        DirectorySink::new(dir.path()).write(&manifests()).unwrap();
        assert!(stale.is_dir());
    }
}
