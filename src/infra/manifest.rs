use std::{fs::File, io::BufReader, path::Path};

use tracing::debug;

use crate::{application::build::Manifest, infra::error::InfraError};

/// Read a JSON build manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest, InfraError> {
    let file = File::open(path).map_err(|err| InfraError::manifest(path, err.to_string()))?;
    let manifest: Manifest = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| InfraError::manifest(path, err.to_string()))?;

    debug!(
        path = %path.display(),
        comments = manifest.comments.len(),
        symbols = manifest.symbols.len(),
        pages = manifest.pages.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_comments_symbols_and_pages() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{
                "comments": [{"name": "gtk_init", "description": "Start up."}],
                "symbols": [{"kind": "function", "unique_name": "gtk_init"}],
                "pages": [{"source_file": "core.md", "symbols": ["gtk_init"]}]
            }"#,
        )
        .expect("write");

        let manifest = load_manifest(&path).expect("manifest");

        assert_eq!(manifest.comments[0].description, "Start up.");
        assert_eq!(manifest.symbols.len(), 1);
        assert_eq!(manifest.pages[0].source_file, "core.md");
    }

    #[test]
    fn malformed_manifests_name_the_file() {
        let dir = tempfile::tempdir().expect("dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");

        let err = load_manifest(&path).expect_err("malformed");

        assert!(matches!(err, InfraError::Manifest { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
