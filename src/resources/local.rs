//! Resources read from a local directory tree

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ResourceError, ResourceScope, ResourceStore};

/// Reads `<root>/<project>[/<stage>[/<service>]]/<name>`
pub struct LocalResourceStore {
    root: PathBuf,
}

impl LocalResourceStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resource_path(&self, scope: &ResourceScope, name: &str) -> PathBuf {
        self.root.join(scope.path()).join(name)
    }
}

#[async_trait]
impl ResourceStore for LocalResourceStore {
    async fn get_resource(
        &self,
        scope: &ResourceScope,
        name: &str,
    ) -> Result<Option<String>, ResourceError> {
        let path = self.resource_path(scope, name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResourceError::Io(format!("{}: {}", path.display(), e))),
        }
    }
}
