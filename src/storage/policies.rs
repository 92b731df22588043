//! Selector policies stored as one JSON document per resort.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::SelectorPolicy;

/// A directory of `<name>.json` policy documents.
#[derive(Debug, Clone)]
pub struct PolicyDirectory {
    dir: PathBuf,
}

impl PolicyDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the policy for a mountain by name.
    pub async fn load(&self, name: &str) -> Result<SelectorPolicy> {
        let path = self.dir.join(format!("{name}.json"));
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::config(format!(
                    "no policy for '{}' in {}",
                    name,
                    self.dir.display()
                )));
            }
            Err(e) => return Err(AppError::Io(e)),
        };
        SelectorPolicy::from_json(&json)
    }

    /// Names of every stored policy, sorted.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load every stored policy. Unreadable documents are logged and skipped.
    pub async fn load_all(&self) -> Result<Vec<SelectorPolicy>> {
        let mut policies = Vec::new();
        for name in self.names().await? {
            match self.load(&name).await {
                Ok(policy) => policies.push(policy),
                Err(e) => log::warn!("Skipping policy '{}': {}", name, e),
            }
        }
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::tests::SAME_PAGE_READ;

    #[tokio::test]
    async fn test_load_by_name_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("copper-mountain.json"), SAME_PAGE_READ).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let policies = PolicyDirectory::new(dir.path());

        assert_eq!(
            policies.names().await.unwrap(),
            vec!["broken".to_string(), "copper-mountain".to_string()]
        );
        let policy = policies.load("copper-mountain").await.unwrap();
        assert_eq!(policy.id, 3);
        assert!(matches!(
            policies.load("broken").await,
            Err(AppError::Json(_))
        ));

        let all = policies.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PolicyDirectory::new(dir.path())
            .load("nowhere")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
