//! Async file-based config source.
//!
//! [`FileSource`] implements [`ConfigSource`] for any file format by
//! accepting a deserialization function at construction time. It reads
//! the file through Tokio and validates the result before handing it
//! to the caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::ConfigSource;
use crate::error::ForwarderError;

type Deserialize = fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[cfg(feature = "yaml")]
    #[must_use]
    pub fn yaml(path: PathBuf) -> Self {
        Self::new(path, "yaml", |content| {
            serde_yml::from_str::<Config>(content)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
        })
    }

    #[cfg(feature = "json")]
    #[must_use]
    pub fn json(path: PathBuf) -> Self {
        Self::new(path, "json", |content| {
            serde_json::from_str::<Config>(content)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
        })
    }

    #[cfg(feature = "toml")]
    #[must_use]
    pub fn toml(path: PathBuf) -> Self {
        Self::new(path, "toml", |content| {
            toml::from_str::<Config>(content)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
        })
    }

    /// Pick the deserializer from the file extension.
    pub fn for_path(path: &Path) -> Result<Self, ForwarderError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::yaml(path.to_path_buf())),

            #[cfg(feature = "json")]
            "json" => Ok(Self::json(path.to_path_buf())),

            #[cfg(feature = "toml")]
            "toml" => Ok(Self::toml(path.to_path_buf())),

            other => Err(ForwarderError::UnsupportedFormat(other.to_string())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, ForwarderError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ForwarderError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                ForwarderError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<Config, ForwarderError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| ForwarderError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        validate(&config).map_err(|errors| ForwarderError::ConfigValidation { errors })?;

        Ok(config)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_and_validates_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.json");
        std::fs::write(
            &path,
            r#"{"routes": [{"prefix": "/a", "primary": {"url": "http://a:80/"}}]}"#,
        )
        .unwrap();

        let source = FileSource::for_path(&path).unwrap();
        assert_eq!(source.name(), "json");
        let config = source.load().await.unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.timeout, 5000);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::json(PathBuf::from("/nonexistent/forwarder.json"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, ForwarderError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.json");
        std::fs::write(&path, r#"{"routes": []}"#).unwrap();

        let err = FileSource::json(path).load().await.unwrap_err();
        assert!(matches!(err, ForwarderError::ConfigValidation { .. }));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = FileSource::for_path(Path::new("forwarder.xml"))
            .err()
            .unwrap();
        assert!(matches!(err, ForwarderError::UnsupportedFormat(ref e) if e == "xml"));
    }
}
