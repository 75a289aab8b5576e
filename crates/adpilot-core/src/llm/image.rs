//! Generative image collaborator.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::errors::AgentError;

/// Image bytes decoded from a generation response.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Text the model returned next to the image, if any.
    pub caption: Option<String>,
}

impl GeneratedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }

    /// Writes the image as `<dir>/<stem>.<ext>`, creating `dir` if needed.
    pub async fn save(&self, dir: &Path, stem: &str) -> Result<PathBuf, AgentError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{}", stem, self.extension()));
        tokio::fs::write(&path, &self.bytes).await?;
        log::info!("Saved generated image to {}", path.display());
        Ok(path)
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AgentError>;
}
