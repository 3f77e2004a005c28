//! Artifact rendering collaborator.
//!
//! Turns a verification URL into a displayable payload. Image encoding
//! proper (e.g. QR rasterization) is delegated to deployments that plug
//! in their own renderer; the shipped implementation emits a data URL
//! that scanner-side tooling can decode.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors that can occur while rendering a verification artifact.
#[derive(Debug, Error)]
pub enum RenderError {
	/// The renderer backend failed.
	#[error("Render failed: {0}")]
	Backend(String),
}

/// Trait defining the artifact rendering collaborator.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
	/// Renders a verification URL into an opaque displayable payload.
	async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Renderer that encodes the verification URL as a base64 data URL.
pub struct DataUrlRenderer;

#[async_trait]
impl ArtifactRenderer for DataUrlRenderer {
	async fn render(&self, url: &str) -> Result<String, RenderError> {
		Ok(format!("data:text/plain;base64,{}", STANDARD.encode(url)))
	}
}
