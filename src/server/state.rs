use crate::config::ServerConfig;
use crate::process::Pipeline;

/// Multipart framing allowance on top of the file-size ceiling.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared, read-only state handed to every request.
///
/// Holds no per-request data; concurrent uploads only share the pipeline's
/// immutable configuration and engine handles.
pub struct AppState {
    pub pipeline: Pipeline,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(pipeline: Pipeline, config: ServerConfig) -> Self {
        Self { pipeline, config }
    }

    /// Largest request body accepted before axum rejects it outright.
    pub fn body_limit(&self) -> usize {
        self.pipeline
            .config()
            .max_file_size
            .saturating_add(MULTIPART_OVERHEAD)
    }
}
