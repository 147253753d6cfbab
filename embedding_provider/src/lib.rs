//! Local ONNX text embedder used as the dense-vector producer for the
//! hybrid retriever.

pub mod config;
pub mod embedder;

pub use config::{default_stdio_config, OnnxStdIoDefaults, ONNX_STDIO_DEFAULTS};
pub use embedder::{Embedder, EmbedderError, EmbedderInfo, OnnxStdIoConfig, OnnxStdIoEmbedder, ProviderKind};
