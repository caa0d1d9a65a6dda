//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod efa_transit_adapter;
mod ollama_inference_adapter;
mod system_clock;

pub use efa_transit_adapter::{EfaTransitAdapter, map_efa_error};
pub use ollama_inference_adapter::OllamaInferenceAdapter;
pub use system_clock::SystemClock;
