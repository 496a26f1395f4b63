//! General Model Orchestration Layer
//!
//! This module defines the core trait for hardware-agnostic model orchestration.
//! It allows the MoFA framework to seamlessly switch between different inference
//! backends (e.g., Apple MLX, HuggingFace Candle, ONNX) depending on the
//! underlying operating system and available hardware.

use anyhow::Result;
use futures::Stream;
use std::pin::Pin;

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

pub trait ModelOrchestrator: Send + Sync {
    fn initialize(&mut self) -> Result<()>;

    fn load_model(&mut self, model_id: &str) -> Result<()>;

    fn unload_model(&mut self, model_id: &str) -> Result<()>;

    fn is_model_loaded(&self, model_id: &str) -> bool;

    fn generate(&self, model_id: &str, prompt: &str) -> Result<TokenStream>;
}
pub struct MockOrchestrator {
    loaded_models: std::collections::HashSet<String>,
}

impl Default for MockOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self {
            loaded_models: std::collections::HashSet::new(),
        }
    }
}

impl ModelOrchestrator for MockOrchestrator {
    fn initialize(&mut self) -> Result<()> {
        println!("[MockOrchestrator] Initialized.");
        Ok(())
    }

    fn load_model(&mut self, model_id: &str) -> Result<()> {
        println!("[MockOrchestrator] Loading model: {}", model_id);
        self.loaded_models.insert(model_id.to_string());
        Ok(())
    }

    fn unload_model(&mut self, model_id: &str) -> Result<()> {
        println!("[MockOrchestrator] Unloading model: {}", model_id);
        self.loaded_models.remove(model_id);
        Ok(())
    }

    fn is_model_loaded(&self, model_id: &str) -> bool {
        self.loaded_models.contains(model_id)
    }

    fn generate(&self, model_id: &str, prompt: &str) -> Result<TokenStream> {
        if !self.is_model_loaded(model_id) {
            return Err(anyhow::anyhow!("Model {} is not loaded.", model_id));
        }

        println!(
            "[MockOrchestrator] Generating response for prompt: '{}' using model: {}",
            prompt, model_id
        );

        // Return a dummy stream with a single token for the mock
        let stream = futures::stream::iter(vec![Ok("Mock response generated.".to_string())]);
        Ok(Box::pin(stream))
    }
}
