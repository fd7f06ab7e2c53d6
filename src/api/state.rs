// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide application state
//!
//! The model slot is write-once: it is published exactly once after a
//! successful load, before the listener is bound, so every handler either
//! sees a fully loaded model or none at all. There is no teardown and no
//! reload path.

use anyhow::Result;
use std::sync::{Arc, OnceLock};

use crate::clip::EmbeddingBackend;
use crate::config::NodeConfig;

/// Clonable handler context holding the configuration and the loaded model
#[derive(Clone)]
pub struct AppState {
    config: Arc<NodeConfig>,
    model: Arc<OnceLock<Arc<dyn EmbeddingBackend>>>,
}

impl AppState {
    /// Creates state in the not-ready phase (no model published)
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config: Arc::new(config),
            model: Arc::new(OnceLock::new()),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Publishes the loaded model. Errors if a model was already published;
    /// the slot is write-once by construction.
    pub fn publish(&self, model: Arc<dyn EmbeddingBackend>) -> Result<()> {
        self.model
            .set(model)
            .map_err(|_| anyhow::anyhow!("Model already published"))
    }

    /// Returns the model if the node is ready to serve
    pub fn model(&self) -> Option<Arc<dyn EmbeddingBackend>> {
        self.model.get().cloned()
    }

    /// Readiness probe: true once the model has been published
    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Device label for status reporting ("unknown" before readiness)
    pub fn device_label(&self) -> &'static str {
        match self.model.get() {
            Some(model) => model.device().as_str(),
            None => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Device;
    use clap::Parser;
    use image::DynamicImage;

    struct StubBackend;

    impl EmbeddingBackend for StubBackend {
        fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 512])
        }

        fn embed_image(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
            Ok(vec![1.0; 512])
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn test_state() -> AppState {
        AppState::new(NodeConfig::parse_from(["clip-embed-node"]))
    }

    #[test]
    fn test_starts_not_ready() {
        let state = test_state();
        assert!(!state.is_ready());
        assert!(state.model().is_none());
        assert_eq!(state.device_label(), "unknown");
    }

    #[test]
    fn test_publish_transitions_to_ready() {
        let state = test_state();
        state.publish(Arc::new(StubBackend)).unwrap();

        assert!(state.is_ready());
        assert!(state.model().is_some());
        assert_eq!(state.device_label(), "cpu");
    }

    #[test]
    fn test_publish_is_write_once() {
        let state = test_state();
        state.publish(Arc::new(StubBackend)).unwrap();

        let second = state.publish(Arc::new(StubBackend));
        assert!(second.is_err());
    }

    #[test]
    fn test_clones_share_the_same_slot() {
        let state = test_state();
        let clone = state.clone();

        state.publish(Arc::new(StubBackend)).unwrap();
        assert!(clone.is_ready());
    }
}
