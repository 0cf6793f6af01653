//! Controller configuration.

use srcroute_p4rt::PipelineOptions;
use std::path::PathBuf;

/// Configuration for the NetworkController.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Topology document the session was loaded from
    pub topology_path: PathBuf,
    /// Pipeline handed to the connector for every switch
    pub pipeline: PipelineOptions,
    /// Connect to every topology switch when the session starts
    pub connect_on_start: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            topology_path: PathBuf::from("topo.json"),
            pipeline: PipelineOptions::default(),
            connect_on_start: true,
        }
    }
}

impl ControllerConfig {
    pub fn with_pipeline(mut self, pipeline: PipelineOptions) -> Self {
        self.pipeline = pipeline;
        self
    }
}
