use std::sync::Arc;

use crate::adapters::{FfmpegAdapter, FfprobeAdapter};
use crate::app::cut_orchestrator::{CutOrchestrator, CutSettings};
use crate::config::AppConfig;
use crate::error::CutXResult;
use crate::events::ProgressHub;
use crate::planner::CutPlanner;
use crate::ports::{ProbePort, TranscodePort};

pub trait AppContainer: Send + Sync {
    fn orchestrator(&self) -> CutOrchestrator;
    fn hub(&self) -> ProgressHub;
    fn planner(&self) -> CutPlanner;
}

/// Wires the ffmpeg/ffprobe adapters and one shared hub from the configuration
pub struct DefaultAppContainer {
    orchestrator: CutOrchestrator,
    hub: ProgressHub,
}

impl DefaultAppContainer {
    pub fn new(config: &AppConfig) -> CutXResult<Self> {
        config.validate()?;

        let probe_port = Arc::new(FfprobeAdapter::new(&config.tools.ffprobe));
        let transcode_port = Arc::new(FfmpegAdapter::new(&config.tools.ffmpeg));
        let hub = ProgressHub::new(config.hub.subscriber_buffer);

        let orchestrator = CutOrchestrator::new(
            probe_port as Arc<dyn ProbePort>,
            transcode_port as Arc<dyn TranscodePort>,
            hub.clone(),
            CutSettings::from_config(config),
        );

        Ok(Self { orchestrator, hub })
    }
}

impl AppContainer for DefaultAppContainer {
    fn orchestrator(&self) -> CutOrchestrator {
        self.orchestrator.clone()
    }

    fn hub(&self) -> ProgressHub {
        self.hub.clone()
    }

    fn planner(&self) -> CutPlanner {
        self.orchestrator.settings().planner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_shares_hub() {
        let container = DefaultAppContainer::new(&AppConfig::default()).unwrap();
        let _sub = container.hub().subscribe();
        assert_eq!(container.orchestrator().hub().subscriber_count(), 1);
        assert_eq!(container.planner().plan(&[], 3.0).unwrap().keep.len(), 1);
    }

    #[test]
    fn test_container_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.cut.max_segments = 0;
        assert!(DefaultAppContainer::new(&config).is_err());
    }
}
