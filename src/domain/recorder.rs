//! Step recorder
//!
//! Captures selected scalar quantities after chosen solution steps. The
//! recorder only observes; it never changes the state of the system.

use serde::{Deserialize, Serialize};

use super::{DofKind, NodeId};
use crate::error::{FEAError, FEAResult};

/// A scalar quantity to capture at each recorded step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Probe {
    LoadFactor,
    Displacement { node: NodeId, dof: DofKind },
    Reaction { node: NodeId, dof: DofKind },
}

/// Values of all probes at one step, in probe order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    pub step: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recorder {
    probes: Vec<Probe>,
    steps: Vec<RecordedStep>,
    active: bool,
}

impl Recorder {
    /// Active recorder with no captured steps
    pub fn new(probes: Vec<Probe>) -> Self {
        Self {
            probes,
            steps: Vec::new(),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    /// Stop capturing; recorded data stays available
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub(crate) fn push(&mut self, values: Vec<f64>) {
        let step = self.steps.len();
        self.steps.push(RecordedStep { step, values });
    }

    /// Recorded history of one probe
    pub fn series(&self, probe: &Probe) -> FEAResult<Vec<f64>> {
        let column = self
            .probes
            .iter()
            .position(|p| p == probe)
            .ok_or_else(|| FEAError::InvalidInput(format!("probe {:?} is not recorded", probe)))?;
        Ok(self.steps.iter().map(|s| s.values[column]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_by_probe() {
        let probe = Probe::Displacement {
            node: NodeId(3),
            dof: DofKind::Uy,
        };
        let mut recorder = Recorder::new(vec![Probe::LoadFactor, probe]);
        recorder.push(vec![0.5, -0.1]);
        recorder.push(vec![1.0, -0.3]);
        assert_eq!(recorder.series(&Probe::LoadFactor).unwrap(), vec![0.5, 1.0]);
        assert_eq!(recorder.series(&probe).unwrap(), vec![-0.1, -0.3]);
        assert_eq!(recorder.steps()[1].step, 1);

        let missing = Probe::Reaction {
            node: NodeId(0),
            dof: DofKind::Ux,
        };
        assert!(recorder.series(&missing).is_err());
    }

    #[test]
    fn test_stop_keeps_data() {
        let mut recorder = Recorder::new(vec![Probe::LoadFactor]);
        recorder.push(vec![1.0]);
        recorder.stop();
        assert!(!recorder.is_active());
        assert_eq!(recorder.steps().len(), 1);
    }
}
