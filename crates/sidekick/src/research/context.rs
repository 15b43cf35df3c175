use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Source;

/// A finding saved by the model while researching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub finding: String,
    pub source_url: Option<String>,
}

#[derive(Default)]
struct State {
    sources: Vec<Source>,
    findings: Vec<Finding>,
}

/// Sources and findings collected by the research tools of one session.
///
/// Cloning returns a handle to the same context.
#[derive(Clone, Default)]
pub struct ResearchContext {
    state: Arc<Mutex<State>>,
}

impl ResearchContext {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remembers sources not seen before and returns how many were new.
    pub fn add_sources(&self, sources: &[Source]) -> usize {
        let mut state = self.state();
        let mut added = 0;
        for source in sources {
            if !state.sources.contains(source) {
                state.sources.push(source.clone());
                added += 1;
            }
        }
        added
    }

    /// Saves a finding and returns the number of findings so far.
    pub fn add_finding(&self, finding: Finding) -> usize {
        let mut state = self.state();
        state.findings.push(finding);
        state.findings.len()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.state().sources.clone()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.state().findings.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.sources.clear();
        state.findings.clear();
    }
}
