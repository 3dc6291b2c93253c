/// Simulated audio endpoint
///
/// Implements both collaborator traits over an in-memory mixer, driven by
/// per-source peak scripts. `simulate` runs the real engine against it;
/// tests use it to drive full protection cycles without an audio backend.
use earguard_core::{
    EndpointError, LevelProbe, Result, SourceId, SourceInfo, SourceKind, VolumeActuator,
};
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard};

struct SimSource {
    info: SourceInfo,
    script: Vec<f64>,
    position: usize,
    volume: f64,
    muted: bool,
}

impl SimSource {
    /// Next scripted peak; the script repeats once exhausted
    fn next_peak(&mut self) -> f64 {
        if self.script.is_empty() {
            return 0.0;
        }
        let peak = self.script[self.position % self.script.len()];
        self.position += 1;
        peak
    }
}

struct SimState {
    sources: Vec<SimSource>,
    master: f64,
    jitter: f64,
}

/// Scenario description for a simulated endpoint
///
/// Plain data until `build`; the endpoint itself is cheaply cloneable, so
/// the same mixer can be handed to the engine as probe and actuator while
/// the caller keeps a handle for inspection.
pub struct SimScenario {
    sources: Vec<SimSource>,
    master: f64,
    jitter: f64,
}

impl SimScenario {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            master: 1.0,
            jitter: 0.0,
        }
    }

    /// The canned demo: a game that bursts loud on a cycle, over steady
    /// background music that never crosses the threshold
    pub fn demo() -> Self {
        let game_script = [vec![0.18; 150], vec![0.95; 200], vec![0.12; 250]].concat();

        Self::new()
            .jitter(0.02)
            .source("game", "Noisy Game", 0.8, game_script)
            .source("music", "Background Music", 0.5, vec![0.3])
    }

    /// Master volume of the simulated device (default 1.0)
    pub fn master(mut self, master: f64) -> Self {
        self.master = master.clamp(0.0, 1.0);
        self
    }

    /// Uniform random jitter applied to every scripted peak (default none)
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    /// Add an application stream with a repeating peak script
    pub fn source(
        mut self,
        id: &str,
        name: &str,
        volume: f64,
        script: Vec<f64>,
    ) -> Self {
        self.sources.push(SimSource {
            info: SourceInfo::new(SourceId::new(id), SourceKind::ApplicationStream, name),
            script,
            position: 0,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
        });
        self
    }

    pub fn build(self) -> SimulatedEndpoint {
        SimulatedEndpoint {
            state: Arc::new(Mutex::new(SimState {
                sources: self.sources,
                master: self.master,
                jitter: self.jitter,
            })),
        }
    }
}

impl Default for SimScenario {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory audio endpoint shared between probe and actuator handles
#[derive(Clone)]
pub struct SimulatedEndpoint {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedEndpoint {
    fn lock(&self) -> Result<MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| EndpointError::backend("simulator state poisoned"))
    }

    /// Current session volume of a simulated source
    pub fn session_volume(&self, id: &str) -> Option<f64> {
        let state = self.state.lock().ok()?;
        state
            .sources
            .iter()
            .find(|s| s.info.id.as_str() == id)
            .map(|s| s.volume)
    }

    /// Current mute flag of a simulated source
    pub fn is_muted(&self, id: &str) -> Option<bool> {
        let state = self.state.lock().ok()?;
        state
            .sources
            .iter()
            .find(|s| s.info.id.as_str() == id)
            .map(|s| s.muted)
    }
}

impl LevelProbe for SimulatedEndpoint {
    fn enumerate_sources(&mut self) -> Result<Vec<SourceInfo>> {
        let state = self.lock()?;
        Ok(state.sources.iter().map(|s| s.info.clone()).collect())
    }

    fn read_peak(&mut self, id: &SourceId) -> Result<f64> {
        let mut state = self.lock()?;
        let jitter = state.jitter;
        let source = state
            .sources
            .iter_mut()
            .find(|s| &s.info.id == id)
            .ok_or_else(|| EndpointError::SourceGone(id.clone()))?;

        let mut peak = source.next_peak();
        if jitter > 0.0 {
            peak += rand::thread_rng().gen_range(-jitter..=jitter);
        }
        Ok(peak.clamp(0.0, 1.0))
    }

    fn read_volume(&mut self, id: &SourceId) -> Result<f64> {
        let state = self.lock()?;
        state
            .sources
            .iter()
            .find(|s| &s.info.id == id)
            .map(|s| s.volume)
            .ok_or_else(|| EndpointError::SourceGone(id.clone()))
    }

    fn read_master_volume(&mut self) -> Result<f64> {
        Ok(self.lock()?.master)
    }

    fn read_mute(&mut self, id: &SourceId) -> Result<bool> {
        let state = self.lock()?;
        state
            .sources
            .iter()
            .find(|s| &s.info.id == id)
            .map(|s| s.muted)
            .ok_or_else(|| EndpointError::SourceGone(id.clone()))
    }
}

impl VolumeActuator for SimulatedEndpoint {
    fn set_volume(&mut self, id: &SourceId, level: f64) -> Result<()> {
        let mut state = self.lock()?;
        let source = state
            .sources
            .iter_mut()
            .find(|s| &s.info.id == id)
            .ok_or_else(|| EndpointError::SourceGone(id.clone()))?;
        source.volume = level.clamp(0.0, 1.0);
        Ok(())
    }

    fn set_mute(&mut self, id: &SourceId, muted: bool) -> Result<()> {
        let mut state = self.lock()?;
        let source = state
            .sources
            .iter_mut()
            .find(|s| &s.info.id == id)
            .ok_or_else(|| EndpointError::SourceGone(id.clone()))?;
        source.muted = muted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_repeat() {
        let mut endpoint = SimScenario::new()
            .source("app", "App", 0.5, vec![0.1, 0.9])
            .build();
        let id = SourceId::new("app");

        assert_eq!(endpoint.read_peak(&id).unwrap(), 0.1);
        assert_eq!(endpoint.read_peak(&id).unwrap(), 0.9);
        assert_eq!(endpoint.read_peak(&id).unwrap(), 0.1);
    }

    #[test]
    fn actuator_writes_are_observable() {
        let mut endpoint = SimScenario::new()
            .source("app", "App", 0.5, vec![0.1])
            .build();
        let id = SourceId::new("app");

        endpoint.set_volume(&id, 0.2).unwrap();
        assert_eq!(endpoint.read_volume(&id).unwrap(), 0.2);
        assert_eq!(endpoint.session_volume("app"), Some(0.2));

        endpoint.set_mute(&id, true).unwrap();
        assert!(endpoint.read_mute(&id).unwrap());
        assert_eq!(endpoint.is_muted("app"), Some(true));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut endpoint = SimScenario::new()
            .jitter(0.05)
            .source("app", "App", 0.5, vec![0.5])
            .build();
        let id = SourceId::new("app");

        for _ in 0..100 {
            let peak = endpoint.read_peak(&id).unwrap();
            assert!((0.45..=0.55).contains(&peak), "peak {} outside jitter band", peak);
        }
    }

    #[test]
    fn unknown_sources_report_gone() {
        let mut endpoint = SimScenario::new().build();
        let id = SourceId::new("ghost");

        let err = endpoint.read_peak(&id).unwrap_err();
        assert!(err.is_source_gone());
        assert!(endpoint.set_volume(&id, 0.5).unwrap_err().is_source_gone());
    }
}
