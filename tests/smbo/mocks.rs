//! Hand-written stand-ins for the controller's collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::DMatrix;
use parking_lot::Mutex;
use smbo::acquisition::AcquisitionFunction;
use smbo::epm::{Prediction, RandomForestConfig, RandomForestWithInstances, SurrogateModel};
use smbo::local_search::{AcquisitionMaximizer, LocalSearchResult};
use smbo::space::{Configuration, SearchSpace};

/// A one-parameter space whose samples come from a fixed script, then
/// from a counter starting at 100.
pub struct ScriptedSpace {
    script: Mutex<Vec<f64>>,
    counter: AtomicUsize,
}

impl ScriptedSpace {
    pub fn new(script: Vec<f64>) -> Self {
        Self {
            script: Mutex::new(script),
            counter: AtomicUsize::new(100),
        }
    }
}

impl SearchSpace for ScriptedSpace {
    fn types(&self) -> Vec<usize> {
        vec![0]
    }

    fn sample_configurations(
        &self,
        n: usize,
        _rng: &mut fastrand::Rng,
    ) -> smbo::Result<Vec<Configuration>> {
        let mut script = self.script.lock();
        Ok((0..n)
            .map(|_| {
                let v = if script.is_empty() {
                    self.counter.fetch_add(1, Ordering::Relaxed) as f64
                } else {
                    script.remove(0)
                };
                Configuration::new(vec![v])
            })
            .collect())
    }

    fn neighbors(
        &self,
        _config: &Configuration,
        _rng: &mut fastrand::Rng,
    ) -> smbo::Result<Vec<Configuration>> {
        Ok(Vec::new())
    }

    fn default_configuration(&self) -> Configuration {
        Configuration::new(vec![0.0])
    }
}

/// Scores each row by its first entry and records every batch it sees.
#[derive(Default)]
pub struct IdentityAcquisition {
    pub batches: Arc<Mutex<Vec<DMatrix<f64>>>>,
    eta: Option<f64>,
}

impl AcquisitionFunction for IdentityAcquisition {
    fn update(&mut self, _model: Arc<dyn SurrogateModel>, eta: f64) {
        self.eta = Some(eta);
    }

    fn eta(&self) -> Option<f64> {
        self.eta
    }

    fn compute(&self, x: &DMatrix<f64>) -> smbo::Result<Vec<f64>> {
        self.batches.lock().push(x.clone());
        Ok(x.column(0).iter().copied().collect())
    }
}

/// Scores only the first half of every batch.
#[derive(Default)]
pub struct HalfAcquisition;

impl AcquisitionFunction for HalfAcquisition {
    fn update(&mut self, _model: Arc<dyn SurrogateModel>, _eta: f64) {}

    fn eta(&self) -> Option<f64> {
        None
    }

    fn compute(&self, x: &DMatrix<f64>) -> smbo::Result<Vec<f64>> {
        Ok(vec![1.0; x.nrows() / 2])
    }
}

/// Returns `[9 - k]` with trace `[9 - k]` on its `k`-th call and records
/// the start configurations.
#[derive(Default)]
pub struct CountdownMaximizer {
    pub starts: Arc<Mutex<Vec<Configuration>>>,
}

impl AcquisitionMaximizer for CountdownMaximizer {
    fn maximize(
        &self,
        start: &Configuration,
        _acquisition: &dyn AcquisitionFunction,
        _space: &dyn SearchSpace,
        _rng: &mut fastrand::Rng,
    ) -> smbo::Result<LocalSearchResult> {
        let mut starts = self.starts.lock();
        let value = 9.0 - starts.len() as f64;
        starts.push(start.clone());
        Ok(LocalSearchResult {
            configuration: Configuration::new(vec![value]),
            trace: vec![value],
        })
    }
}

/// A random forest that counts how often it is trained.
pub struct CountingForest {
    inner: RandomForestWithInstances,
    pub trained: Arc<AtomicUsize>,
}

impl CountingForest {
    pub fn new(types: Vec<usize>) -> Self {
        Self {
            inner: RandomForestWithInstances::new(types, RandomForestConfig::default()),
            trained: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SurrogateModel for CountingForest {
    fn types(&self) -> &[usize] {
        self.inner.types()
    }

    fn instance_features(&self) -> Option<&DMatrix<f64>> {
        self.inner.instance_features()
    }

    fn train(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> smbo::Result<()> {
        self.trained.fetch_add(1, Ordering::Relaxed);
        self.inner.train(x, y)
    }

    fn predict(&self, x: &DMatrix<f64>) -> smbo::Result<Prediction> {
        self.inner.predict(x)
    }
}
