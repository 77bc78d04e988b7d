use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::DMatrix;
use parking_lot::Mutex;
use smbo::runner::{RunOutcome, RunRequest, TargetRunner};
use smbo::{Error, RunObjective, Smbo, StatusType};

use crate::test_functions::{branin, branin_runner, branin_space, shifted_sphere_runner};

#[test]
fn optimize_evaluates_default_then_one_challenger_per_iteration() {
    let mut smbo = Smbo::builder(branin_space())
        .run_objective(RunObjective::Quality)
        .n_random_sorted(100)
        .seed(42)
        .build()
        .unwrap();

    let (incumbent, cost) = smbo.optimize(&branin_runner, 10).unwrap().unwrap();
    assert_eq!(smbo.run_history().len(), 11);
    assert_eq!(smbo.run_history().configurations().len(), 11);

    // The default configuration is the centre of the domain
    let first = smbo.run_history().runs()[0].configuration.clone();
    assert_eq!(first.vector(), &[0.5, 0.5]);
    assert!(cost <= branin(&[2.5, 7.5]));
    assert_eq!(smbo.incumbent(), Some(&incumbent));
}

#[test]
fn optimize_improves_on_a_smooth_target() {
    let mut smbo = Smbo::builder(branin_space())
        .run_objective(RunObjective::Quality)
        .n_random_sorted(200)
        .challengers_per_iteration(2)
        .seed(3)
        .build()
        .unwrap();

    let (_, cost) = smbo.optimize(&shifted_sphere_runner, 15).unwrap().unwrap();
    // The default configuration is the optimum; nothing may beat it
    assert!(cost.abs() < 1e-12);
    assert_eq!(smbo.run_history().len(), 31);
}

struct InstanceCounter {
    calls: AtomicUsize,
    seen: Mutex<Vec<(Option<String>, Option<String>, Option<f64>)>>,
}

impl TargetRunner for InstanceCounter {
    fn run(&self, request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.seen
            .lock()
            .push((
                request.instance.map(str::to_owned),
                request.instance_specific.map(str::to_owned),
                request.cutoff,
            ));
        let v = request.configuration.vector();
        let offset = if request.instance == Some("hard") { 5.0 } else { 0.0 };
        Ok(RunOutcome::success(v[0] + v[1] + offset, 0.1))
    }
}

#[test]
fn every_configuration_runs_on_every_instance() {
    let runner = InstanceCounter {
        calls: AtomicUsize::new(0),
        seen: Mutex::new(Vec::new()),
    };
    let mut smbo = Smbo::builder(branin_space())
        .run_objective(RunObjective::Quality)
        .instances(["easy", "hard"])
        .instance_features(DMatrix::from_row_slice(2, 1, &[0.0, 1.0]))
        .instance_specific("hard", "seed=7")
        .cutoff(60.0)
        .n_random_sorted(50)
        .seed(11)
        .build()
        .unwrap();

    smbo.optimize(&runner, 4).unwrap();
    assert_eq!(runner.calls.load(Ordering::Relaxed), 10);

    let seen = runner.seen.lock();
    for pair in seen.chunks(2) {
        assert_eq!(pair[0], (Some("easy".to_owned()), None, Some(60.0)));
        assert_eq!(
            pair[1],
            (Some("hard".to_owned()), Some("seed=7".to_owned()), Some(60.0))
        );
    }
}

#[test]
fn runner_errors_abort_the_loop() {
    fn failing(_request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
        Err(Error::Runner("target binary missing".into()))
    }

    let mut smbo = Smbo::builder(branin_space()).seed(0).build().unwrap();
    let err = smbo.optimize(&failing, 3).unwrap_err();
    assert!(matches!(err, Error::Runner(msg) if msg == "target binary missing"));
    assert!(smbo.run_history().is_empty());
}

#[test]
fn aborted_runs_do_not_win_the_loop() {
    fn abort_at_default(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
        let v = request.configuration.vector();
        let cost = v[0] + v[1];
        if v == [0.5, 0.5] {
            return Ok(RunOutcome {
                status: StatusType::Abort,
                ..RunOutcome::success(0.0, 0.0)
            });
        }
        Ok(RunOutcome::success(cost + 1.0, 0.1))
    }

    let mut smbo = Smbo::builder(branin_space())
        .run_objective(RunObjective::Quality)
        .n_random_sorted(10)
        .seed(2)
        .build()
        .unwrap();
    let (incumbent, cost) = smbo.optimize(&abort_at_default, 3).unwrap().unwrap();
    assert_ne!(incumbent.vector(), &[0.5, 0.5]);
    assert!(cost >= 1.0);
    assert_eq!(smbo.incumbent(), Some(&incumbent));
}

#[test]
fn crashed_runs_are_recorded_with_their_status() {
    fn crashing(_request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
        Ok(RunOutcome {
            status: StatusType::Crashed,
            ..RunOutcome::success(1000.0, 1.0)
        })
    }

    let mut smbo = Smbo::builder(branin_space())
        .n_random_sorted(10)
        .seed(0)
        .build()
        .unwrap();
    smbo.optimize(&crashing, 2).unwrap();
    let runs = smbo.run_history().runs();
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|r| r.status == StatusType::Crashed));
}
