use std::sync::Arc;
use std::sync::atomic::Ordering;

use nalgebra::DMatrix;
use smbo::epm::{RandomForestConfig, RandomForestWithInstances, SurrogateModel};
use smbo::runhistory::{RunHistory, RunRecord};
use smbo::space::Configuration;
use smbo::{Error, Origin, Smbo, StatusType};

use crate::mocks::CountingForest;
use crate::test_functions::branin_space;

fn one_observation() -> Arc<RunHistory> {
    let history = Arc::new(RunHistory::new());
    history.add(RunRecord::new(Configuration::new(vec![0.4, 0.7]), None, 27.3, 1.0));
    history
}

#[test]
fn challengers_alternate_local_and_random_search() {
    let mut smbo = Smbo::builder(branin_space())
        .run_history(one_observation())
        .n_random_sorted(0)
        .seed(42)
        .build()
        .unwrap();

    let challengers = smbo.select_configurations().unwrap();
    assert_eq!(challengers.len(), 20);
    for (i, c) in challengers.iter().enumerate() {
        let expected = if i % 2 == 0 {
            Origin::LocalSearch
        } else {
            Origin::RandomSearch
        };
        assert_eq!(c.origin, expected);
        assert_eq!(c.configuration.len(), 2);
    }
}

#[test]
fn ranked_and_random_halves_are_interleaved() {
    let model = CountingForest::new(vec![0, 0]);
    let trained = Arc::clone(&model.trained);
    let history = one_observation();
    history.add(RunRecord::new(Configuration::new(vec![0.1, 0.2]), None, 5.0, 1.0));

    let mut smbo = Smbo::builder(branin_space())
        .model(model)
        .run_history(history)
        .seed(1)
        .build()
        .unwrap();

    let challengers = smbo.select_configurations().unwrap();
    assert_eq!(trained.load(Ordering::Relaxed), 1);
    assert_eq!(challengers.len(), 2020);

    let ranked: Vec<_> = challengers.iter().step_by(2).collect();
    let random: Vec<_> = challengers.iter().skip(1).step_by(2).collect();
    assert_eq!(
        ranked
            .iter()
            .filter(|c| c.origin == Origin::RandomSearchSorted)
            .count(),
        1000
    );
    assert_eq!(
        ranked.iter().filter(|c| c.origin == Origin::LocalSearch).count(),
        10
    );
    assert!(
        ranked
            .windows(2)
            .all(|w| w[0].acquisition_value >= w[1].acquisition_value)
    );
    assert!(random.iter().all(|c| c.origin == Origin::RandomSearch));
}

#[test]
fn incumbent_is_refreshed_and_eta_uses_its_cost() {
    let history = one_observation();
    history.add(RunRecord::new(Configuration::new(vec![0.1, 0.2]), None, 10.0, 1.0));

    let mut smbo = Smbo::builder(branin_space())
        .run_history(history)
        .n_random_sorted(10)
        .seed(1)
        .build()
        .unwrap();
    smbo.select_configurations().unwrap();

    assert_eq!(smbo.incumbent(), Some(&Configuration::new(vec![0.1, 0.2])));
    // Runtime objective: log10(10) = 1
    let eta = smbo.acquisition().eta().unwrap();
    assert!((eta - 1.0).abs() < 1e-12);
}

#[test]
fn aborted_runs_never_become_the_incumbent() {
    let history = Arc::new(RunHistory::new());
    history.add(
        RunRecord::new(Configuration::new(vec![0.1, 0.1]), None, 0.0, 0.0)
            .with_status(StatusType::Abort),
    );
    history.add(RunRecord::new(Configuration::new(vec![0.9, 0.9]), None, 5.0, 5.0));
    history.add(RunRecord::new(Configuration::new(vec![0.5, 0.5]), None, 6.0, 6.0));

    let mut smbo = Smbo::builder(branin_space())
        .run_history(history)
        .n_random_sorted(10)
        .seed(1)
        .build()
        .unwrap();
    smbo.select_configurations().unwrap();

    assert_eq!(smbo.incumbent(), Some(&Configuration::new(vec![0.9, 0.9])));
    let eta = smbo.acquisition().eta().unwrap();
    assert!((eta - 5f64.log10()).abs() < 1e-12);
}

#[test]
fn timeouts_are_judged_at_the_penalized_cutoff() {
    let history = Arc::new(RunHistory::new());
    history.add(
        RunRecord::new(Configuration::new(vec![0.1, 0.1]), None, 0.5, 0.5)
            .with_status(StatusType::Timeout),
    );
    history.add(RunRecord::new(Configuration::new(vec![0.9, 0.9]), None, 5.0, 5.0));

    let mut smbo = Smbo::builder(branin_space())
        .run_history(Arc::clone(&history))
        .cutoff(10.0)
        .n_random_sorted(10)
        .seed(1)
        .build()
        .unwrap();
    smbo.select_configurations().unwrap();
    assert_eq!(smbo.incumbent(), Some(&Configuration::new(vec![0.9, 0.9])));
    let eta = smbo.acquisition().eta().unwrap();
    assert!((eta - 5f64.log10()).abs() < 1e-12);

    // A cheaper charge for the timeout makes it the incumbent again
    let mut smbo = Smbo::builder(branin_space())
        .run_history(history)
        .cutoff(2.0)
        .par_factor(2.0)
        .n_random_sorted(10)
        .seed(1)
        .build()
        .unwrap();
    smbo.select_configurations().unwrap();
    assert_eq!(smbo.incumbent(), Some(&Configuration::new(vec![0.1, 0.1])));
    let eta = smbo.acquisition().eta().unwrap();
    assert!((eta - 4f64.log10()).abs() < 1e-12);
}

#[test]
fn same_seed_same_challengers() {
    let run = || {
        Smbo::builder(branin_space())
            .run_history(one_observation())
            .n_random_sorted(50)
            .seed(7)
            .build()
            .unwrap()
            .select_configurations()
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn empty_history_uses_pretrained_model_with_zero_eta() {
    let model = RandomForestWithInstances::new(vec![0, 0], RandomForestConfig::default());
    let mut rng = fastrand::Rng::with_seed(1);
    let x = DMatrix::from_fn(5, 2, |_, _| rng.f64());
    let y = DMatrix::from_fn(5, 1, |i, _| i as f64);
    model.train(&x, &y).unwrap();

    let mut smbo = Smbo::builder(branin_space())
        .model(model)
        .n_random_sorted(20)
        .seed(3)
        .build()
        .unwrap();

    let challengers = smbo.select_configurations().unwrap();
    assert_eq!(challengers[0].configuration.len(), 2);
    assert_eq!(smbo.acquisition().eta(), Some(0.0));
}

#[test]
fn empty_history_with_untrained_model_fails() {
    let mut smbo = Smbo::builder(branin_space()).seed(3).build().unwrap();
    assert!(matches!(
        smbo.select_configurations(),
        Err(Error::ModelNotTrained)
    ));
}
