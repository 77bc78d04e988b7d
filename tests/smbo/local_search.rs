use std::sync::Arc;

use smbo::space::Configuration;
use smbo::{Origin, Smbo};

use crate::mocks::{CountdownMaximizer, IdentityAcquisition, ScriptedSpace};

#[test]
fn local_search_starts_from_incumbent_then_random() {
    let maximizer = CountdownMaximizer::default();
    let starts = Arc::clone(&maximizer.starts);
    let mut smbo = Smbo::builder(ScriptedSpace::new(Vec::new()))
        .acquisition(IdentityAcquisition::default())
        .maximizer(maximizer)
        .seed(1)
        .build()
        .unwrap();

    // Without a known incumbent every start is random
    let challengers = smbo.get_next_by_local_search(9).unwrap();
    assert_eq!(challengers.len(), 9);
    assert_eq!(starts.lock().len(), 9);
    for (i, c) in challengers.iter().enumerate() {
        let expected = 9.0 - i as f64;
        assert_eq!(c.configuration.vector(), &[expected]);
        assert_eq!(c.acquisition_value, expected);
        assert_eq!(c.origin, Origin::LocalSearch);
    }
    assert!(starts.lock().iter().all(|s| s.vector()[0] >= 100.0));

    // With an incumbent only the first start of the call is the incumbent
    let incumbent = Configuration::new(vec![42.0]);
    smbo.set_incumbent(Some(incumbent.clone()));
    let challengers = smbo.get_next_by_local_search(10).unwrap();
    assert_eq!(challengers.len(), 10);
    assert!(challengers.iter().all(|c| c.origin == Origin::LocalSearch));

    let starts = starts.lock();
    assert_eq!(starts.len(), 19);
    assert_eq!(starts[9], incumbent);
    assert!(starts[10..].iter().all(|s| *s != incumbent));
}

#[test]
fn zero_starts_run_nothing() {
    let maximizer = CountdownMaximizer::default();
    let starts = Arc::clone(&maximizer.starts);
    let mut smbo = Smbo::builder(ScriptedSpace::new(Vec::new()))
        .maximizer(maximizer)
        .seed(1)
        .build()
        .unwrap();
    smbo.set_incumbent(Some(Configuration::new(vec![0.5])));

    assert!(smbo.get_next_by_local_search(0).unwrap().is_empty());
    assert!(starts.lock().is_empty());
}
