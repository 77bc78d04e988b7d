use std::sync::Arc;

use nalgebra::DMatrix;
use smbo::{Error, Origin, Smbo};

use crate::mocks::{HalfAcquisition, IdentityAcquisition, ScriptedSpace};

#[test]
fn unsorted_random_search_keeps_draw_order() {
    let values = vec![0.3, 0.1, 0.2, 0.9, 0.5, 0.4, 0.8, 0.7, 0.6, 0.0];
    let mut smbo = Smbo::builder(ScriptedSpace::new(values.clone()))
        .acquisition(IdentityAcquisition::default())
        .seed(1)
        .build()
        .unwrap();

    let challengers = smbo.get_next_by_random_search(10, false).unwrap();
    assert_eq!(challengers.len(), 10);
    for (c, v) in challengers.iter().zip(&values) {
        assert_eq!(c.configuration.vector(), &[*v]);
        assert_eq!(c.origin, Origin::RandomSearch);
        assert_eq!(c.acquisition_value, 0.0);
    }
}

#[test]
fn sorted_random_search_ranks_by_acquisition_value() {
    let values = vec![10.0, 1.0, 9.0, 2.0, 8.0, 3.0, 7.0, 4.0, 6.0, 5.0];
    let acquisition = IdentityAcquisition::default();
    let batches = Arc::clone(&acquisition.batches);
    let mut smbo = Smbo::builder(ScriptedSpace::new(values.clone()))
        .acquisition(acquisition)
        .seed(1)
        .build()
        .unwrap();

    let challengers = smbo.get_next_by_random_search(10, true).unwrap();
    assert_eq!(challengers.len(), 10);
    for (i, c) in challengers.iter().enumerate() {
        let expected = 10.0 - i as f64;
        assert_eq!(c.configuration.vector(), &[expected]);
        assert_eq!(c.acquisition_value, expected);
        assert_eq!(c.origin, Origin::RandomSearchSorted);
    }

    // Scored in one batch, in draw order
    let batches = batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], DMatrix::from_column_slice(10, 1, &values));
}

#[test]
fn sorted_random_search_is_stable_for_ties() {
    let mut smbo = Smbo::builder(ScriptedSpace::new(vec![1.0, 2.0, 1.0, 2.0]))
        .acquisition(IdentityAcquisition::default())
        .seed(1)
        .build()
        .unwrap();
    let challengers = smbo.get_next_by_random_search(4, true).unwrap();
    let scores: Vec<f64> = challengers.iter().map(|c| c.acquisition_value).collect();
    assert_eq!(scores, vec![2.0, 2.0, 1.0, 1.0]);
    assert!(challengers.windows(2).all(|w| w[0].acquisition_value >= w[1].acquisition_value));
}

#[test]
fn short_acquisition_output_is_rejected() {
    let mut smbo = Smbo::builder(ScriptedSpace::new(Vec::new()))
        .acquisition(HalfAcquisition)
        .seed(1)
        .build()
        .unwrap();
    assert!(matches!(
        smbo.get_next_by_random_search(6, true),
        Err(Error::DimensionMismatch {
            expected: 6,
            got: 3
        })
    ));
    // Unsorted draws are never scored
    assert_eq!(smbo.get_next_by_random_search(6, false).unwrap().len(), 6);
}
