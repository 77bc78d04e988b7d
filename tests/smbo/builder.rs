use nalgebra::DMatrix;
use smbo::acquisition::ExpectedImprovementPerSecond;
use smbo::epm::{
    ObjectiveTransform, RandomForestConfig, RandomForestWithInstances, RunHistory2Epm,
    SurrogateModel, UncorrelatedMultiObjectiveRandomForest,
};
use smbo::{Error, Smbo};

use crate::test_functions::branin_space;

#[test]
fn default_controller_has_no_incumbent() {
    let smbo = Smbo::builder(branin_space()).seed(0).build().unwrap();
    assert!(smbo.incumbent().is_none());
    assert!(smbo.run_history().is_empty());
    assert_eq!(smbo.model().types().to_vec(), vec![0, 0]);
    assert_eq!(smbo.acquisition().eta(), None);
}

#[test]
fn model_type_descriptor_must_match_space() {
    let model = RandomForestWithInstances::new(vec![0, 3], RandomForestConfig::default());
    let err = Smbo::builder(branin_space()).model(model).build().err().unwrap();
    assert!(matches!(
        err,
        Error::TypeDescriptorMismatch { expected, got } if expected == vec![0, 0] && got == vec![0, 3]
    ));
}

#[test]
fn eips_requires_two_objective_model() {
    let err = Smbo::builder(branin_space())
        .acquisition(ExpectedImprovementPerSecond::new())
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::ObjectiveDimensionMismatch {
            expected: 1,
            got: 2
        }
    ));
}

#[test]
fn eips_pipeline_selects_challengers() {
    use std::sync::Arc;

    use smbo::runhistory::{RunHistory, RunRecord};
    use smbo::space::Configuration;

    let history = Arc::new(RunHistory::new());
    history.add(RunRecord::new(Configuration::new(vec![0.2, 0.3]), None, 4.0, 2.0));
    history.add(RunRecord::new(Configuration::new(vec![0.8, 0.1]), None, 1.0, 20.0));
    history.add(RunRecord::new(Configuration::new(vec![0.5, 0.9]), None, 3.0, 0.5));

    let model = UncorrelatedMultiObjectiveRandomForest::new(
        ["cost", "runtime"],
        vec![0, 0],
        &RandomForestConfig::default(),
    );
    let mut smbo = Smbo::builder(branin_space())
        .model(model)
        .acquisition(ExpectedImprovementPerSecond::new())
        .runhistory2epm(RunHistory2Epm::new(ObjectiveTransform::Eips))
        .run_history(history)
        .n_random_sorted(30)
        .seed(5)
        .build()
        .unwrap();

    let challengers = smbo.select_configurations().unwrap();
    assert_eq!(challengers.len(), 80);
    assert!(challengers.iter().all(|c| c.acquisition_value >= 0.0));
    // Eips keeps raw costs, so eta is the incumbent's cost
    assert_eq!(smbo.acquisition().eta(), Some(1.0));
}

#[test]
fn instance_features_need_one_row_per_instance() {
    let err = Smbo::builder(branin_space())
        .instances(["i1", "i2", "i3"])
        .instance_features(DMatrix::zeros(2, 4))
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            got: 2
        }
    ));
}

#[test]
fn instance_features_widen_the_default_model() {
    let smbo = Smbo::builder(branin_space())
        .instances(["i1", "i2"])
        .instance_features(DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .build()
        .unwrap();
    assert_eq!(smbo.model().input_width(), 5);
}
