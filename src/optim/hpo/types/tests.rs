//! Tests for HPO types

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{
    Direction, HyperParameters, HyperparameterSpace, Objective, ParameterDomain, ParameterMap,
    ParameterValue, Trial, TrialBudget, TrialStatus,
};
use crate::optim::hpo::HPOError;

// -------------------------------------------------------------------------
// ParameterValue Tests
// -------------------------------------------------------------------------

#[test]
fn test_parameter_value_float() {
    let v = ParameterValue::Float(0.5);
    assert_eq!(v.as_float(), Some(0.5));
    assert_eq!(v.as_int(), Some(0));
    assert_eq!(v.as_str(), None);
}

#[test]
fn test_parameter_value_int() {
    let v = ParameterValue::Int(42);
    assert_eq!(v.as_float(), Some(42.0));
    assert_eq!(v.as_int(), Some(42));
    assert_eq!(v.to_string(), "42");
}

#[test]
fn test_parameter_value_categorical() {
    let v = ParameterValue::from("relu");
    assert_eq!(v.as_float(), None);
    assert_eq!(v.as_str(), Some("relu"));
    assert_eq!(v.to_string(), "relu");
}

// -------------------------------------------------------------------------
// ParameterDomain Tests
// -------------------------------------------------------------------------

#[test]
fn test_domain_int_respects_step() {
    let domain = ParameterDomain::Int { min: 32, max: 512, step: 32 };
    assert_eq!(domain.cardinality(), Some(16));
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let v = domain.sample(&mut rng).as_int().unwrap();
        assert!((32..=512).contains(&v));
        assert_eq!(v % 32, 0);
    }
}

#[test]
fn test_domain_int_reaches_both_ends() {
    let domain = ParameterDomain::Int { min: 1, max: 3, step: 1 };
    let mut rng = StdRng::seed_from_u64(0);
    let seen: Vec<i64> = (0..200).map(|_| domain.sample(&mut rng).as_int().unwrap()).collect();
    assert!(seen.contains(&1));
    assert!(seen.contains(&3));
}

#[test]
fn test_domain_float_log_scale() {
    let domain = ParameterDomain::Float { min: 1e-5, max: 1e-1, log_scale: true };
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..100 {
        let value = domain.sample(&mut rng);
        assert!(domain.is_valid(&value));
    }
}

#[test]
fn test_domain_choice_sample() {
    let domain = ParameterDomain::Choice {
        values: vec![0.2.into(), 0.25.into(), 0.4.into()],
    };
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..100 {
        assert!(domain.is_valid(&domain.sample(&mut rng)));
    }
    assert_eq!(domain.default_value(), Some(ParameterValue::Float(0.2)));
}

#[test]
fn test_domain_is_valid() {
    let domain = ParameterDomain::Int { min: 64, max: 512, step: 64 };
    assert!(domain.is_valid(&ParameterValue::Int(128)));
    assert!(!domain.is_valid(&ParameterValue::Int(100)));
    assert!(!domain.is_valid(&ParameterValue::Int(576)));
    assert!(!domain.is_valid(&ParameterValue::Float(128.0)));
}

#[test]
fn test_domain_validate_rejects_bad_bounds() {
    assert!(matches!(
        ParameterDomain::Int { min: 5, max: 1, step: 1 }.validate("layers"),
        Err(HPOError::InvalidDomain(name, _)) if name == "layers"
    ));
    assert!(ParameterDomain::Int { min: 1, max: 5, step: 0 }.validate("x").is_err());
    assert!(ParameterDomain::Choice { values: vec![] }.validate("x").is_err());
    assert!(ParameterDomain::Float { min: 0.0, max: 1.0, log_scale: true }
        .validate("x")
        .is_err());
}

#[test]
fn test_domain_to_unit() {
    let domain = ParameterDomain::Int { min: 0, max: 10, step: 1 };
    assert_eq!(domain.to_unit(&ParameterValue::Int(5)), Some(0.5));

    let choice = ParameterDomain::Choice { values: vec!["a".into(), "b".into()] };
    assert_eq!(choice.to_unit(&"a".into()), Some(0.25));
    assert_eq!(choice.to_unit(&"z".into()), None);
}

// -------------------------------------------------------------------------
// HyperparameterSpace Tests
// -------------------------------------------------------------------------

#[test]
fn test_space_new() {
    let space = HyperparameterSpace::new();
    assert!(space.is_empty());
    assert_eq!(space.len(), 0);
    assert_eq!(space.cardinality(), Some(1));
}

#[test]
fn test_space_first_registration_wins() {
    let mut space = HyperparameterSpace::new();
    assert!(space.add("layers", ParameterDomain::Int { min: 1, max: 3, step: 1 }));
    assert!(!space.add("layers", ParameterDomain::Int { min: 1, max: 9, step: 1 }));
    assert_eq!(space.get("layers"), Some(&ParameterDomain::Int { min: 1, max: 3, step: 1 }));
}

#[test]
fn test_space_keeps_registration_order() {
    let mut space = HyperparameterSpace::new();
    space.add("b", ParameterDomain::Int { min: 0, max: 1, step: 1 });
    space.add("a", ParameterDomain::Int { min: 0, max: 1, step: 1 });
    let names: Vec<&String> = space.iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["b", "a"]);
}

#[test]
fn test_space_merge() {
    let mut a = HyperparameterSpace::new();
    a.add("x", ParameterDomain::Int { min: 0, max: 1, step: 1 });
    let mut b = HyperparameterSpace::new();
    b.add("x", ParameterDomain::Int { min: 0, max: 5, step: 1 });
    b.add("y", ParameterDomain::Choice { values: vec!["relu".into()] });

    assert_eq!(a.merge(&b), 1);
    assert_eq!(a.len(), 2);
    assert_eq!(a.get("x"), Some(&ParameterDomain::Int { min: 0, max: 1, step: 1 }));
}

#[test]
fn test_space_sample_and_validate() {
    let mut space = HyperparameterSpace::new();
    space.add("lr", ParameterDomain::Float { min: 1e-5, max: 1e-1, log_scale: true });
    space.add("batch_size", ParameterDomain::Int { min: 64, max: 512, step: 64 });

    let mut rng = StdRng::seed_from_u64(3);
    let config = space.sample_random(&mut rng);
    assert!(config.contains_key("lr"));
    assert!(config.contains_key("batch_size"));
    assert!(space.validate(&config).is_ok());

    let mut missing = ParameterMap::new();
    missing.insert("lr".into(), ParameterValue::Float(0.01));
    assert!(matches!(space.validate(&missing), Err(HPOError::ParameterNotFound(_))));
}

#[test]
fn test_space_encode_fills_defaults() {
    let mut space = HyperparameterSpace::new();
    space.add("x", ParameterDomain::Int { min: 0, max: 4, step: 1 });
    space.add("y", ParameterDomain::Int { min: 0, max: 4, step: 1 });

    let mut config = ParameterMap::new();
    config.insert("x".into(), ParameterValue::Int(4));
    assert_eq!(space.encode(&config), vec![1.0, 0.0]);
}

#[test]
fn test_space_cardinality() {
    let mut space = HyperparameterSpace::new();
    space.add("x", ParameterDomain::Int { min: 1, max: 3, step: 1 });
    space.add("y", ParameterDomain::Choice { values: vec![0.1.into(), 0.2.into()] });
    assert_eq!(space.cardinality(), Some(6));

    space.add("z", ParameterDomain::Float { min: 0.0, max: 1.0, log_scale: false });
    assert_eq!(space.cardinality(), None);
}

// -------------------------------------------------------------------------
// HyperParameters Tests
// -------------------------------------------------------------------------

#[test]
fn test_hyperparameters_assigns_defaults() {
    let mut hp = HyperParameters::new();
    assert_eq!(hp.int("layers", 1, 3, 1).unwrap(), 1);
    assert_eq!(hp.choice_f64("dropout_rate", &[0.2, 0.25, 0.4]).unwrap(), 0.2);
    assert_eq!(hp.choice_str("activation", &["relu", "selu"]).unwrap(), "relu");

    assert_eq!(hp.space().len(), 3);
    assert_eq!(hp.get("layers"), Some(&ParameterValue::Int(1)));
}

#[test]
fn test_hyperparameters_returns_assigned_value() {
    let mut space = HyperparameterSpace::new();
    space.add("layers", ParameterDomain::Int { min: 1, max: 3, step: 1 });
    let mut values = ParameterMap::new();
    values.insert("layers".into(), ParameterValue::Int(3));

    let mut hp = HyperParameters::from_values(space, values);
    assert_eq!(hp.int("layers", 1, 3, 1).unwrap(), 3);
}

#[test]
fn test_hyperparameters_first_domain_wins() {
    let mut hp = HyperParameters::new();
    hp.int("units_0", 8, 96, 8).unwrap();
    hp.int("units_0", 32, 512, 32).unwrap();
    assert_eq!(hp.space().get("units_0"), Some(&ParameterDomain::Int { min: 8, max: 96, step: 8 }));
}

#[test]
fn test_hyperparameters_rejects_invalid_domain() {
    let mut hp = HyperParameters::new();
    let err = hp.int("batch_size", 64, 512, 0).unwrap_err();
    assert!(matches!(err, HPOError::InvalidDomain(..)));
    assert!(hp.choice_f64("l1", &[]).is_err());
}

#[test]
fn test_hyperparameters_rejects_out_of_domain_value() {
    let mut hp = HyperParameters::new();
    hp.set("layers", ParameterValue::Int(9));
    assert!(matches!(hp.int("layers", 1, 3, 1), Err(HPOError::InvalidValue(..))));
}

#[test]
fn test_hyperparameters_type_mismatch() {
    let mut hp = HyperParameters::new();
    hp.choice_str("activation", &["relu"]).unwrap();
    assert!(hp.choice_f64("activation", &[0.1]).is_err());
}

// -------------------------------------------------------------------------
// Trial / Objective Tests
// -------------------------------------------------------------------------

#[test]
fn test_trial_lifecycle() {
    let mut trial = Trial::new(0, HyperParameters::new(), 42)
        .with_budget(TrialBudget { epochs: 4, bracket: 2, round: 1 });
    assert_eq!(trial.status, TrialStatus::Pending);
    assert!(!trial.is_scored());

    trial.start();
    assert_eq!(trial.status, TrialStatus::Running);

    trial.complete(0.5, 4);
    assert!(trial.is_scored());
    assert_eq!(trial.score, Some(0.5));
    assert_eq!(trial.budget.map(|b| b.epochs), Some(4));

    let mut failed = Trial::new(1, HyperParameters::new(), 0);
    failed.fail();
    assert_eq!(failed.status, TrialStatus::Failed);
    assert!(!failed.is_scored());
}

#[test]
fn test_trial_serializes() {
    let mut trial = Trial::new(3, HyperParameters::new(), 9);
    trial.complete(1.25, 10);
    let json = serde_json::to_string(&trial).unwrap();
    let back: Trial = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, 3);
    assert_eq!(back.score, Some(1.25));
}

#[test]
fn test_objective_default() {
    let objective = Objective::default();
    assert_eq!(objective.name, "root_mean_squared_error");
    assert_eq!(objective.direction, Direction::Minimize);
    assert!(objective.is_better(0.1, 0.2));
    assert_eq!(objective.to_string(), "root_mean_squared_error (min)");
}

#[test]
fn test_objective_maximize() {
    let objective = Objective::maximize("accuracy");
    assert!(objective.is_better(0.9, 0.8));
    assert_eq!(objective.as_loss(0.9), -0.9);
    assert_eq!(objective.best_of(&[0.5, 0.9, f64::NAN, 0.7]), Some(0.9));
}

#[test]
fn test_objective_best_of_empty() {
    assert_eq!(Objective::default().best_of(&[]), None);
    assert_eq!(Objective::default().best_of(&[3.0, 1.0, 2.0]), Some(1.0));
}

#[test]
fn test_direction_yaml_aliases() {
    let d: Direction = serde_yaml::from_str("min").unwrap();
    assert_eq!(d, Direction::Minimize);
    let d: Direction = serde_yaml::from_str("maximize").unwrap();
    assert_eq!(d, Direction::Maximize);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_int_samples_stay_on_grid(min in -50i64..50, span in 0i64..200, step in 1i64..17, seed in any::<u64>()) {
        let domain = ParameterDomain::Int { min, max: min + span, step };
        let mut rng = StdRng::seed_from_u64(seed);
        let value = domain.sample(&mut rng);
        prop_assert!(domain.is_valid(&value));
    }

    #[test]
    fn prop_unit_encoding_in_range(min in -50i64..50, span in 0i64..200, seed in any::<u64>()) {
        let domain = ParameterDomain::Int { min, max: min + span, step: 1 };
        let mut rng = StdRng::seed_from_u64(seed);
        let u = domain.to_unit(&domain.sample(&mut rng)).unwrap();
        prop_assert!((0.0..=1.0).contains(&u));
    }
}
