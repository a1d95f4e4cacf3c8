//! Hypermodels, model building and training through the public API

use ndarray::{Array2, ArrayD, IxDyn};

use afinar::model::Layer;
use afinar::optim::hpo::ParameterValue;
use afinar::train::Network;
use afinar::{
    hypermodel_for, Activation, ActivationPolicy, CpuFitter, Dataset, Error, FitOptions, HyperModel,
    HyperParameters, ModelBuilder, ModelFitter, ModelKind, ParameterSet, SearchConfiguration,
};

#[test]
fn test_yaml_config_to_trained_dense_model() {
    let yaml = "
input_shape: [3]
num_outputs: 2
activation: selu
dense_units: { min: 8, max: 8, step: 8 }
seed: 1
";
    let config = SearchConfiguration::from_yaml_str(yaml).expect("valid config");
    assert_eq!(config.activation, ActivationPolicy::Fixed(Activation::Selu));

    let hypermodel = hypermodel_for(config).expect("dense hypermodel");
    let mut hp = HyperParameters::new();
    hp.set("layers", ParameterValue::Int(2));
    let compiled = hypermodel.build(&mut hp, 3).expect("model builds");

    assert_eq!(compiled.kind, ModelKind::Dense);
    assert_eq!(compiled.params.layers(), 2);
    assert_eq!(compiled.params.activation(), Activation::Selu);
    assert_eq!(compiled.model.input_shape(), &[3]);
    assert_eq!(compiled.model.output_shape(), &[2]);

    let features = ArrayD::from_shape_fn(IxDyn(&[16, 3]), |idx| (idx[0] * idx[1]) as f32 / 32.0);
    let targets = Array2::from_shape_fn((16, 2), |(i, j)| (i + j) as f32 / 16.0);
    let data = Dataset::new(features, targets).expect("valid dataset");

    let history = CpuFitter::new()
        .fit(&compiled, &data, &FitOptions::new(2, 8).with_validation_split(0.25))
        .expect("training succeeds");
    assert_eq!(history.epochs(), 2);
    assert!(history.get("val_root_mean_squared_error").is_some());
}

#[test]
fn test_recurrent_hypermodel_stacks_bidirectional_layers() {
    let config = SearchConfiguration::new(vec![5, 2], 1)
        .with_model(ModelKind::Recurrent)
        .with_layers(2, 2)
        .with_units(4, 4, 4);
    let hypermodel = hypermodel_for(config).expect("recurrent hypermodel");
    let compiled = hypermodel.build(&mut HyperParameters::new(), 0).expect("model builds");

    let recurrent: Vec<bool> = compiled
        .model
        .layers()
        .iter()
        .filter_map(|layer| match layer {
            Layer::Bidirectional { return_sequences, .. } => Some(*return_sequences),
            _ => None,
        })
        .collect();
    assert_eq!(recurrent, vec![true, false]);

    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
    let network = Network::from_model(&compiled.model, &mut rng).expect("network");
    assert_eq!(network.param_count(), compiled.model.param_count());
}

#[test]
fn test_convolutional_is_not_implemented() {
    let config = SearchConfiguration::new(vec![8, 8], 1).with_model(ModelKind::Convolutional);
    let hypermodel = hypermodel_for(config).expect("convolutional hypermodel");
    let err = hypermodel.build(&mut HyperParameters::new(), 0).unwrap_err();
    assert!(matches!(err, Error::NotImplemented(_)));
}

#[test]
fn test_parameter_set_yaml_round_trip_validates() {
    let yaml = "
layers: 2
units: [16, 8]
dropout_rate: 0.25
recurrent_dropout: 0.0
l1: 0.0
l2: 0.0001
learning_rate: 0.001
activation: elu
";
    let params: ParameterSet = serde_yaml::from_str(yaml).expect("valid parameter set");
    assert_eq!(params.units_at(1).expect("two layers"), 8);
    assert_eq!(params.to_string(), "2-layers_[16, 8]-units_001_learningRate");

    let compiled = ModelBuilder::new(vec![4], 1).build(ModelKind::Dense, &params, 9).expect("builds");
    assert_eq!(compiled.seed, 9);

    let bad = yaml.replace("layers: 2", "layers: 3");
    let params: ParameterSet = serde_yaml::from_str(&bad).expect("bounds are fine");
    let err = ModelBuilder::new(vec![4], 1).build(ModelKind::Dense, &params, 0).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2, .. }));
}
