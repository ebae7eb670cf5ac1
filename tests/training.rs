//! Optimizer state over the training loop: empty before any step, one entry
//! per model parameter afterwards.

#![cfg(all(feature = "ndarray", feature = "autodiff"))]

use burn::prelude::*;
use burn_convnet::backend::{MainAutoBackend, MainDevice};
use burn_convnet::optim::OptimConfigExt;
use burn_convnet::prelude::*;
use burn_convnet::training::{self, TrainingConfig};

type AutoB = MainAutoBackend;

/// Geometry small enough to keep the loop cheap: 12 -> 10 -> 8 -> 4.
fn tiny_config() -> ConvNetConfig {
    ConvNetConfig::new()
        .with_conv1_channels(4)
        .with_conv2_channels(8)
        .with_hidden_size(16)
        .with_num_classes(4)
        .with_image_size(12)
}

#[test]
fn state_is_empty_before_any_step() {
    let device = AutoB::main_device();
    let model: ConvNet<AutoB> = tiny_config().init(&device);
    let settings = SgdSettings::new();
    let optim: SgdOptimizer<ConvNet<AutoB>, AutoB> = settings.init();

    let snapshot = OptimizerStateDict::collect(&settings, &optim, &model.state_dict());
    assert!(snapshot.state.is_empty());
    assert_eq!(snapshot.unmatched, 0);
    assert_eq!(snapshot.lr, 1e-3);
    assert_eq!(snapshot.momentum, 0.9);
    assert_eq!(snapshot.weight_decay, 0.0);
    assert!(!snapshot.nesterov);
    assert!(snapshot.to_string().contains("state: (empty)"));
}

#[test]
fn steps_populate_one_entry_per_parameter() {
    let device = AutoB::main_device();
    let model_config = tiny_config();
    let model: ConvNet<AutoB> = model_config.init(&device);
    let training_config = TrainingConfig::new(SgdSettings::new())
        .with_steps(2)
        .with_batch_size(2);
    let mut optim: SgdOptimizer<ConvNet<AutoB>, AutoB> = training_config.optimizer.init();

    let (model, losses) =
        training::train(&training_config, &model_config, model, &mut optim, &device);

    assert_eq!(losses.len(), 2);
    for loss in &losses {
        assert!(loss.is_finite(), "loss is {loss}");
    }

    let params = model.state_dict();
    let snapshot = OptimizerStateDict::collect(&training_config.optimizer, &optim, &params);
    assert_eq!(snapshot.unmatched, 0);

    let names: Vec<&str> = snapshot.state.iter().map(|entry| entry.name.as_str()).collect();
    let expected: Vec<&str> = params.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, expected);
    for (entry, param) in snapshot.state.iter().zip(params.iter()) {
        assert_eq!(entry.shape, param.shape, "state shape of {}", entry.name);
    }
}

#[test]
fn steps_update_the_parameters() {
    let device = AutoB::main_device();
    let model_config = tiny_config();
    let model: ConvNet<AutoB> = model_config.init(&device);
    let before: Vec<f32> = model.fc2.weight.val().into_data().to_vec().unwrap();

    let training_config = TrainingConfig::new(SgdSettings::new())
        .with_steps(1)
        .with_batch_size(2);
    let mut optim: SgdOptimizer<ConvNet<AutoB>, AutoB> = training_config.optimizer.init();
    let (model, _losses) =
        training::train(&training_config, &model_config, model, &mut optim, &device);

    let after: Vec<f32> = model.fc2.weight.val().into_data().to_vec().unwrap();
    assert_eq!(before.len(), after.len());
    assert!(
        before.iter().zip(&after).any(|(b, a)| b != a),
        "no parameter moved"
    );
}

#[test]
fn momentum_free_sgd_still_records_state() {
    let device = AutoB::main_device();
    let model_config = tiny_config();
    let model: ConvNet<AutoB> = model_config.init(&device);
    let training_config = TrainingConfig::new(SgdSettings::new().with_momentum(0.0))
        .with_steps(1)
        .with_batch_size(2);
    let mut optim: SgdOptimizer<ConvNet<AutoB>, AutoB> = training_config.optimizer.init();

    let (model, _losses) =
        training::train(&training_config, &model_config, model, &mut optim, &device);

    let params = model.state_dict();
    let snapshot = OptimizerStateDict::collect(&training_config.optimizer, &optim, &params);
    assert_eq!(snapshot.state.len(), params.len());
    assert_eq!(snapshot.momentum, 0.0);
}
