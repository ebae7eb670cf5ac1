//! A minimal synthetic-data training loop.
//!
//! The loop exists so optimizer state becomes observable: parameters receive
//! gradients and the SGD momentum buffers fill in. It makes no attempt to
//! fit anything, so batches are standard-normal noise with targets cycling
//! through the classes.

use crate::convnet::{ConvNet, ConvNetConfig};
use crate::optim::{SgdOptimizer, SgdSettings};
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::Distribution;
use burn::tensor::backend::AutodiffBackend;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub optimizer: SgdSettings,

    #[config(default = 4)]
    pub steps: usize,

    #[config(default = 8)]
    pub batch_size: usize,
}

/// Runs `training.steps` SGD steps and returns the updated model together
/// with the per-step losses.
pub fn train<AutoB: AutodiffBackend>(
    training: &TrainingConfig,
    model_config: &ConvNetConfig,
    mut model: ConvNet<AutoB>,
    optim: &mut SgdOptimizer<ConvNet<AutoB>, AutoB>,
    device: &AutoB::Device,
) -> (ConvNet<AutoB>, Vec<f64>) {
    let mut losses = Vec::with_capacity(training.steps);
    for step in 1..=training.steps {
        let images = Tensor::random(
            [
                training.batch_size,
                model_config.channels_in,
                model_config.image_size,
                model_config.image_size,
            ],
            Distribution::Normal(0.0, 1.0),
            device,
        );
        let labels: Vec<i32> = (0..training.batch_size as i32)
            .map(|index| index % model_config.num_classes as i32)
            .collect();
        let targets = Tensor::from_data(TensorData::new(labels, [training.batch_size]), device);

        let (loss, _logits) = model.forward_classification(images, targets);
        let loss_value = loss.clone().into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(training.optimizer.lr, model, grads);

        tracing::debug!("step {}/{}: loss {:.4}", step, training.steps, loss_value);
        losses.push(loss_value);
    }
    (model, losses)
}
