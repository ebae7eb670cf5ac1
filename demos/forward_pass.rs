//! Defines the convolutional network, prints its module tree, and runs a
//! forward pass over a batch of random images.

use burn::prelude::*;
use burn::tensor::Distribution;
use burn::tensor::activation::softmax;
use burn_convnet::backend::{MainBackend, MainDevice};
use burn_convnet::prelude::*;

pub fn launch<B: Backend + MainDevice>() {
    let device = B::main_device();

    let model_config = ConvNetConfig::new();
    let model: ConvNet<B> = model_config.init(&device);
    println!("{model}");
    println!("total parameters: {}", model.num_params());

    // a batch with a single random grayscale image
    let images = Tensor::<B, 4>::random(
        [
            1,
            model_config.channels_in,
            model_config.image_size,
            model_config.image_size,
        ],
        Distribution::Normal(0.0, 1.0),
        &device,
    );
    println!("input shape: {:?}", images.dims());

    let logits = model.forward(images);
    println!("logits: {}", logits);

    let probabilities = softmax(logits, 1);
    println!("probabilities: {}", probabilities);

    let predicted = probabilities.argmax(1);
    println!("predicted class: {}", predicted);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("burn_convnet=info".parse().unwrap()),
        )
        .init();
    launch::<MainBackend>();
}
