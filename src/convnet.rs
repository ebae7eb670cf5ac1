//! A small convolutional network for square, single-label images.
//!
//! The default geometry is the classic MNIST tutorial convnet: two 3x3
//! convolutions, one 2x2 max-pool, two dropout layers, and a two-layer
//! classifier head.
//!
//! References:
//! - https://github.com/pytorch/examples/blob/main/mnist/main.py

use crate::artifacts::ModelConfigExt;
use crate::state::{NamedParams, ParamVisitor};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub pool: MaxPool2d,
    pub dropout1: Dropout,
    pub dropout2: Dropout,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct ConvNetConfig {
    /// Channels of the input images.
    #[config(default = 1)]
    pub channels_in: usize,

    #[config(default = 10)]
    pub num_classes: usize,

    #[config(default = 32)]
    pub conv1_channels: usize,

    #[config(default = 64)]
    pub conv2_channels: usize,

    /// Side of the square convolution kernels. Both convolutions use unit
    /// stride and valid padding.
    #[config(default = 3)]
    pub kernel_size: usize,

    /// Width of the hidden classifier layer.
    #[config(default = 128)]
    pub hidden_size: usize,

    #[config(default = 0.25)]
    pub dropout1: f64,

    #[config(default = 0.5)]
    pub dropout2: f64,

    /// Side of the square input images. Determines the input width of `fc1`.
    #[config(default = 28)]
    pub image_size: usize,
}

impl ConvNetConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        let kernel = [self.kernel_size; 2];
        ConvNet {
            conv1: Conv2dConfig::new([self.channels_in, self.conv1_channels], kernel)
                .init(device),
            conv2: Conv2dConfig::new([self.conv1_channels, self.conv2_channels], kernel)
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout1: DropoutConfig::new(self.dropout1).init(),
            dropout2: DropoutConfig::new(self.dropout2).init(),
            fc1: LinearConfig::new(self.flat_features(), self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }

    /// Width of the flattened feature vector entering `fc1`.
    ///
    /// Each valid-padding, unit-stride convolution shrinks a spatial side by
    /// `kernel_size - 1`; the 2x2/2 max-pool then halves it (rounding down).
    /// For the defaults: 28 -> 26 -> 24 -> 12, so 64 * 12 * 12 = 9216.
    pub fn flat_features(&self) -> usize {
        let side = self.pooled_side();
        self.conv2_channels * side * side
    }

    fn pooled_side(&self) -> usize {
        let shrink = 2 * (self.kernel_size - 1);
        assert!(
            self.image_size >= shrink + 2,
            "image_size {} is too small for two {}x{} valid convolutions and a 2x2 pool",
            self.image_size,
            self.kernel_size,
            self.kernel_size,
        );
        (self.image_size - shrink) / 2
    }
}

impl<B: Backend> ModelConfigExt<B> for ConvNetConfig {
    type Model = ConvNet<B>;
    fn init(&self, device: &B::Device) -> ConvNet<B> {
        ConvNetConfig::init(self, device)
    }
}

impl<B: Backend> ConvNet<B> {
    /// Returns the class logits. Callers wanting probabilities apply
    /// [`burn::tensor::activation::softmax`] (or `log_softmax`) on top.
    ///
    /// # Shapes
    ///   - Input [batch, channels_in, image_size, image_size]
    ///   - Output [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch, _, _, _] = images.dims();
        let [fc1_in, _] = self.fc1.weight.dims();
        let [_, num_classes] = self.fc2.weight.dims();

        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.dropout1.forward(self.pool.forward(x));

        let x = x.flatten::<2>(1, 3);
        debug_assert_eq!([batch, fc1_in], x.dims());

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.dropout2.forward(x);
        let x = self.fc2.forward(x);

        debug_assert_eq!([batch, num_classes], x.dims());
        x
    }

    /// Forward pass plus cross-entropy loss against integer class targets.
    ///
    /// # Shapes
    ///   - Images [batch, channels_in, image_size, image_size]
    ///   - Targets [batch]
    ///   - Output ([1], [batch, num_classes])
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

impl<B: Backend> NamedParams<B> for ConvNet<B> {
    /// The pool, dropout, and activation fields own no learnable parameters
    /// and contribute no entries.
    fn visit_params<V: ParamVisitor<B>>(&self, visitor: &mut V) {
        visitor.visit_float("conv1.weight", &self.conv1.weight);
        if let Some(bias) = &self.conv1.bias {
            visitor.visit_float("conv1.bias", bias);
        }
        visitor.visit_float("conv2.weight", &self.conv2.weight);
        if let Some(bias) = &self.conv2.bias {
            visitor.visit_float("conv2.bias", bias);
        }
        visitor.visit_float("fc1.weight", &self.fc1.weight);
        if let Some(bias) = &self.fc1.bias {
            visitor.visit_float("fc1.bias", bias);
        }
        visitor.visit_float("fc2.weight", &self.fc2.weight);
        if let Some(bias) = &self.fc2.bias {
            visitor.visit_float("fc2.bias", bias);
        }
    }
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, activation};

    type B = NdArray<f32, i32>;

    #[test]
    fn default_geometry_flattens_to_9216() {
        let config = ConvNetConfig::new();
        assert_eq!(config.flat_features(), 9216);

        let model: ConvNet<B> = config.init(&Default::default());
        assert_eq!(model.conv1.weight.dims(), [32, 1, 3, 3]);
        assert_eq!(model.conv2.weight.dims(), [64, 32, 3, 3]);
        assert_eq!(model.fc1.weight.dims(), [9216, 128]);
        assert_eq!(model.fc2.weight.dims(), [128, 10]);
    }

    #[test]
    fn forward_keeps_batch_and_class_dims() {
        let device = Default::default();
        let model: ConvNet<B> = ConvNetConfig::new().init(&device);
        let images = Tensor::random([3, 1, 28, 28], Distribution::Normal(0.0, 1.0), &device);

        let logits = model.forward(images);
        assert_eq!(logits.dims(), [3, 10]);
    }

    #[test]
    fn forward_handles_non_default_geometry() {
        let device = Default::default();
        let config = ConvNetConfig::new()
            .with_channels_in(3)
            .with_conv1_channels(4)
            .with_conv2_channels(8)
            .with_kernel_size(5)
            .with_hidden_size(16)
            .with_num_classes(4)
            .with_image_size(32);
        // 32 -> 28 -> 24 -> 12
        assert_eq!(config.flat_features(), 8 * 12 * 12);

        let model: ConvNet<B> = config.init(&device);
        let images = Tensor::random([2, 3, 32, 32], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(model.forward(images).dims(), [2, 4]);
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let device = Default::default();
        let model: ConvNet<B> = ConvNetConfig::new().init(&device);
        let images = Tensor::random([2, 1, 28, 28], Distribution::Normal(0.0, 1.0), &device);

        let probs = activation::softmax(model.forward(images), 1);
        let sums: Vec<f32> = probs.sum_dim(1).into_data().to_vec().unwrap();
        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
        }
    }

    #[test]
    fn classification_loss_is_finite() {
        let device = Default::default();
        let model: ConvNet<B> = ConvNetConfig::new().init(&device);
        let images = Tensor::random([4, 1, 28, 28], Distribution::Normal(0.0, 1.0), &device);
        let targets = Tensor::arange(0..4, &device);

        let (loss, logits) = model.forward_classification(images, targets);
        assert_eq!(logits.dims(), [4, 10]);
        let loss = loss.into_scalar();
        assert!(loss.is_finite(), "loss is {loss}");
    }

    #[test]
    #[should_panic(expected = "too small")]
    fn rejects_images_smaller_than_the_receptive_field() {
        ConvNetConfig::new().with_image_size(4).flat_features();
    }
}
