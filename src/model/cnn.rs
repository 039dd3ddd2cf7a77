//! CNN Model Architecture for Binary Image Classification
//!
//! Three valid-padding conv/pool blocks followed by a dense head that emits a
//! single logit. The probability of class 1 is `sigmoid(logit)`.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Number of conv/pool blocks
const NUM_BLOCKS: usize = 3;

/// Configuration for the ImageClassifier CNN
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Input image size (square)
    #[config(default = "128")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters in the first block, doubled in each following block
    #[config(default = "32")]
    pub base_filters: usize,

    /// Width of the hidden dense layer
    #[config(default = "128")]
    pub dense_units: usize,

    /// Dropout rate before the output layer
    #[config(default = "0.5")]
    pub dropout_rate: f64,
}

impl ClassifierConfig {
    /// Channels leaving the last conv block
    pub fn feature_channels(&self) -> usize {
        self.base_filters << (NUM_BLOCKS - 1)
    }

    /// Width of the flattened feature vector fed to the dense head
    pub fn flattened_features(&self) -> usize {
        let side = feature_map_side(self.input_size);
        side * side * self.feature_channels()
    }
}

/// Spatial side of the final feature map for a square input
///
/// Each block applies a 3x3 valid convolution (`s - 2`) and a 2x2 pool with
/// stride 2 (`floor(s / 2)`). Returns 0 when the input is too small to
/// survive all blocks.
pub fn feature_map_side(input_size: usize) -> usize {
    let mut side = input_size;
    for _ in 0..NUM_BLOCKS {
        if side < 4 {
            return 0;
        }
        side = (side - 2) / 2;
    }
    side
}

/// Conv2d (valid) + ReLU + MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3]).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Binary image classifier
///
/// Architecture:
/// - Conv 32 → Conv 64 → Conv 128, each 3x3 valid + ReLU + 2x2 max pool
/// - Flatten
/// - Dense 128 + ReLU + Dropout
/// - Dense 1 (logit)
#[derive(Module, Debug)]
pub struct ImageClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,

    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    input_size: usize,
}

impl<B: Backend> ImageClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        // 128 -> 63 -> 30 -> 14
        let conv1 = ConvBlock::new(config.in_channels, base, device);
        let conv2 = ConvBlock::new(base, base * 2, device);
        let conv3 = ConvBlock::new(base * 2, base * 4, device);

        let fc1 = LinearConfig::new(config.flattened_features(), config.dense_units).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(config.dense_units, 1).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            fc1,
            dropout,
            fc2,
            input_size: config.input_size,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, input_size, input_size]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, 1]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);

        // Flatten: [B, C, H, W] -> [B, C*H*W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Probability of class 1, shape [batch_size, 1]
    pub fn forward_probability(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::sigmoid(self.forward(x))
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_map_side() {
        assert_eq!(feature_map_side(128), 14);
        assert_eq!(feature_map_side(64), 6);
        assert_eq!(feature_map_side(22), 1);
        assert_eq!(feature_map_side(21), 0);
        assert_eq!(feature_map_side(0), 0);
    }

    #[test]
    fn test_flattened_features_default() {
        let config = ClassifierConfig::new();
        assert_eq!(config.feature_channels(), 128);
        assert_eq!(config.flattened_features(), 25088);
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = ClassifierConfig::new().with_input_size(32);
        let model = ImageClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 1]);
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let device = Default::default();
        let config = ClassifierConfig::new().with_input_size(24);
        let model = ImageClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::ones([3, 3, 24, 24], &device);
        let probs: Vec<f32> = model
            .forward_probability(input)
            .into_data()
            .to_vec()
            .unwrap();

        assert_eq!(probs.len(), 3);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    fn wavy_input<B: Backend>(dims: [usize; 4], device: &B::Device) -> Tensor<B, 4> {
        let n: usize = dims.iter().product();
        let values: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
        Tensor::from_data(TensorData::new(values, dims), device)
    }

    #[test]
    fn test_conv_block_matches_manual_relu_and_pool() {
        let device = Default::default();
        let block = ConvBlock::<TestBackend>::new(3, 4, &device);
        let input = wavy_input::<TestBackend>([1, 3, 8, 8], &device);

        let conv: Vec<f32> = block.conv.forward(input.clone()).into_data().to_vec().unwrap();
        let output: Vec<f32> = block.forward(input).into_data().to_vec().unwrap();

        // conv output is [1, 4, 6, 6], pooled to [1, 4, 3, 3]
        let mut expected = Vec::with_capacity(4 * 9);
        for c in 0..4 {
            for py in 0..3 {
                for px in 0..3 {
                    let mut best = f32::MIN;
                    for (dy, dx) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                        let v = conv[c * 36 + (2 * py + dy) * 6 + 2 * px + dx];
                        best = best.max(v.max(0.0));
                    }
                    expected.push(best);
                }
            }
        }

        assert_eq!(output.len(), expected.len());
        for (got, want) in output.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-5, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_inference_model_matches_training_model() {
        use burn::backend::Autodiff;
        use burn::module::AutodiffModule;

        let device = Default::default();
        let config = ClassifierConfig::new()
            .with_input_size(24)
            .with_dense_units(8)
            .with_dropout_rate(0.0);
        let model = ImageClassifier::<Autodiff<TestBackend>>::new(&config, &device);

        let train_out: Vec<f32> = model
            .forward(wavy_input([2, 3, 24, 24], &device))
            .into_data()
            .to_vec()
            .unwrap();
        let valid_out: Vec<f32> = model
            .valid()
            .forward(wavy_input([2, 3, 24, 24], &device))
            .into_data()
            .to_vec()
            .unwrap();

        for (a, b) in train_out.iter().zip(&valid_out) {
            assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ClassifierConfig::new().with_input_size(64).with_dropout_rate(0.25);
        let json = serde_json::to_string(&config).unwrap();
        let restored: ClassifierConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.input_size, 64);
        assert_eq!(restored.dropout_rate, 0.25);
    }
}
