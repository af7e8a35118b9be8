use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally - do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TemporalAttentionConfig {
    /// Features per timestep (weather vars + one-hot width)
    pub input_size:  usize,
    pub hidden_size: usize,
    pub dropout:     f64,
    /// Project the context vector down to this size before the head
    #[config(default = "None")]
    pub context_dim: Option<usize>,
}

impl TemporalAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TemporalAttentionModel<B> {
        let encoder_1 = LstmConfig::new(self.input_size, self.hidden_size, true).init(device);
        let encoder_2 = LstmConfig::new(self.hidden_size, self.hidden_size, true).init(device);
        let dropout   = DropoutConfig::new(self.dropout).init();
        let scorer    = LinearConfig::new(self.hidden_size, 1).init(device);
        let reducer   = self
            .context_dim
            .map(|d| LinearConfig::new(self.hidden_size, d).init(device));
        let head      = LinearConfig::new(self.context_dim.unwrap_or(self.hidden_size), 1).init(device);
        TemporalAttentionModel { encoder_1, encoder_2, dropout, scorer, reducer, head }
    }
}

/// Two stacked LSTMs, a one-step temporal attention over their
/// output sequence, and a linear regression head.
#[derive(Module, Debug)]
pub struct TemporalAttentionModel<B: Backend> {
    pub encoder_1: Lstm<B>,
    pub encoder_2: Lstm<B>,
    pub dropout:   Dropout,
    /// Hidden state → scalar energy per timestep
    pub scorer:    Linear<B>,
    pub reducer:   Option<Linear<B>>,
    pub head:      Linear<B>,
}

pub struct AttentionOutput<B: Backend> {
    /// [batch, 1]
    pub prediction: Tensor<B, 2>,
    /// Softmax over timesteps, rows sum to 1 - [batch, timesteps]
    pub weights:    Tensor<B, 2>,
    /// Pre-softmax scores - [batch, timesteps]
    pub energies:   Tensor<B, 2>,
}

impl<B: Backend> TemporalAttentionModel<B> {
    /// inputs: [batch, timesteps, features] → prediction plus the
    /// attention weights that produced it
    pub fn forward_with_attention(&self, inputs: Tensor<B, 3>) -> AttentionOutput<B> {
        let (seq, _) = self.encoder_1.forward(inputs, None);
        let seq = self.dropout.forward(seq);
        let (seq, _) = self.encoder_2.forward(seq, None);
        let seq = self.dropout.forward(seq); // [batch, T, hidden]

        let energies = relu(self.scorer.forward(seq.clone())); // [batch, T, 1]
        let alphas   = softmax(energies.clone(), 1);

        // Weighted sum over the timestep axis
        let context = (alphas.clone() * seq).sum_dim(1); // [batch, 1, hidden]
        let [batch, _, hidden] = context.dims();
        let context = context.reshape([batch, hidden]);

        let context = match &self.reducer {
            Some(reducer) => reducer.forward(context),
            None => context,
        };
        let prediction = self.head.forward(context);

        AttentionOutput {
            prediction,
            weights:  alphas.squeeze::<2>(2),
            energies: energies.squeeze::<2>(2),
        }
    }

    /// inputs: [batch, timesteps, features] → [batch, 1]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward_with_attention(inputs).prediction
    }

    /// Mean squared error against scaled yields [batch, 1]
    pub fn forward_loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 2>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let prediction = self.forward(inputs);
        let loss = MseLoss::new().forward(prediction.clone(), targets, Reduction::Mean);
        (loss, prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray;

    fn inputs(batch: usize, timesteps: usize, features: usize) -> Tensor<TestBackend, 3> {
        Tensor::random([batch, timesteps, features], Distribution::Uniform(-1.0, 1.0), &Default::default())
    }

    #[test]
    fn test_attention_weights_sum_to_one() {
        let model = TemporalAttentionConfig::new(5, 8, 0.0).init::<TestBackend>(&Default::default());
        let out   = model.forward_with_attention(inputs(3, 7, 5));

        assert_eq!(out.weights.dims(), [3, 7]);
        assert_eq!(out.energies.dims(), [3, 7]);
        assert_eq!(out.prediction.dims(), [3, 1]);

        let sums = out.weights.clone().sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "row sums to {s}");
        }
        let weights = out.weights.into_data().to_vec::<f32>().unwrap();
        assert!(weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_energies_are_non_negative() {
        let model = TemporalAttentionConfig::new(4, 6, 0.0).init::<TestBackend>(&Default::default());
        let out   = model.forward_with_attention(inputs(2, 5, 4));
        let e     = out.energies.into_data().to_vec::<f32>().unwrap();
        assert!(e.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_prediction_view_matches_attention_view() {
        let model = TemporalAttentionConfig::new(4, 6, 0.0).init::<TestBackend>(&Default::default());
        let x     = inputs(2, 5, 4);
        let a = model.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = model.forward_with_attention(x).prediction.into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_context_reduction_changes_head_input() {
        let model = TemporalAttentionConfig::new(4, 6, 0.0)
            .with_context_dim(Some(2))
            .init::<TestBackend>(&Default::default());
        assert!(model.reducer.is_some());
        assert_eq!(model.forward(inputs(3, 5, 4)).dims(), [3, 1]);
    }

    #[test]
    fn test_loss_is_zero_for_perfect_prediction() {
        let model      = TemporalAttentionConfig::new(3, 4, 0.0).init::<TestBackend>(&Default::default());
        let x          = inputs(2, 3, 3);
        let prediction = model.forward(x.clone());
        let (loss, _)  = model.forward_loss(x, prediction);
        let loss: f32  = loss.into_scalar().elem();
        assert!(loss.abs() < 1e-10);
    }

    #[test]
    fn test_backward_produces_finite_loss() {
        let device = Default::default();
        let model  = TemporalAttentionConfig::new(3, 4, 0.2).init::<Autodiff<TestBackend>>(&device);
        let x = Tensor::<Autodiff<TestBackend>, 3>::random([4, 6, 3], Distribution::Default, &device);
        let y = Tensor::<Autodiff<TestBackend>, 2>::from_data(TensorData::new(vec![0.1f32, 0.4, 0.7, 1.0], [4, 1]), &device);

        let (loss, _) = model.forward_loss(x, y);
        let value: f32 = loss.clone().into_scalar().elem();
        assert!(value.is_finite());
        let _grads = loss.backward();
    }
}
