use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{Optimizer, Sgd, SgdConfig, SimpleOptimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// SGD bound to a model `AutoM`, with per-parameter state kept on the inner
/// (non-autodiff) backend.
pub type SgdOptimizer<AutoM, AutoB> =
    OptimizerAdaptor<Sgd<<AutoB as AutodiffBackend>::InnerBackend>, AutoM, AutoB>;

pub trait OptimConfigExt<AutoB, AutoM>
where
    Self: Config,
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Optim: SimpleOptimizer<AutoB::InnerBackend>;
    type Adaptor: Optimizer<AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor;
}

/// Hyperparameters for [`burn::optim::Sgd`].
///
/// burn takes the learning rate per step and keeps the remaining knobs in
/// builder-only sub-configs; this type holds them all in one place so they
/// can be persisted and echoed back by state-dict snapshots.
#[derive(Config, Debug)]
pub struct SgdSettings {
    #[config(default = 1e-3)]
    pub lr: f64,

    /// Momentum factor. Zero disables the momentum buffers entirely.
    #[config(default = 0.9)]
    pub momentum: f64,

    #[config(default = 0.0)]
    pub dampening: f64,

    #[config(default = false)]
    pub nesterov: bool,

    /// L2 penalty. Zero disables weight decay.
    #[config(default = 0.0)]
    pub weight_decay: f64,
}

impl SgdSettings {
    fn to_sgd_config(&self) -> SgdConfig {
        let mut config = SgdConfig::new();
        if self.momentum > 0.0 {
            config = config.with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(self.momentum)
                    .with_dampening(self.dampening)
                    .with_nesterov(self.nesterov),
            ));
        }
        if self.weight_decay > 0.0 {
            config = config.with_weight_decay(Some(WeightDecayConfig::new(self.weight_decay as _)));
        }
        config
    }
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for SgdSettings
where
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Optim = Sgd<AutoB::InnerBackend>;
    type Adaptor = SgdOptimizer<AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        self.to_sgd_config().init::<AutoB, AutoM>()
    }
}
