//! Inspects the state dict of the convolutional network and of its SGD
//! optimizer, optionally running a few synthetic training steps so the
//! per-parameter optimizer state becomes populated.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::Distribution;
use burn::tensor::backend::AutodiffBackend;
use burn_convnet::artifacts::{ArtifactStore, MODEL_CONFIG_NAME, TRAINING_CONFIG_NAME};
use burn_convnet::backend::{MainAutoBackend, MainDevice};
use burn_convnet::prelude::*;
use burn_convnet::training::{self, TrainingConfig};
use std::path::PathBuf;

pub const HELP: &str = "\
Burn Convnet State-Dict Example

Prints the name-to-tensor mapping of the convolutional network and the
state of its SGD optimizer. Configurations, model weights, and optimizer
state are persisted in an artifacts directory.

BEHAVIOR OVERVIEW
- Model and training configs are loaded from the artifacts directory; if
  absent, defaults are created and saved.
- Model weights and optimizer state are loaded from the artifacts directory
  if present; otherwise new ones are created and saved.
- A freshly created optimizer has no per-parameter state; its state dict
  prints as empty until at least one training step runs.
- With --steps N, N training steps over synthetic batches run and the
  updated model and optimizer are saved back to the artifacts directory.

FLAGS:
    -h, --help                  Show this help message and exit
        --stats                 Print per-parameter summary statistics

OPTIONS:
    -s, --steps <N>             Run N synthetic training steps before the
                                second optimizer state-dict printout
    -a, --artifacts-path <PATH>
                                Directory where configurations, model weights,
                                and optimizer state are saved and loaded.
                                If the directory does not exist, it will be created.
                                Defaults to a newly created temporary directory (path will be printed).
";

#[derive(Debug)]
pub struct AppArgs {
    pub steps: Option<usize>,
    pub stats: bool,
    pub artifacts_path: PathBuf,
}

impl AppArgs {
    pub fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        let args = AppArgs {
            steps: pargs.opt_value_from_str(["-s", "--steps"])?,
            artifacts_path: pargs
                .opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?
                .unwrap_or_else(|| {
                    // e.g. /tmp/burn-convnet-state-dict-abcd-0
                    let name = format!(
                        "{}-{}-",
                        std::env!("CARGO_PKG_NAME"), // burn-convnet
                        std::env!("CARGO_BIN_NAME")  // state-dict
                    );
                    let tmp = temp_dir::TempDir::with_prefix(name)
                        .expect("Failed to create the temporary directory")
                        .dont_delete_on_drop();
                    let path = tmp.path();
                    println!("new artifacts directory: {path:?}");
                    path.into()
                }),
            // must parse flags after values
            stats: pargs.contains("--stats"),
        };

        // It's up to the caller what to do with the remaining arguments.
        let remaining = pargs.finish();
        if !remaining.is_empty() {
            panic!("unused arguments: {remaining:?}");
        }
        Ok(args)
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(s.into())
}

pub fn launch<AutoB>(app_args: &AppArgs)
where
    AutoB: AutodiffBackend + MainDevice,
{
    let device = AutoB::main_device();
    let store = ArtifactStore::open(&app_args.artifacts_path)
        .expect("Failed to open the artifacts directory");

    let model_config: ConvNetConfig = store
        .load_or_save_config(MODEL_CONFIG_NAME, ConvNetConfig::new)
        .expect("Failed to set up the model config");
    let training_config: TrainingConfig = store
        .load_or_save_config(TRAINING_CONFIG_NAME, || TrainingConfig::new(SgdSettings::new()))
        .expect("Failed to set up the training config");

    let mut model: ConvNet<AutoB> = store
        .load_or_save_model(&model_config, &device)
        .expect("Failed to set up the model");
    let mut optim: SgdOptimizer<ConvNet<AutoB>, AutoB> = store
        .load_or_save_optim(&training_config.optimizer, &device)
        .expect("Failed to set up the optimizer");

    println!("model state dict:");
    let params = model.state_dict();
    println!("{params}");
    assert_eq!(params.total_params(), model.num_params());

    println!("optimizer state dict:");
    let optim_state = OptimizerStateDict::collect(&training_config.optimizer, &optim, &params);
    println!("{optim_state}");

    let steps = app_args.steps.unwrap_or(0);
    if steps > 0 {
        let run_config = training_config.with_steps(steps);
        let (trained, losses) =
            training::train(&run_config, &model_config, model, &mut optim, &device);
        model = trained;
        for (step, loss) in losses.iter().enumerate() {
            println!("step {}/{steps}: loss {loss:.4}", step + 1);
        }

        let params = model.state_dict();
        println!("optimizer state dict after {steps} step(s):");
        let optim_state = OptimizerStateDict::collect(&run_config.optimizer, &optim, &params);
        println!("{optim_state}");

        store.save_model(&model).expect("Failed to save the model");
        store.save_optim(&optim).expect("Failed to save the optimizer");
    }

    if app_args.stats {
        println!("parameter statistics:");
        let stats = model.param_stats();
        let width = stats.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, summary) in &stats {
            println!("{name:width$}  {summary}");
        }
    }

    // inference on the inner backend, where dropout is a no-op
    let valid_model = model.valid();
    let images = Tensor::<AutoB::InnerBackend, 4>::random(
        [
            4,
            model_config.channels_in,
            model_config.image_size,
            model_config.image_size,
        ],
        Distribution::Normal(0.0, 1.0),
        &device,
    );
    let predicted = valid_model.forward(images).argmax(1);
    println!("predicted classes: {}", predicted);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("burn_convnet=info".parse().unwrap()),
        )
        .init();
    let app_args = AppArgs::parse().unwrap();
    launch::<MainAutoBackend>(&app_args);
}
