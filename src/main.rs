//! Gender Classifier CLI
//!
//! Train the binary CNN on a folder of images, classify a single image file,
//! or classify webcam frames live.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use gender_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use gender_classifier::config::{AppConfig, AugmentationConfig};
use gender_classifier::dataset::{DataGenerator, ImageBatcher, ImageFolder, ImageFolderDataset, Subset};
use gender_classifier::inference::predictor::INVALID_PATH_MESSAGE;
use gender_classifier::inference::{
    run_webcam, FileClassification, Predictor, ReplayCamera, StopReason,
};
use gender_classifier::model::ModelArtifact;
use gender_classifier::training::{evaluate_model, run_training};
use gender_classifier::utils::format_duration;
use gender_classifier::utils::logging::{init_logging, LogConfig};

/// Binary image classifier: train, predict, webcam
#[derive(Parser, Debug)]
#[command(name = "gender_classifier")]
#[command(version)]
#[command(about = "Binary CNN image classifier with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// JSON configuration file (defaults are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier on a directory with one subdirectory per class
    Train {
        /// Path to the dataset directory
        #[arg(short, long)]
        dataset_dir: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size for training
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Adam learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Square image size
        #[arg(long)]
        image_size: Option<usize>,

        /// Fraction of each class held out for validation
        #[arg(long)]
        validation_split: Option<f64>,

        /// Output directory for the model artifact
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Artifact file stem
        #[arg(long)]
        model_name: Option<String>,

        /// Random seed for shuffling and augmentation
        #[arg(long)]
        seed: Option<u64>,

        /// Disable data augmentation
        #[arg(long, default_value = "false")]
        no_augmentation: bool,

        /// Write the effective configuration to this file before training
        #[arg(long)]
        save_config: Option<PathBuf>,
    },

    /// Classify one image file (prompts for the path when omitted)
    Predict {
        /// Path to the image
        image: Option<PathBuf>,

        /// Model artifact (`models/gender_classifier` or its .mpk/.json file)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Classify webcam frames live; press 'q' in the window to quit
    Webcam {
        /// Model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Camera device index
        #[arg(short, long, default_value = "0")]
        device: i32,

        /// Do not open a preview window
        #[arg(long, default_value = "false")]
        headless: bool,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<usize>,

        /// Replay still images from a directory instead of a camera
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Report accuracy, precision, recall and F1 on the validation subset
    Evaluate {
        /// Model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Path to the dataset directory
        #[arg(short, long)]
        dataset_dir: Option<PathBuf>,

        /// Fraction of each class held out for validation
        #[arg(long)]
        validation_split: Option<f64>,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the dataset directory
        #[arg(short, long)]
        dataset_dir: Option<PathBuf>,

        /// Fraction of each class held out for validation
        #[arg(long)]
        validation_split: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging(&LogConfig::for_cli(cli.verbose));

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => AppConfig::default(),
    };

    print_banner();

    match cli.command {
        Commands::Train {
            dataset_dir,
            epochs,
            batch_size,
            learning_rate,
            image_size,
            validation_split,
            model_dir,
            model_name,
            seed,
            no_augmentation,
            save_config,
        } => {
            if let Some(v) = dataset_dir {
                config.data.dataset_dir = v;
            }
            if let Some(v) = epochs {
                config.training.epochs = v;
            }
            if let Some(v) = batch_size {
                config.data.batch_size = v;
            }
            if let Some(v) = learning_rate {
                config.training.learning_rate = v;
            }
            if let Some(v) = image_size {
                config.data.image_size = v;
            }
            if let Some(v) = validation_split {
                config.data.validation_split = v;
            }
            if let Some(v) = model_dir {
                config.output.model_dir = v;
            }
            if let Some(v) = model_name {
                config.output.model_name = v;
            }
            if let Some(v) = seed {
                config.data.seed = v;
            }
            if no_augmentation {
                config.augmentation = AugmentationConfig::none();
            }

            cmd_train(&config, save_config.as_deref())?;
        }

        Commands::Predict { image, model } => {
            let artifact = resolve_artifact(&config, model.as_deref());
            cmd_predict(&artifact, image)?;
        }

        Commands::Webcam {
            model,
            device,
            headless,
            max_frames,
            replay,
        } => {
            let artifact = resolve_artifact(&config, model.as_deref());
            cmd_webcam(&artifact, device, headless, max_frames, replay.as_deref())?;
        }

        Commands::Evaluate {
            model,
            dataset_dir,
            validation_split,
        } => {
            if let Some(v) = dataset_dir {
                config.data.dataset_dir = v;
            }
            if let Some(v) = validation_split {
                config.data.validation_split = v;
            }
            let artifact = resolve_artifact(&config, model.as_deref());
            cmd_evaluate(&config, &artifact)?;
        }

        Commands::Stats {
            dataset_dir,
            validation_split,
        } => {
            if let Some(v) = dataset_dir {
                config.data.dataset_dir = v;
            }
            if let Some(v) = validation_split {
                config.data.validation_split = v;
            }
            cmd_stats(&config)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════╗
 ║   Gender Classifier                              ║
 ║   Binary CNN image classification with Burn      ║
 ╚══════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn resolve_artifact(config: &AppConfig, model: Option<&Path>) -> ModelArtifact {
    match model {
        Some(path) => ModelArtifact::from_path(path),
        None => ModelArtifact::from_config(&config.output),
    }
}

fn load_predictor(artifact: &ModelArtifact) -> Result<Predictor<DefaultBackend>> {
    println!("{}", "Loading model...".cyan());
    let device = default_device();
    let predictor = Predictor::<DefaultBackend>::load(artifact, &device)
        .with_context(|| format!("Failed to load model from {:?}", artifact.weights_path()))?;

    let metadata = predictor.metadata();
    info!(
        "Model classes: {} | image size: {}",
        metadata.class_names.join(", "),
        metadata.image_size
    );
    Ok(predictor)
}

fn cmd_train(config: &AppConfig, save_config: Option<&Path>) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    if let Some(path) = save_config {
        config
            .save(path)
            .with_context(|| format!("Failed to write configuration {:?}", path))?;
        info!("Configuration written to {:?}", path);
    }

    println!("{}", "Initializing Training...".green().bold());
    println!("  🖥️  Backend: {}", backend_name());
    println!("  📁 Dataset: {:?}", config.data.dataset_dir);
    println!();

    let device = default_device();
    let outcome = run_training::<TrainingBackend>(config, &device)?;

    if let Some(summary) = &outcome.metadata.training {
        println!("  ⏱️  Duration: {}", format_duration(summary.duration_secs));
        println!(
            "  🎯 Final accuracy: {:.2}%",
            summary.final_train_accuracy * 100.0
        );
        if let Some(acc) = summary.final_val_accuracy {
            println!("  ✅ Final validation accuracy: {:.2}%", acc * 100.0);
        }
    }

    println!();
    println!("{}", "Next steps:".cyan().bold());
    println!(
        "  • Classify an image: gender_classifier predict <image> --model {:?}",
        outcome.artifact.weights_path()
    );
    println!(
        "  • Live webcam:       gender_classifier webcam --model {:?}",
        outcome.artifact.weights_path()
    );

    Ok(())
}

/// Ask for a path on stdin
fn prompt_image_path() -> Result<PathBuf> {
    print!("Enter the image path: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

fn cmd_predict(artifact: &ModelArtifact, image: Option<PathBuf>) -> Result<()> {
    let predictor = load_predictor(artifact)?;

    let path = match image {
        Some(path) => path,
        None => prompt_image_path()?,
    };

    match predictor.classify_file(&path)? {
        FileClassification::Predicted(result) => {
            println!();
            println!("{} {}", "Prediction:".green().bold(), result.label.bold());
            info!(
                "p(class 1) = {:.4}, confidence {:.2}%, {:.2} ms",
                result.probability,
                result.confidence() * 100.0,
                result.inference_time_ms
            );
        }
        FileClassification::InvalidPath(path) => {
            println!("{} {}: {:?}", "Error:".red(), INVALID_PATH_MESSAGE, path);
        }
    }

    Ok(())
}

fn cmd_webcam(
    artifact: &ModelArtifact,
    device: i32,
    headless: bool,
    max_frames: Option<usize>,
    replay: Option<&Path>,
) -> Result<()> {
    let predictor = load_predictor(artifact)?;

    if let Some(dir) = replay {
        println!("{} {:?}", "Replaying frames from".cyan(), dir);
        let mut camera = ReplayCamera::from_dir(dir)?;
        let summary = run_webcam(&predictor, &mut camera, max_frames)?;
        for overlay in camera.overlays() {
            println!("  {}", overlay);
        }
        println!("  {} frames classified", summary.frames);
        return Ok(());
    }

    let mut camera = open_camera(device, headless)?;
    if !headless {
        println!("Press {} in the preview window to quit", "'q'".bold());
    }

    let summary = run_webcam(&predictor, &mut camera, max_frames)?;
    match summary.stop_reason {
        StopReason::CameraUnavailable => {
            println!("{} could not access the camera", "Error:".red());
        }
        StopReason::UserQuit | StopReason::FrameLimit => {
            println!("  {} frames classified", summary.frames);
        }
    }

    Ok(())
}

#[cfg(feature = "webcam")]
fn open_camera(
    device: i32,
    headless: bool,
) -> Result<impl gender_classifier::inference::CameraDevice> {
    use gender_classifier::inference::OpenCvCamera;

    OpenCvCamera::open(device, !headless).context("could not access the camera")
}

#[cfg(not(feature = "webcam"))]
fn open_camera(device: i32, headless: bool) -> Result<ReplayCamera> {
    let _ = (device, headless);
    bail!("this binary was built without camera support; rebuild with `--features webcam` or use `--replay <dir>`")
}

fn cmd_evaluate(config: &AppConfig, artifact: &ModelArtifact) -> Result<()> {
    let predictor = load_predictor(artifact)?;
    let metadata = predictor.metadata().clone();

    let folder = ImageFolder::open_binary(&config.data.dataset_dir)
        .with_context(|| format!("Failed to scan {:?}", config.data.dataset_dir))?;
    if folder.class_names != metadata.class_names {
        warn!(
            "Dataset classes [{}] differ from model classes [{}]",
            folder.class_names.join(", "),
            metadata.class_names.join(", ")
        );
    }

    let mut samples = folder.subset(Subset::Validation, config.data.validation_split);
    if samples.is_empty() {
        warn!("Validation subset is empty; evaluating on every image");
        samples = folder.subset(Subset::Training, 0.0);
    }

    println!("{}", "Pre-loading Evaluation Data...".cyan().bold());
    let dataset = ImageFolderDataset::load(&samples, metadata.image_size, config.data.seed)?;
    let mut generator = DataGenerator::new(dataset, config.data.batch_size, false, config.data.seed);

    let device = default_device();
    let batcher = ImageBatcher::new(metadata.image_size);
    let Some(evaluation) = evaluate_model(predictor.model(), &mut generator, &batcher, &device) else {
        bail!("no readable images to evaluate in {:?}", config.data.dataset_dir);
    };

    println!();
    println!("{}", "Evaluation Results:".cyan().bold());
    println!("{}", evaluation.metrics.display(&metadata.class_names));

    Ok(())
}

fn cmd_stats(config: &AppConfig) -> Result<()> {
    let folder = ImageFolder::open(&config.data.dataset_dir)
        .with_context(|| format!("Failed to scan {:?}", config.data.dataset_dir))?;

    let stats = folder.stats(config.data.validation_split);
    stats.print();

    if folder.num_classes() != 2 {
        println!();
        println!(
            "{} training needs exactly 2 class directories, found {}",
            "Warning:".yellow(),
            folder.num_classes()
        );
    }

    Ok(())
}
