use clap::Parser;
use siamtrack::io::load_rgb_frame;
use siamtrack::{
    BoundingBox, PooledEmbedding, ResponsePeak, SiameseTracker, StepOutput, TrackerConfig,
    UpsampleMethod,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SiamTrack CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TrackerConfigJson {
    z_image_size: usize,
    x_image_size: usize,
    num_scales: usize,
    scale_step: f32,
    context_amount: f32,
    upsample_method: String,
    upsample_factor: usize,
    response_scale: f32,
    response_bias: f32,
    log_level: u32,
}

impl Default for TrackerConfigJson {
    fn default() -> Self {
        let cfg = TrackerConfig::default();
        Self {
            z_image_size: cfg.z_image_size,
            x_image_size: cfg.x_image_size,
            num_scales: cfg.num_scales,
            scale_step: cfg.scale_step,
            context_amount: cfg.context_amount,
            upsample_method: cfg.upsample_method.to_string(),
            upsample_factor: cfg.upsample_factor,
            response_scale: cfg.response_scale,
            response_bias: cfg.response_bias,
            log_level: cfg.log_level,
        }
    }
}

impl TryFrom<TrackerConfigJson> for TrackerConfig {
    type Error = siamtrack::SiamTrackError;

    fn try_from(value: TrackerConfigJson) -> Result<Self, Self::Error> {
        Ok(Self {
            z_image_size: value.z_image_size,
            x_image_size: value.x_image_size,
            num_scales: value.num_scales,
            scale_step: value.scale_step,
            context_amount: value.context_amount,
            upsample_method: value.upsample_method.parse::<UpsampleMethod>()?,
            upsample_factor: value.upsample_factor,
            response_scale: value.response_scale,
            response_bias: value.response_bias,
            log_level: value.log_level,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    frames: Vec<String>,
    /// Target box of the first frame as `[center_y, center_x, height, width]`.
    init_box: [f32; 4],
    output_path: Option<String>,
    tracker: TrackerConfigJson,
}

#[derive(Debug, Serialize)]
struct PeakRecord {
    scale: usize,
    y: usize,
    x: usize,
    score: f32,
}

impl From<ResponsePeak> for PeakRecord {
    fn from(value: ResponsePeak) -> Self {
        Self {
            scale: value.scale,
            y: value.y,
            x: value.x,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: String,
    scale_factors: Vec<f32>,
    response_shape: [usize; 3],
    best: Option<PeakRecord>,
    per_scale: Vec<PeakRecord>,
}

impl FrameRecord {
    fn from_step(frame: &str, out: &StepOutput) -> Self {
        let per_scale = (0..out.response_up.num_scales())
            .filter_map(|s| out.response_up.peak_in(s))
            .map(PeakRecord::from)
            .collect();
        Self {
            frame: frame.to_string(),
            scale_factors: out.scale_factors.clone(),
            response_shape: out.response_up.shape(),
            best: out.response_up.peak().map(PeakRecord::from),
            per_scale,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    exemplar_shape: [usize; 4],
    frames: Vec<FrameRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("siamtrack=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let Some((first, rest)) = config.frames.split_first() else {
        return Err("frames must list at least one image".into());
    };
    let bbox = BoundingBox::from_array(config.init_box);
    bbox.validate()?;

    let cfg = TrackerConfig::try_from(config.tracker)?;
    let keep_search_images = cfg.keep_search_images_default();
    let mut tracker = SiameseTracker::new(PooledEmbedding::alexnet(), cfg)?;

    let first_frame = load_rgb_frame(first)?;
    let exemplar = tracker.initialize(first_frame.view(), &bbox)?;
    tracing::info!(frame = %first, shape = ?exemplar.template.shape(), "exemplar ready");

    let mut frames = Vec::with_capacity(rest.len());
    for path in rest {
        let frame = load_rgb_frame(path)?;
        let out = tracker.step_with_stored(frame.view(), &bbox, keep_search_images)?;
        if let Some(images) = &out.search_images {
            tracing::debug!(frame = %path, shape = ?images.shape(), "search crops kept");
        }
        frames.push(FrameRecord::from_step(path, &out));
    }

    let output = Output {
        exemplar_shape: exemplar.template.shape(),
        frames,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
