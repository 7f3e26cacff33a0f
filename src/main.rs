use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use dither_core::{Adjustments, Algorithm, ColorMode, MultiToneVariant, PaletteColor, PatternKind, RenderOptions};
use ditherlab::{
    dither_once, dither_progressively, BackendSet, ModuleConfig, ProgressiveOptions, RenderEvent,
};

#[derive(Parser)]
#[command(name = "ditherlab")]
#[command(about = "Render an image through the dithering engine")]
struct Cli {
    /// Input image path (any format the image crate decodes)
    input: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = "dithered.png")]
    output: PathBuf,

    /// Dithering algorithm
    #[arg(short, long, value_enum, default_value = "floyd-steinberg")]
    algorithm: AlgorithmArg,

    /// Binary threshold (error diffusion, ordered, stochastic)
    #[arg(long, default_value_t = 128)]
    threshold: u8,

    /// Dot size (ordered tiling, halftone dots, multi-tone matrix)
    #[arg(long, default_value_t = 4)]
    dot_size: u32,

    /// Halftone dot spacing in pixels
    #[arg(long, default_value_t = 8)]
    spacing: u32,

    /// Halftone screen angle in degrees
    #[arg(long, default_value_t = 45.0)]
    angle: f32,

    /// Pattern shape for the pattern algorithm
    #[arg(long, value_enum, default_value = "dots")]
    pattern: PatternArg,

    /// Pattern tile size
    #[arg(long, default_value_t = 4)]
    pattern_size: u32,

    /// Multi-tone interval count
    #[arg(long, default_value_t = 4)]
    levels: u8,

    /// Multi-tone level selection strategy
    #[arg(long, value_enum, default_value = "ordered")]
    multi_tone: MultiToneArg,

    /// Noise amplitude for the random algorithm
    #[arg(long, default_value_t = 128.0)]
    noise: f32,

    /// Color mode
    #[arg(short = 'm', long, value_enum, default_value = "bw")]
    mode: ModeArg,

    /// Custom palette as comma-separated hex colors (with --mode custom)
    #[arg(long)]
    colors: Option<String>,

    /// Brightness adjustment, -100..100
    #[arg(long, default_value_t = 0.0)]
    brightness: f32,

    /// Contrast adjustment, -100..100
    #[arg(long, default_value_t = 0.0)]
    contrast: f32,

    /// Gamma correction, 0.1..5.0
    #[arg(long, default_value_t = 1.0)]
    gamma: f32,

    /// Render progressively with a progress bar
    #[arg(short, long)]
    progressive: bool,

    /// Progress step count for progressive rendering
    #[arg(long, default_value_t = 10)]
    steps: usize,

    /// URL of the compiled numeric module artifact; enables the module tier
    #[arg(long)]
    module_url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Ordered,
    FloydSteinberg,
    Atkinson,
    JarvisJudiceNinke,
    Stucki,
    Burkes,
    SierraLite,
    Random,
    BlueNoise,
    VoidAndCluster,
    Riemersma,
    DirectBinarySearch,
    Halftone,
    Pattern,
    MultiTone,
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    Dots,
    Lines,
    Crosses,
    Diamonds,
    Waves,
    Bricks,
    Checker,
}

impl From<PatternArg> for PatternKind {
    fn from(value: PatternArg) -> Self {
        match value {
            PatternArg::Dots => PatternKind::Dots,
            PatternArg::Lines => PatternKind::Lines,
            PatternArg::Crosses => PatternKind::Crosses,
            PatternArg::Diamonds => PatternKind::Diamonds,
            PatternArg::Waves => PatternKind::Waves,
            PatternArg::Bricks => PatternKind::Bricks,
            PatternArg::Checker => PatternKind::Checker,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MultiToneArg {
    Ordered,
    ErrorDiffusion,
    BlueNoise,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Bw,
    Rgb,
    Cmyk,
    Custom,
}

impl Cli {
    fn algorithm(&self) -> Algorithm {
        match self.algorithm {
            AlgorithmArg::Ordered => Algorithm::Ordered {
                dot_size: self.dot_size,
                threshold: self.threshold,
            },
            AlgorithmArg::FloydSteinberg => Algorithm::FloydSteinberg {
                threshold: self.threshold,
            },
            AlgorithmArg::Atkinson => Algorithm::Atkinson {
                threshold: self.threshold,
            },
            AlgorithmArg::JarvisJudiceNinke => Algorithm::JarvisJudiceNinke {
                threshold: self.threshold,
            },
            AlgorithmArg::Stucki => Algorithm::Stucki {
                threshold: self.threshold,
            },
            AlgorithmArg::Burkes => Algorithm::Burkes {
                threshold: self.threshold,
            },
            AlgorithmArg::SierraLite => Algorithm::SierraLite {
                threshold: self.threshold,
            },
            AlgorithmArg::Random => Algorithm::Random {
                threshold: self.threshold,
                noise_amplitude: self.noise,
            },
            AlgorithmArg::BlueNoise => Algorithm::BlueNoise {
                threshold: self.threshold,
            },
            AlgorithmArg::VoidAndCluster => Algorithm::VoidAndCluster,
            AlgorithmArg::Riemersma => Algorithm::Riemersma {
                threshold: self.threshold,
            },
            AlgorithmArg::DirectBinarySearch => Algorithm::DirectBinarySearch {
                threshold: self.threshold,
            },
            AlgorithmArg::Halftone => Algorithm::Halftone {
                dot_size: self.dot_size,
                spacing: self.spacing,
                angle: self.angle,
            },
            AlgorithmArg::Pattern => Algorithm::Pattern {
                kind: self.pattern.into(),
                size: self.pattern_size,
            },
            AlgorithmArg::MultiTone => Algorithm::MultiTone {
                levels: self.levels,
                variant: match self.multi_tone {
                    MultiToneArg::Ordered => MultiToneVariant::Ordered,
                    MultiToneArg::ErrorDiffusion => MultiToneVariant::ErrorDiffusion,
                    MultiToneArg::BlueNoise => MultiToneVariant::BlueNoise,
                },
                dot_size: self.dot_size,
            },
        }
    }

    fn color_mode(&self) -> anyhow::Result<ColorMode> {
        Ok(match self.mode {
            ModeArg::Bw => ColorMode::Grayscale,
            ModeArg::Rgb => ColorMode::Rgb,
            ModeArg::Cmyk => ColorMode::Cmyk,
            ModeArg::Custom => {
                let Some(colors) = &self.colors else {
                    bail!("--mode custom requires --colors");
                };
                let colors = colors
                    .split(',')
                    .map(|hex| PaletteColor::from_hex(hex.trim()))
                    .collect::<Result<Vec<_>, _>>()
                    .context("parsing --colors")?;
                if colors.len() < 2 {
                    bail!("--colors needs at least two entries");
                }
                ColorMode::Custom { colors }
            }
        })
    }

    fn render_options(&self) -> anyhow::Result<RenderOptions> {
        Ok(RenderOptions {
            algorithm: self.algorithm(),
            color_mode: self.color_mode()?,
            adjustments: Adjustments {
                brightness: self.brightness,
                contrast: self.contrast,
                gamma: self.gamma,
                ..Default::default()
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let render = cli.render_options()?;

    let source = image::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?
        .to_rgba8();
    let (width, height) = (source.width() as usize, source.height() as usize);

    let module_config = cli.module_url.clone().map(ModuleConfig::new);
    let backends = Arc::new(BackendSet::detect(module_config));

    let pixels = if cli.progressive {
        let mut options =
            ProgressiveOptions::new(source.into_raw(), width, height, render);
        options.progress_steps = cli.steps;
        // The bar is the only consumer; full partial buffers are wasted work.
        options.emit_partials = false;

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos:>3}% {msg}")
                .expect("static template"),
        );

        let (_handle, mut events) = dither_progressively(backends, options);
        let mut final_image = None;
        while let Some(event) = events.next().await {
            match event? {
                RenderEvent::Progress { percent, .. } => bar.set_position(u64::from(percent)),
                RenderEvent::Complete(image) => final_image = Some(image),
            }
        }
        bar.finish_with_message("done");
        final_image
            .context("job ended without a completion event")?
            .into_pixels()
    } else {
        dither_once(&backends, source.as_raw(), width, height, &render)?.into_pixels()
    };

    let out = image::RgbaImage::from_raw(width as u32, height as u32, pixels)
        .context("assembling output image")?;
    out.save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    eprintln!("wrote {}", cli.output.display());
    Ok(())
}
