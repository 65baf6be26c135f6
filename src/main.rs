use clap::{Parser, Subcommand};
use colorspot::pipeline::analysis::{Channel, PhotoAnalysis};
use colorspot::{
    shared, AppError, Canvas, ColorHighlighter, DominantColor, FsImageLoader, HighlightOutcome,
    HighlightRequest, ImageLoader, ImageSource, PhotoAnalyzer, Settings, SurfaceError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "colorspot")]
#[command(version, about = "Find where a color appears in a photo", long_about = None)]
struct Cli {
    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the highlight overlay for a color to a PNG
    Highlight {
        /// Input photo
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Target color: #rrggbb, #rgb or R,G,B
        #[arg(long, value_name = "COLOR")]
        color: DominantColor,

        /// Output PNG
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Overlay width (defaults to the photo width, or keeps aspect with --height)
        #[arg(long, value_name = "PX")]
        width: Option<u32>,

        /// Overlay height (defaults to the photo height, or keeps aspect with --width)
        #[arg(long, value_name = "PX")]
        height: Option<u32>,

        /// Match tolerance, overrides the settings file
        #[arg(long, value_name = "DISTANCE")]
        tolerance: Option<f32>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dominant colors of a photo
    Palette {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Number of colors to report
        #[arg(short = 'n', long, value_name = "N")]
        max_colors: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Histogram, palette and quality assessment
    Analyze {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn output_size(source: (u32, u32), width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let (sw, sh) = source;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, ((w as u64 * sh as u64) / sw.max(1) as u64).max(1) as u32),
        (None, Some(h)) => (((h as u64 * sw as u64) / sh.max(1) as u64).max(1) as u32, h),
        (None, None) => (sw, sh),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}

fn print_analysis(analysis: &PhotoAnalysis) {
    println!("{}x{}", analysis.width, analysis.height);
    println!(
        "mean luminance {:.1}, peak at {}",
        analysis.histogram.mean(Channel::Luminance),
        analysis.histogram.peak(Channel::Luminance).0
    );
    println!("palette:");
    for color in &analysis.palette {
        println!("  {}", color.caption());
    }
    let q = &analysis.quality;
    println!("quality: {:.0}/100 ({:?})", q.overall, q.rating);
    println!("  sharpness     {:>5.1}", q.sharpness.score);
    println!("  noise         {:>5.1}", q.noise.score);
    println!(
        "  dynamic range {:>5.1} ({:.1} stops)",
        q.dynamic_range.score, q.dynamic_range_stops
    );
    println!("  focus         {:>5.1}", q.focus.score);
    println!("  contrast      {:>5.1}", q.contrast.score);
    for issue in &q.issues {
        println!("  - {}", issue.advice());
    }
}

async fn highlight(
    settings: &Settings,
    input: &Path,
    color: DominantColor,
    out: &Path,
    size: (Option<u32>, Option<u32>),
    tolerance: Option<f32>,
    json: bool,
) -> Result<(), AppError> {
    let loader = Arc::new(FsImageLoader::new());
    let image = loader.load(&ImageSource::Path(input.to_path_buf())).await?;
    let (width, height) = output_size((image.width(), image.height()), size.0, size.1);

    let mut config = settings.highlight.clone();
    if let Some(tolerance) = tolerance {
        config = config.with_tolerance(tolerance);
        config.validate()?;
    }

    let highlighter = ColorHighlighter::new(loader, config);
    let canvas = shared(Canvas::new(width, height));
    let request = HighlightRequest::new(ImageSource::from(image), color, width, height);

    match highlighter.highlight(request, &canvas).await {
        HighlightOutcome::Drawn(report) => {
            canvas
                .lock()
                .map_err(|_| SurfaceError::Poisoned)?
                .save_png(out)?;
            info!("Wrote overlay to {}", out.display());
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{}: {:.1}% of {}x{} matched",
                    report.caption,
                    report.coverage * 100.0,
                    report.width,
                    report.height
                );
            }
            Ok(())
        }
        other => Err(AppError::NothingDrawn(format!("{:?}", other))),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(settings.logging.level()?);

    match cli.command {
        Commands::Highlight {
            input,
            color,
            out,
            width,
            height,
            tolerance,
            json,
        } => highlight(&settings, &input, color, &out, (width, height), tolerance, json).await,
        Commands::Palette {
            input,
            max_colors,
            json,
        } => {
            let image = FsImageLoader::new().load(&ImageSource::Path(input)).await?;
            let mut config = settings.analysis.clone();
            if let Some(n) = max_colors {
                config = config.with_max_colors(n);
                config.validate()?;
            }
            let palette = PhotoAnalyzer::new(config).palette(&image);
            if json {
                print_json(&palette)?;
            } else {
                for color in &palette {
                    println!("{}", color.caption());
                }
            }
            Ok(())
        }
        Commands::Analyze { input, json } => {
            let image = FsImageLoader::new().load(&ImageSource::Path(input)).await?;
            let analyzer = PhotoAnalyzer::new(settings.analysis.clone());
            let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&image))
                .await
                .map_err(|e| AppError::Analysis(e.to_string()))?;
            if json {
                print_json(&analysis)?;
            } else {
                print_analysis(&analysis);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_keeps_aspect() {
        assert_eq!(output_size((4000, 3000), None, None), (4000, 3000));
        assert_eq!(output_size((4000, 3000), Some(800), None), (800, 600));
        assert_eq!(output_size((4000, 3000), None, Some(300)), (400, 300));
        assert_eq!(output_size((4000, 3000), Some(10), Some(10)), (10, 10));
    }

    #[test]
    fn test_json_failure_is_a_json_error() {
        // tuple keys have no JSON object form
        let map: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();
        assert!(matches!(print_json(&map), Err(AppError::Json(_))));
        assert!(print_json(&vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn test_cli_parses_highlight() {
        let cli = Cli::try_parse_from([
            "colorspot",
            "highlight",
            "photo.jpg",
            "--color",
            "#ff0000",
            "-o",
            "overlay.png",
            "--width",
            "800",
        ])
        .unwrap();
        match cli.command {
            Commands::Highlight { color, width, .. } => {
                assert_eq!(color.rgb, [255, 0, 0]);
                assert_eq!(width, Some(800));
            }
            _ => panic!("expected highlight"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_color() {
        let result = Cli::try_parse_from([
            "colorspot",
            "highlight",
            "photo.jpg",
            "--color",
            "not-a-color",
            "-o",
            "overlay.png",
        ]);
        assert!(result.is_err());
    }
}
