use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use jpeg_dc_preview::motion::{blur_3x3, compare_file_sizes, motion_percentage, to_grayscale};
use jpeg_dc_preview::{load_image, DecodeCache, DecodeMode, LoadOptions, MotionParams, PixelBuffer};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Compares two frames and reports whether enough of the picture changed to count as motion.
///
/// Exit codes: 0 no motion, 1 motion detected, 2 error.
#[derive(Parser, Debug)]
#[command(name = "jpeg_dc_preview", version)]
struct Args {
    image1: PathBuf,

    image2: PathBuf,

    /// Pixel difference threshold (0-255)
    #[arg(short = 't', default_value_t = 25)]
    pixel_threshold: u8,

    /// Compare every N-th pixel of every N-th row
    #[arg(short = 's', default_value_t = 1)]
    scale: usize,

    /// Percentage of changed pixels that counts as motion
    #[arg(short = 'm', default_value_t = 1.0)]
    motion_threshold: f32,

    /// Only compare file sizes minus estimated headers, with an optional threshold in percent
    #[arg(short = 'f', num_args = 0..=1, default_missing_value = "5.0")]
    file_size_threshold: Option<f32>,

    /// Compare grayscale images
    #[arg(short = 'g', action = ArgAction::SetTrue)]
    grayscale: bool,

    /// Smooth both images with a 3x3 box blur first
    #[arg(short = 'b', action = ArgAction::SetTrue)]
    blur: bool,

    /// Decode JPEGs from their DC coefficients only, falling back to a full decode
    #[arg(short = 'd', action = ArgAction::SetTrue)]
    dc_only: bool,

    /// Like -d, but fail for images that cannot be DC-decoded
    #[arg(long = "dc-strict", action = ArgAction::SetTrue)]
    dc_strict: bool,

    #[arg(short = 'v', action = ArgAction::SetTrue)]
    verbose: bool,

    /// Print load and compare timings
    #[arg(long, action = ArgAction::SetTrue)]
    benchmark: bool,
}

impl Args {
    fn motion_params(&self) -> MotionParams {
        MotionParams {
            pixel_threshold: self.pixel_threshold,
            step: self.scale.max(1),
            // grayscale comparison is on by default, -g only spells it out
            grayscale: self.grayscale || MotionParams::default().grayscale,
            blur: self.blur,
            motion_threshold: self.motion_threshold.max(0.0),
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            mode: match self.dc_only || self.dc_strict {
                true => DecodeMode::DcOnly,
                false => DecodeMode::Full,
            },
            strict: self.dc_strict,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(match args.verbose {
            true => LevelFilter::Info,
            false => LevelFilter::Warn,
        })
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether motion was detected.
fn run(args: &Args) -> Result<bool> {
    if let Some(threshold) = args.file_size_threshold {
        return compare_sizes(args, threshold.max(0.0));
    }

    let params = args.motion_params();
    let options = args.load_options();
    let start = Instant::now();

    if args.verbose {
        println!("=== Parameters ===");
        println!("Image 1: {}", args.image1.display());
        println!("Image 2: {}", args.image2.display());
        println!("Mode: {:?}{}", options.mode, if options.strict { " (strict)" } else { "" });
        println!("{:?}", params);
    }

    let mut cache1 = DecodeCache::new();
    let mut cache2 = DecodeCache::new();

    let image1 = load(&args.image1, &options, &mut cache1, args.verbose)?;
    let image2 = load(&args.image2, &options, &mut cache2, args.verbose)?;
    let load_time = start.elapsed();

    let compare_start = Instant::now();
    let (image1, image2) = prepare(image1, image2, &params);
    let motion = motion_percentage(&image1, &image2, &params)?;
    let compare_time = compare_start.elapsed();

    let motion_detected = motion >= params.motion_threshold;

    if args.verbose {
        println!("=== Motion Detection Results ===");
        println!("Image dimensions: {}x{}x{}", image1.width, image1.height, image1.channels);
        println!("Motion: {:.2}%", motion);
        println!("Threshold: {:.2}%", params.motion_threshold);
        println!(
            "Result: {}",
            if motion_detected { "MOTION_DETECTED" } else { "NO_MOTION" }
        );
    } else {
        println!("{}", motion);
    }

    if args.benchmark {
        print_timings(&[
            ("Image loading", load_time),
            ("Motion comparison", compare_time),
            ("Total", start.elapsed()),
        ]);
    }

    Ok(motion_detected)
}

fn compare_sizes(args: &Args, threshold: f32) -> Result<bool> {
    let start = Instant::now();
    let difference = compare_file_sizes(&args.image1, &args.image2)
        .context("could not compare file sizes")?;
    let elapsed = start.elapsed();

    let changed = difference >= threshold;

    if args.verbose {
        println!("=== File Size Comparison Results ===");
        println!("Content size difference: {}%", difference);
        println!("Size threshold: {}%", threshold);
        println!(
            "Result: {}",
            if changed { "SIZE_CHANGE" } else { "NO_SIZE_CHANGE" }
        );
    } else {
        println!("{}", difference);
    }

    if args.benchmark {
        print_timings(&[("File size comparison", elapsed)]);
    }

    Ok(changed)
}

fn load(
    path: &Path,
    options: &LoadOptions,
    cache: &mut DecodeCache,
    verbose: bool,
) -> Result<PixelBuffer> {
    let loaded = match load_image(path, options, Some(cache)) {
        Ok(loaded) => loaded,
        Err(err) => {
            if options.strict {
                eprintln!(
                    "{} is not compatible with JPEG DC-only mode. Possible reasons:",
                    path.display()
                );
                for reason in [
                    "not a JPEG file",
                    "progressive or otherwise non-baseline JPEG",
                    "malformed JPEG headers",
                    "unsupported JPEG variant",
                ] {
                    eprintln!("  - {}", reason);
                }
                eprintln!("Use -d instead of --dc-strict to fall back to a full decode");
            }
            return Err(err.context(format!("could not load {}", path.display())));
        }
    };

    if verbose {
        println!(
            "Loaded {}: {}x{}x{}{}",
            path.display(),
            loaded.buffer.width,
            loaded.buffer.height,
            loaded.buffer.channels,
            if loaded.fallback_used { " (full decode fallback)" } else { "" }
        );
    }

    Ok(loaded.buffer)
}

fn prepare(
    image1: PixelBuffer,
    image2: PixelBuffer,
    params: &MotionParams,
) -> (PixelBuffer, PixelBuffer) {
    let (image1, image2) = match params.grayscale {
        true => (to_grayscale(&image1), to_grayscale(&image2)),
        false => (image1, image2),
    };

    match params.blur {
        true => (blur_3x3(&image1), blur_3x3(&image2)),
        false => (image1, image2),
    }
}

fn print_timings(timings: &[(&str, Duration)]) {
    println!("=== Performance Metrics ===");
    for (label, duration) in timings {
        println!("{}: {:.3} ms", label, duration.as_secs_f64() * 1000.0);
    }
}
