use image::ImageOutputFormat;
use log::*;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::exit;
use stereo_measure::calib::CalibrationModel;
use stereo_measure::disparity::visualize;
use stereo_measure::features::DetectorKind;
use stereo_measure::nalgebra::Point2;
use stereo_measure::{MeasureRequest, PipelineConfig, StereoPair, StereoPipeline};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "measure",
    about = "A tool to measure distances between points in stereo photographs"
)]
struct Opt {
    /// JSON file with the pipeline configuration.
    ///
    /// Missing fields keep their default values.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Computes the disparity map of a rectified pair and writes it as a grayscale image.
    Disparity {
        #[structopt(flatten)]
        pair: PairOpt,
        /// The output path to write to (autodetects image type from extension).
        ///
        /// If this is not provided, then the output goes to stdout as a PNG.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Prints the distance between two pixels of the left image.
    Distance {
        #[structopt(flatten)]
        pair: PairOpt,
        /// First point as `X,Y` in pixels of the left image.
        #[structopt(long, parse(try_from_str = parse_point))]
        point_a: Point2<f64>,
        /// Second point as `X,Y` in pixels of the left image.
        #[structopt(long, parse(try_from_str = parse_point))]
        point_b: Point2<f64>,
        /// Focal length in pixels.
        #[structopt(long)]
        focal: f64,
        /// Distance between the cameras. The result has the same unit.
        #[structopt(long)]
        baseline: f64,
    },
    /// Matches features between two photos and draws the matches side by side.
    Match {
        /// The first photo.
        #[structopt(parse(from_os_str))]
        a: PathBuf,
        /// The second photo.
        #[structopt(parse(from_os_str))]
        b: PathBuf,
        /// `orb` or `akaze`. Overrides the configuration file.
        #[structopt(long, parse(try_from_str = parse_detector))]
        detector: Option<DetectorKind>,
        /// The output path to write to (autodetects image type from extension).
        ///
        /// If this is not provided, then the output goes to stdout as a PNG.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, StructOpt)]
struct PairOpt {
    /// The left image of the pair.
    #[structopt(parse(from_os_str))]
    left: PathBuf,
    /// The right image of the pair.
    #[structopt(parse(from_os_str))]
    right: PathBuf,
    /// JSON calibration of the left camera.
    #[structopt(long, parse(from_os_str))]
    left_calibration: Option<PathBuf>,
    /// JSON calibration of the right camera.
    #[structopt(long, parse(from_os_str))]
    right_calibration: Option<PathBuf>,
}

/// Calibration results in the layout calibration tools usually dump them.
#[derive(Debug, Deserialize)]
struct CalibrationFile {
    ret: f64,
    mtx: Vec<Vec<f64>>,
    dist: Vec<Vec<f64>>,
    rvecs: Vec<Vec<f64>>,
    tvecs: Vec<Vec<f64>>,
    total_error: f64,
}

fn parse_point(s: &str) -> Result<Point2<f64>, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let coordinate = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate {v:?}: {e}"))
    };
    Ok(Point2::new(coordinate(x)?, coordinate(y)?))
}

fn parse_detector(s: &str) -> Result<DetectorKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "orb" => Ok(DetectorKind::Orb),
        "akaze" => Ok(DetectorKind::Akaze),
        _ => Err(format!("unknown detector {s:?}, expected orb or akaze")),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{}", message);
    eprintln!("error: {message}");
    exit(1)
}

fn load_config(path: Option<&Path>) -> PipelineConfig {
    let Some(path) = path else {
        return PipelineConfig::default();
    };
    let file = File::open(path).expect("failed to open configuration file");
    serde_json::from_reader(BufReader::new(file))
        .unwrap_or_else(|e| fail(format!("invalid configuration {}: {e}", path.display())))
}

fn load_calibration(path: Option<&Path>) -> Option<CalibrationModel> {
    let path = path?;
    let file = File::open(path).expect("failed to open calibration file");
    let raw: CalibrationFile = serde_json::from_reader(BufReader::new(file))
        .unwrap_or_else(|e| fail(format!("invalid calibration {}: {e}", path.display())));
    let calibration = CalibrationModel::from_rows(
        raw.ret,
        &raw.mtx,
        &raw.dist,
        &raw.rvecs,
        &raw.tvecs,
        raw.total_error,
    )
    .unwrap_or_else(|e| fail(format!("{}: {e}", path.display())));
    info!(
        "Loaded calibration of {} views from {}",
        calibration.view_count(),
        path.display()
    );
    Some(calibration)
}

fn write_image(image: impl Into<image::DynamicImage>, output: Option<PathBuf>) {
    let image = image.into();
    if let Some(path) = output {
        image.save(path).expect("failed to write image to file");
    } else {
        let mut buf = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageOutputFormat::Png)
            .expect("failed to write image to stdout");
        std::io::Write::write_all(&mut std::io::stdout().lock(), buf.get_ref())
            .expect("failed to write image to stdout");
    }
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    let mut config = load_config(opt.config.as_deref());
    if let Command::Match {
        detector: Some(detector),
        ..
    } = opt.command
    {
        config.detector = detector;
    }
    let pipeline = StereoPipeline::new(config).unwrap_or_else(|e| fail(e));

    match opt.command {
        Command::Disparity { pair, output } => {
            let left = image::open(&pair.left).expect("failed to open left image");
            let right = image::open(&pair.right).expect("failed to open right image");
            let left_calibration = load_calibration(pair.left_calibration.as_deref());
            let right_calibration = load_calibration(pair.right_calibration.as_deref());
            let stereo_pair = StereoPair {
                left_calibration: left_calibration.as_ref(),
                right_calibration: right_calibration.as_ref(),
                ..StereoPair::new(&left, &right)
            };
            let map = pipeline.disparity(stereo_pair).unwrap_or_else(|e| fail(e));
            info!(
                "{} of {} pixels matched",
                map.valid_count(),
                map.width() * map.height()
            );
            write_image(visualize(&map), output);
        }
        Command::Distance {
            pair,
            point_a,
            point_b,
            focal,
            baseline,
        } => {
            let left = image::open(&pair.left).expect("failed to open left image");
            let right = image::open(&pair.right).expect("failed to open right image");
            let left_calibration = load_calibration(pair.left_calibration.as_deref());
            let right_calibration = load_calibration(pair.right_calibration.as_deref());
            let stereo_pair = StereoPair {
                left_calibration: left_calibration.as_ref(),
                right_calibration: right_calibration.as_ref(),
                ..StereoPair::new(&left, &right)
            };
            let request = MeasureRequest {
                point_a,
                point_b,
                focal_length: focal,
                baseline,
            };
            let measurement = pipeline
                .measure(stereo_pair, request)
                .unwrap_or_else(|e| fail(e));
            debug!(
                "Points at {} and {}",
                measurement.point_a, measurement.point_b
            );
            println!("{}", measurement.distance);
        }
        Command::Match { a, b, output, .. } => {
            let a = image::open(a).expect("failed to open first image");
            let b = image::open(b).expect("failed to open second image");
            let (alignment, drawing) = pipeline
                .align_and_draw(&a, &b)
                .unwrap_or_else(|e| fail(e));
            match &alignment.transform {
                Some(transform) => info!(
                    "{} matches, {} inliers, homography {}",
                    alignment.matches.len(),
                    transform.inliers.len(),
                    *transform.homography
                ),
                None => warn!("{} matches and no transform", alignment.matches.len()),
            }
            write_image(drawing, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse() {
        assert_eq!(parse_point("12,4.5"), Ok(Point2::new(12.0, 4.5)));
        assert_eq!(parse_point(" 1 , 2 "), Ok(Point2::new(1.0, 2.0)));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn detectors_parse() {
        assert_eq!(parse_detector("ORB"), Ok(DetectorKind::Orb));
        assert_eq!(parse_detector("akaze"), Ok(DetectorKind::Akaze));
        assert!(parse_detector("sift").is_err());
    }

    #[test]
    fn calibration_file_layout() {
        let raw: CalibrationFile = serde_json::from_str(
            r#"{
                "ret": 0.4,
                "mtx": [[900.0, 0.0, 320.0], [0.0, 900.0, 240.0], [0.0, 0.0, 1.0]],
                "dist": [[0.1, -0.05, 0.0, 0.0, 0.01]],
                "rvecs": [[0.0, 0.1, 0.0], [0.1, 0.0, 0.0]],
                "tvecs": [[1.0, 2.0, 10.0], [0.0, 1.0, 12.0]],
                "total_error": 0.05
            }"#,
        )
        .unwrap();
        let calibration = CalibrationModel::from_rows(
            raw.ret,
            &raw.mtx,
            &raw.dist,
            &raw.rvecs,
            &raw.tvecs,
            raw.total_error,
        )
        .unwrap();
        assert_eq!(calibration.view_count(), 2);
        assert_eq!(calibration.focal_lengths(), (900.0, 900.0));
    }

    #[test]
    fn partial_config() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"detector": "akaze", "block_matching": {"max_disparity": 32}}"#,
        )
        .unwrap();
        assert_eq!(config.detector, DetectorKind::Akaze);
        assert_eq!(config.block_matching.max_disparity, 32);
        assert_eq!(config.block_matching.window_size, 9);
    }
}
