use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use rollcall_core::recognition::domain::enrolled_face::EnrolledFace;
use rollcall_core::recognition::domain::face_locator::{LocatorConfig, LocatorProvider};
use rollcall_core::recognition::domain::photo_encoder::PhotoEncoder;
use rollcall_core::recognition::infrastructure::seeta_locator::SeetaLocatorProvider;

/// Face-recognition attendance tracking from a live camera.
#[derive(Parser)]
#[command(name = "rollcall")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll a student from a face photo into a roster file.
    Enroll {
        /// Photo containing exactly one clear face (jpg/jpeg/png/gif).
        photo: PathBuf,

        /// Roster JSON file; created when missing.
        #[arg(long)]
        roster: PathBuf,

        /// Student identifier to enroll under.
        #[arg(long)]
        student_id: i64,

        /// Display name shown on detections.
        #[arg(long)]
        name: String,
    },

    /// Run a live detection session against an enrolled roster.
    Run {
        /// Roster JSON file written by `enroll`.
        #[arg(long)]
        roster: PathBuf,

        /// Session length in seconds.
        #[arg(long, default_value = "30")]
        duration: u64,

        /// Create attendance records for recognized students.
        #[arg(long)]
        auto_mark: bool,

        /// Camera device index.
        #[arg(long, default_value = "0")]
        camera_index: u32,

        /// Minimum correlation to label a face in the live list (0.0-1.0).
        #[arg(long, default_value = "0.3")]
        display_threshold: f64,

        /// Minimum correlation to auto-mark attendance (0.0-1.0).
        #[arg(long, default_value = "0.3")]
        mark_threshold: f64,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Enroll {
            photo,
            roster,
            student_id,
            name,
        } => enroll(&photo, &roster, student_id, &name),
        Command::Run {
            roster,
            duration,
            auto_mark,
            camera_index,
            display_threshold,
            mark_threshold,
        } => {
            validate_threshold("display-threshold", display_threshold)?;
            validate_threshold("mark-threshold", mark_threshold)?;
            run_session(
                &roster,
                duration,
                auto_mark,
                camera_index,
                display_threshold,
                mark_threshold,
            )
        }
    }
}

fn enroll(
    photo: &Path,
    roster_path: &Path,
    student_id: i64,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = SeetaLocatorProvider::resolve(
        LocatorConfig::default(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let mut encoder = PhotoEncoder::new(provider.create_locator()?);
    let encoding = encoder.encode_from_image_path(photo)?;

    let mut roster = load_roster(roster_path)?;
    if roster.iter().any(|face| face.student_id == student_id) {
        return Err(format!("student {student_id} is already enrolled").into());
    }
    roster.push(EnrolledFace::new(student_id, name, encoding));
    fs::write(roster_path, serde_json::to_vec_pretty(&roster)?)?;

    log::info!(
        "enrolled {name} ({student_id}); roster now holds {} students",
        roster.len()
    );
    Ok(())
}

fn load_roster(path: &Path) -> Result<Vec<EnrolledFace>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

fn validate_threshold(flag: &str, value: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("--{flag} must be between 0.0 and 1.0, got {value}").into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(feature = "live-camera")]
fn run_session(
    roster_path: &Path,
    duration: u64,
    auto_mark: bool,
    camera_index: u32,
    display_threshold: f64,
    mark_threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::time::{Duration, Instant};

    use rollcall_core::attendance::domain::marker::AutoMarker;
    use rollcall_core::attendance::infrastructure::memory_store::MemoryAttendanceStore;
    use rollcall_core::capture::domain::camera_device::CameraConfig;
    use rollcall_core::capture::domain::frame_source::FrameSourceConfig;
    use rollcall_core::capture::infrastructure::opencv_camera::OpencvCamera;
    use rollcall_core::pipeline::coordinator::SessionCoordinator;
    use rollcall_core::pipeline::detection_loop::DetectionConfig;
    use rollcall_core::recognition::infrastructure::seeta_locator;

    let roster = load_roster(roster_path)?;
    if roster.is_empty() {
        return Err("roster is empty; enroll students first".into());
    }

    let capability = seeta_locator::resolve_capability(
        LocatorConfig::default(),
        Some(Box::new(download_progress)),
    );
    eprintln!();

    let frame_config = FrameSourceConfig {
        camera: CameraConfig {
            index: camera_index,
            ..CameraConfig::default()
        },
        ..FrameSourceConfig::default()
    };
    let detection_config = DetectionConfig {
        display_threshold,
        ..DetectionConfig::default()
    };

    let mut coordinator = SessionCoordinator::new(
        Box::new(|| Box::new(OpencvCamera::new())),
        capability,
        frame_config,
        detection_config,
    );
    coordinator.start_camera()?;
    coordinator.start_recognition(roster)?;
    log::info!("session running for {duration}s");

    let marker = AutoMarker::new(mark_threshold);
    let mut store = MemoryAttendanceStore::new();
    let deadline = Instant::now() + Duration::from_secs(duration);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_secs(1));

        let report = coordinator.detection_report();
        if !report.is_empty() {
            println!("{}", serde_json::to_string(&report)?);
        }
        if auto_mark {
            let now = chrono::Local::now().naive_local();
            for record in marker.mark(&mut store, &coordinator.detections(), now) {
                eprintln!(
                    "marked student {} present at {}",
                    record.student_id,
                    record.time_in.format("%H:%M:%S")
                );
            }
        }
    }

    coordinator.shutdown();
    println!("{}", serde_json::to_string_pretty(&store.records())?);
    Ok(())
}

#[cfg(not(feature = "live-camera"))]
fn run_session(
    _roster_path: &Path,
    _duration: u64,
    _auto_mark: bool,
    _camera_index: u32,
    _display_threshold: f64,
    _mark_threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("this build has no camera backend; rebuild with --features live-camera".into())
}
