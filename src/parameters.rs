use crate::all::*;
use clap::Parser;
use serde::Deserialize;

lazy_static! {
  pub static ref PARAMETER_SET: Mutex<ParameterSet> = Mutex::new(ParameterSet::default());
}

// Every policy constant of the pipeline. Can be parsed from command line style
// arguments or read from a JSON file where missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq)]
#[derive(clap::Parser, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
  // Identity registry.
  #[clap(long, default_value = "50")]
  pub detection_interval: usize,
  #[clap(long, default_value = "10")]
  pub recognition_interval: usize,
  #[clap(long, default_value = "5000")]
  pub recognition_threshold: f64,

  // Feature tracking.
  #[clap(long, default_value = "10")]
  pub min_features: usize,
  #[clap(long, default_value = "4.0")]
  pub prune_factor: f64,

  // Landmark detection.
  #[clap(long, default_value = "20")]
  pub landmark_count: usize,
  #[clap(long, default_value = "3")]
  pub landmark_min_distance: usize,
  #[clap(long, default_value = "10")]
  pub fast_threshold: i16,

  // Pyramidal Lucas-Kanade feature tracker.
  #[clap(long, default_value = "3")]
  pub lk_levels: usize,
  #[clap(long, default_value = "10")]
  pub lk_iters: usize,
  #[clap(long, default_value = "7")]
  pub lk_win_size: usize,

  // Recognizer.
  #[clap(long, default_value = "70")]
  pub face_size: usize,
  #[clap(long, default_value = "20")]
  pub max_exemplars: usize,
  #[clap(long)]
  pub background_training: bool,
}

impl Default for ParameterSet {
  fn default() -> ParameterSet {
    ParameterSet::parse_from(["facetrack"])
  }
}

impl ParameterSet {
  pub fn validate(&self) -> Result<()> {
    if self.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if self.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    if self.detection_interval == 0 || self.recognition_interval == 0 {
      bail!("Detection and recognition intervals must be positive.");
    }
    if self.face_size < 8 {
      bail!("Aligned face size {} is too small.", self.face_size);
    }
    if self.max_exemplars == 0 {
      bail!("At least one exemplar per name is needed for training.");
    }
    if !(self.prune_factor > 0.) {
      bail!("Pruning factor must be positive, got {}.", self.prune_factor);
    }
    Ok(())
  }

  pub fn from_json_file(path: &Path) -> Result<ParameterSet> {
    let file = File::open(path)
      .context(format!("Failed to open parameter file {}", path.display()))?;
    let p: ParameterSet = serde_json::from_reader(BufReader::new(file))
      .context(format!("Parameter file {} is not valid JSON.", path.display()))?;
    p.validate()?;
    Ok(p)
  }
}

// Replaces the process-wide parameters used by the `new()` constructors.
pub fn set_parameters(p: ParameterSet) -> Result<()> {
  p.validate()?;
  *PARAMETER_SET.lock().unwrap() = p;
  Ok(())
}

// Snapshot of the process-wide parameters.
pub fn parameters() -> ParameterSet {
  PARAMETER_SET.lock().unwrap().clone()
}
