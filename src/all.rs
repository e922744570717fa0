// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  aligner::*,
  detector::*,
  eigenfaces::*,
  error::*,
  feature_tracker::*,
  frame::*,
  identity::*,
  image::*,
  imgproc::*,
  model::*,
  optical_flow::*,
  parameters::*,
  pyramid::*,
  recognizer::*,
  registry::*,
  training_set::*,
  types::*,
  util::*,
  visualize::*,
};

pub use {
  std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    sync::{Arc, Mutex, RwLock},
  },
  log::{debug, error, info, warn, LevelFilter},
  nalgebra::{dmatrix, DMatrix, DVector},
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
};
