// Face tracking with persistent identities and incremental recognition.
//
// Faces found by an external detector are followed frame to frame with
// optical flow, bound to long-lived identities kept in a registry, and learned
// by a shared recognizer once enough aligned exemplars have been collected for
// a name.

mod all;
mod aligner;
mod detector;
mod eigenfaces;
mod error;
mod feature_tracker;
mod frame;
mod identity;
mod image;
mod imgproc;
mod model;
mod optical_flow;
mod parameters;
mod pyramid;
mod recognizer;
mod registry;
mod training_set;
mod types;
mod util;
mod visualize;

#[cfg(test)]
mod testing;

#[macro_use] extern crate lazy_static;

pub use crate::{
  aligner::*,
  detector::*,
  eigenfaces::*,
  error::*,
  feature_tracker::*,
  frame::*,
  identity::*,
  image::*,
  model::*,
  optical_flow::*,
  parameters::*,
  recognizer::*,
  registry::*,
  training_set::*,
  types::*,
  util::{format_log, init_logging},
  visualize::*,
};
