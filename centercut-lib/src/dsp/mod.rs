//! Signal processing: the Hartley kernel, the center separator and helpers.

pub mod center_cut;
pub mod fht;
pub mod output_queue;
pub mod pcm;
pub mod spectrum;
pub mod utility;
