//! Per-tick data frame and the views nodes read it through.

mod data_frame;
mod inputs;

pub use data_frame::{DataFrame, PIPELINE_END_KEY};
pub use inputs::NodeInputs;
