//! Small feed-forward network toolkit
//!
//! Contains:
//! - Dense and dropout layers
//! - A `Sequential` network with a builder
//! - Mean squared error and binary cross-entropy losses
//! - The Adam optimizer and the shared mini-batch training loop
//!
//! All weight and activation buffers are `ndarray` arrays owned by the
//! network or by the call that computed them; nothing outlives the call
//! except the network's own parameters.

pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod trainer;

pub use layers::{Activation, Dense, Dropout, Layer};
pub use loss::Loss;
pub use network::{Sequential, SequentialBuilder};
pub use optimizer::Adam;
pub use trainer::fit;
