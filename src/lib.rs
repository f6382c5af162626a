//! Headless driver for the glide engine: load a scene, replay its script and
//! report the styles the engine wrote.

pub mod scene;
pub mod simulator;

pub use scene::{Scene, Step, Target};
pub use simulator::Simulator;
