pub mod camera;
pub mod config;
pub mod geometry;
pub mod io;
pub mod projection;
pub mod segmentation;
pub mod system;
pub mod viz;
