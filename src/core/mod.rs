pub mod config;
pub mod error;
pub mod io;
pub mod storyboard;
pub mod style;
pub mod upload;
