//! # Doodle core
//!
//! Storage and simulation core for chunked, palette-indexed drawings: levels and doodads.
//! Drawings are unbounded canvases split into square chunks, stored in zip archives (or
//! legacy gzip / plain json), edited through undoable strokes, and simulated with swept
//! geometry collision and a scriptable actor collision broker.

pub mod actor;
pub mod archive;
pub mod broker;
pub mod chunk;
pub mod chunker;
pub mod collision;
pub mod color;
pub mod doodad;
pub mod drawing;
pub mod edit;
pub mod environment;
pub mod error;
pub mod geom;
pub mod id;
pub mod io;
pub mod level;
pub mod page;
pub mod palette;
pub mod render;
pub mod screenshot;
pub mod script;
pub mod settings;
pub mod simulation;
pub mod stroke;
pub mod viewport;
pub mod wallpaper;

pub use color::Color;
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
pub use geom::{Point, Rect};
pub use settings::Settings;
