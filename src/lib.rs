// src/lib.rs

pub mod config;
pub mod effective_field;
pub mod engine;
pub mod error;
pub mod fft;
pub mod llg;
pub mod material;
pub mod mesh;
pub mod params;
pub mod quantity;
pub mod regions;
pub mod registry;
pub mod table;
pub mod vec3;
pub mod vector_field;

pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, ErrorKind, Result};
pub use quantity::QuantityId;
