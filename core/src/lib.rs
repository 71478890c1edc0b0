//! Core types shared by the acceleration structure builders.

#[macro_use]
extern crate hexf;
#[macro_use]
extern crate log;

pub mod app;
pub mod compute;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod light;
pub mod mesh;
pub mod pbrt;
pub mod rng;
pub mod stats;
