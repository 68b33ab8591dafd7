// src/engine_lib/mod.rs

pub mod camera;
pub mod controller;
pub mod edges;
pub mod light;
pub mod visibility;
