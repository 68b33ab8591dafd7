// src/rendering_lib/vertex.rs

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 8-bit RGBA, uploaded as a normalized attribute.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [u8; 4],
    /// Only sampled by the texture and light programs.
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 2], color: Color) -> Self {
        Self { position, color: color.to_array(), uv: [0.0, 0.0] }
    }

    pub fn textured(position: [f32; 2], color: Color, uv: [f32; 2]) -> Self {
        Self { position, color: color.to_array(), uv }
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.uv.iter()).all(|v| v.is_finite())
    }
}

/// Named per-vertex attributes a program can consume. Order of declaration
/// in a program decides the shader location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Color,
    Uv,
}

impl VertexAttribute {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vertexPosition" => Some(VertexAttribute::Position),
            "vertexColor" => Some(VertexAttribute::Color),
            "vertexUV" => Some(VertexAttribute::Uv),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "vertexPosition",
            VertexAttribute::Color => "vertexColor",
            VertexAttribute::Uv => "vertexUV",
        }
    }

    pub fn offset(self) -> wgpu::BufferAddress {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Color => std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            VertexAttribute::Uv => {
                (std::mem::size_of::<[f32; 2]>() + std::mem::size_of::<[u8; 4]>()) as wgpu::BufferAddress
            }
        }
    }

    pub fn format(self) -> wgpu::VertexFormat {
        match self {
            VertexAttribute::Position => wgpu::VertexFormat::Float32x2,
            VertexAttribute::Color => wgpu::VertexFormat::Unorm8x4,
            VertexAttribute::Uv => wgpu::VertexFormat::Float32x2,
        }
    }
}

impl Vertex {
    /// Layout exposing `attributes` at shader locations `0..attributes.len()`.
    pub fn attributes_desc(attributes: &[VertexAttribute]) -> Vec<wgpu::VertexAttribute> {
        attributes
            .iter()
            .enumerate()
            .map(|(location, attribute)| wgpu::VertexAttribute {
                offset: attribute.offset(),
                shader_location: location as u32,
                format: attribute.format(),
            })
            .collect()
    }

    pub fn desc(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}
