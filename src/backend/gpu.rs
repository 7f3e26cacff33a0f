//! GPU tier: compute-shader execution of the position-dependent algorithm
//! families.
//!
//! Only algorithms with no sequential data dependency run here — ordered,
//! halftone and pattern, each of which is a pure per-pixel function of the
//! source and a threshold tile. Error diffusion is inherently sequential
//! and never routes to this tier.
//!
//! The adapter/device pair is probed once per backend; shader modules,
//! pipelines and buffers are created and dropped per invocation, so a
//! failed chunk leaves no GPU state behind.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use dither_core::{matrix, Algorithm, ColorMode};
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::error::BackendError;

use super::{ChunkBackend, ChunkInput, Tier};

/// Shader for the threshold-matrix family (ordered and pattern).
///
/// `mode` 0 applies the ordered half-step bias around the fixed threshold;
/// `mode` 1 compares directly against the tile value, matching the scalar
/// implementations byte for byte.
const MATRIX_SHADER: &str = r#"
struct Params {
    width: u32,
    height: u32,
    matrix_size: u32,
    dot_size: u32,
    threshold: f32,
    cells: f32,
    mode: u32,
    _pad: u32,
};

@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read> tile: array<f32>;
@group(0) @binding(2) var<storage, read_write> dst: array<u32>;
@group(0) @binding(3) var<uniform> params: Params;

fn gray_at(idx: u32) -> f32 {
    let word = src[idx / 4u];
    return f32((word >> ((idx % 4u) * 8u)) & 0xffu);
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let idx = gid.y * params.width + gid.x;
    let gray = gray_at(idx);

    let mx = (gid.x / params.dot_size) % params.matrix_size;
    let my = (gid.y / params.dot_size) % params.matrix_size;
    let tile_value = tile[my * params.matrix_size + mx];

    var white = false;
    if (params.mode == 0u) {
        let rank = tile_value * (params.cells - 1.0);
        let bias = ((rank + 0.5) / params.cells - 0.5) * 255.0;
        white = gray >= params.threshold + bias;
    } else {
        white = gray >= tile_value * 255.0;
    }

    var v = 0u;
    if (white) {
        v = 255u;
    }
    dst[idx] = v | (v << 8u) | (v << 16u) | (255u << 24u);
}
"#;

/// Shader for halftone: rotated grid, dot radius proportional to the
/// darkness sampled at the cell center.
const HALFTONE_SHADER: &str = r#"
struct Params {
    width: u32,
    height: u32,
    cell: u32,
    _pad0: u32,
    dot_size: f32,
    angle_rad: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> params: Params;

fn gray_at(idx: u32) -> f32 {
    let word = src[idx / 4u];
    return f32((word >> ((idx % 4u) * 8u)) & 0xffu);
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) {
        return;
    }
    let idx = gid.y * params.width + gid.x;

    let cell = f32(params.cell);
    let c = cos(params.angle_rad);
    let s = sin(params.angle_rad);

    let xf = f32(gid.x);
    let yf = f32(gid.y);
    let u = xf * c + yf * s;
    let v = -xf * s + yf * c;

    let cu = floor(u / cell) * cell + cell / 2.0;
    let cv = floor(v / cell) * cell + cell / 2.0;

    let cx = cu * c - cv * s;
    let cy = cu * s + cv * c;
    let sx = u32(clamp(round(cx), 0.0, f32(params.width - 1u)));
    let sy = u32(clamp(round(cy), 0.0, f32(params.height - 1u)));

    let darkness = 1.0 - gray_at(sy * params.width + sx) / 255.0;
    let radius = params.dot_size * 0.5 * darkness;

    let du = u - cu;
    let dv = v - cv;
    var px = 255u;
    if (du * du + dv * dv <= radius * radius) {
        px = 0u;
    }
    dst[idx] = px | (px << 8u) | (px << 16u) | (255u << 24u);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MatrixParams {
    width: u32,
    height: u32,
    matrix_size: u32,
    dot_size: u32,
    threshold: f32,
    cells: f32,
    mode: u32,
    _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct HalftoneParams {
    width: u32,
    height: u32,
    cell: u32,
    _pad0: u32,
    dot_size: f32,
    angle_rad: f32,
    _pad1: f32,
    _pad2: f32,
}

/// The GPU execution tier.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_texture_dim: u32,
}

impl GpuBackend {
    /// Request an adapter and device. Absence of a usable adapter is a
    /// routing signal (`GpuUnavailable`), never surfaced to job callers.
    pub fn probe() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(
            instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
        )
        .ok_or_else(|| BackendError::GpuUnavailable("no suitable adapter".into()))?;

        let max_texture_dim = adapter.limits().max_texture_dimension_2d;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ditherlab-gpu"),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| BackendError::GpuUnavailable(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            max_texture_dim,
        })
    }

    /// Largest chunk dimension this device accepts.
    pub fn max_texture_dim(&self) -> u32 {
        self.max_texture_dim
    }

    fn run_matrix_shader(
        &self,
        gray: &[u8],
        width: usize,
        height: usize,
        tile_values: &[f32],
        matrix_size: u32,
        dot_size: u32,
        threshold: u8,
        mode: u32,
    ) -> Result<Vec<u8>, BackendError> {
        let params = MatrixParams {
            width: width as u32,
            height: height as u32,
            matrix_size,
            dot_size: dot_size.max(1),
            threshold: f32::from(threshold),
            cells: (matrix_size * matrix_size) as f32,
            mode,
            _pad: 0,
        };
        self.dispatch(
            MATRIX_SHADER,
            gray,
            width,
            height,
            Some(tile_values),
            bytemuck::bytes_of(&params),
        )
    }

    fn run_halftone_shader(
        &self,
        gray: &[u8],
        width: usize,
        height: usize,
        dot_size: u32,
        spacing: u32,
        angle: f32,
    ) -> Result<Vec<u8>, BackendError> {
        let params = HalftoneParams {
            width: width as u32,
            height: height as u32,
            cell: (dot_size + spacing).max(1),
            _pad0: 0,
            dot_size: dot_size as f32,
            angle_rad: angle.to_radians(),
            _pad1: 0.0,
            _pad2: 0.0,
        };
        self.dispatch(
            HALFTONE_SHADER,
            gray,
            width,
            height,
            None,
            bytemuck::bytes_of(&params),
        )
    }

    /// Upload, dispatch and read back one chunk. All resources created
    /// here drop at the end of the call.
    fn dispatch(
        &self,
        shader_source: &str,
        gray: &[u8],
        width: usize,
        height: usize,
        tile_values: Option<&[f32]>,
        params_bytes: &[u8],
    ) -> Result<Vec<u8>, BackendError> {
        let pixel_count = width * height;
        if pixel_count == 0 {
            return Ok(Vec::new());
        }

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("dither shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("dither pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

        // Gray bytes packed into u32 words, padded to a word boundary
        let mut packed = gray.to_vec();
        packed.resize(packed.len().div_ceil(4) * 4, 0);
        let input_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("gray input"),
                contents: &packed,
                usage: wgpu::BufferUsages::STORAGE,
            });

        let tile_buffer = tile_values.map(|values| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("threshold tile"),
                    contents: bytemuck::cast_slice(values),
                    usage: wgpu::BufferUsages::STORAGE,
                })
        });

        let output_size = (pixel_count * 4) as u64;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rgba output"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: params_bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: input_buffer.as_entire_binding(),
        }];
        let mut binding = 1;
        if let Some(tile) = &tile_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: tile.as_entire_binding(),
            });
            binding += 1;
        }
        entries.push(wgpu::BindGroupEntry {
            binding,
            resource: output_buffer.as_entire_binding(),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: binding + 1,
            resource: params_buffer.as_entire_binding(),
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dither bind group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dither encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("dither pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                (width as u32).div_ceil(8),
                (height as u32).div_ceil(8),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging, 0, output_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| BackendError::Gpu("map callback dropped".into()))?
            .map_err(|e| BackendError::Gpu(e.to_string()))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();

        debug!(width, height, "gpu chunk complete");
        Ok(data)
    }
}

impl ChunkBackend for GpuBackend {
    fn tier(&self) -> Tier {
        Tier::Gpu
    }

    fn supports(&self, algorithm: &Algorithm, color_mode: &ColorMode) -> bool {
        color_mode.is_monochrome()
            && matches!(
                algorithm,
                Algorithm::Ordered { .. } | Algorithm::Halftone { .. } | Algorithm::Pattern { .. }
            )
    }

    fn process_chunk(&self, input: &ChunkInput<'_>) -> Result<Vec<u8>, BackendError> {
        match input.options.algorithm {
            Algorithm::Ordered {
                dot_size,
                threshold,
            } => {
                let tile = matrix::bayer_matrix(4);
                self.run_matrix_shader(
                    input.gray,
                    input.width,
                    input.height,
                    tile.values(),
                    tile.size() as u32,
                    dot_size,
                    threshold,
                    0,
                )
            }
            Algorithm::Pattern { kind, size } => {
                let tile = matrix::pattern_matrix(kind, size.max(1) as usize);
                self.run_matrix_shader(
                    input.gray,
                    input.width,
                    input.height,
                    tile.values(),
                    tile.size() as u32,
                    1,
                    0,
                    1,
                )
            }
            Algorithm::Halftone {
                dot_size,
                spacing,
                angle,
            } => self.run_halftone_shader(
                input.gray,
                input.width,
                input.height,
                dot_size,
                spacing,
                angle,
            ),
            _ => Err(BackendError::Unsupported),
        }
    }
}
