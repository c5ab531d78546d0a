// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

// GPU-accelerated implementation of the per-dimension kernel evaluation
// This module is only included when the `gpu_support` feature flag is enabled

use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use futures_intrusive::channel::shared::oneshot_channel;
use ndarray::Array1;
use pollster::block_on;
use wgpu::util::DeviceExt;

use super::cpu::HostCenters;
use super::{ComputeBackend, ResidentCenters};
use crate::dataset::{ColumnData, DataType};
use crate::error::{Error, Result};

const WORKGROUP_SIZE: u32 = 256;
const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;

// Uniform parameters of one dispatch, laid out to match `Params` in the shader
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuParams {
    center_count: u32,
    query_count: u32,
    two_h2: f32,
    log_norm: f32,
}

/// Device, queue and the compiled log-density pipeline.
struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    adapter_name: String,
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext").field("adapter", &self.adapter_name).finish()
    }
}

/// Evaluates kernels with a wgpu compute shader.
///
/// The device and pipeline are created once in [`GpuBackend::new`] and shared by
/// every upload. WGSL has no portable 64-bit float, so `Float64` centers are kept
/// in host memory and evaluated by the CPU implementation, as are 32-bit
/// centers too large for one storage binding. Query batches over that limit are
/// split across several dispatches.
#[derive(Debug, Clone)]
pub struct GpuBackend {
    context: Arc<GpuContext>,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GpuBackend {
    /// Request an adapter and device and compile the shader.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Backend(format!("failed to find an appropriate adapter: {e}")))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Product KDE Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| Error::Backend(format!("failed to create device: {e}")))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Log Density Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("log_density.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Log Density Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Log Density Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Log Density Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        tracing::debug!(adapter = %adapter_name, "initialised GPU backend");

        Ok(Self {
            context: Arc::new(GpuContext {
                device,
                queue,
                bind_group_layout,
                pipeline,
                adapter_name,
            }),
        })
    }

    /// Name of the adapter the device was created on.
    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }

    fn max_elements(&self) -> usize {
        max_binding_elements(&self.context.device.limits())
    }
}

/// Largest number of `f32` values one storage binding may hold under `limits`.
pub fn max_binding_elements(limits: &wgpu::Limits) -> usize {
    let bytes = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    (bytes / std::mem::size_of::<f32>() as u64) as usize
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn upload(&self, centers: &ColumnData) -> Result<Box<dyn ResidentCenters>> {
        match centers {
            ColumnData::Float32(values) if values.len() > self.max_elements() => {
                tracing::warn!(
                    centers = values.len(),
                    limit = self.max_elements(),
                    "centers exceed the storage binding limit, evaluating on the host"
                );
                Ok(Box::new(HostCenters { centers: values.to_vec() }))
            }
            ColumnData::Float32(values) => {
                // Zero-sized storage bindings are invalid; keep one padding element.
                let mut host: Vec<f32> = values.to_vec();
                let len = host.len();
                if host.is_empty() {
                    host.push(0.0);
                }
                let buffer = self.context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Kernel Centers Buffer"),
                    contents: bytemuck::cast_slice(&host),
                    usage: wgpu::BufferUsages::STORAGE,
                });
                Ok(Box::new(DeviceCenters {
                    context: Arc::clone(&self.context),
                    buffer,
                    len,
                }))
            }
            ColumnData::Float64(values) => {
                tracing::debug!(centers = values.len(), "float64 centers stay on the host");
                Ok(Box::new(HostCenters { centers: values.to_vec() }))
            }
        }
    }
}

/// 32-bit kernel centers in a device storage buffer.
///
/// The buffer is destroyed when the handle is dropped.
struct DeviceCenters {
    context: Arc<GpuContext>,
    buffer: wgpu::Buffer,
    len: usize,
}

impl fmt::Debug for DeviceCenters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCenters").field("len", &self.len).finish()
    }
}

impl Drop for DeviceCenters {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

impl ResidentCenters for DeviceCenters {
    fn len(&self) -> usize {
        self.len
    }

    fn data_type(&self) -> DataType {
        DataType::Float32
    }

    fn log_density(&self, queries: &ColumnData, bandwidth: f64) -> Result<Array1<f64>> {
        let ColumnData::Float32(queries) = queries else {
            return Err(Error::DataTypeMismatch {
                expected: DataType::Float32,
                found: queries.data_type(),
            });
        };
        if queries.is_empty() {
            return Ok(Array1::zeros(0));
        }
        let bandwidth = bandwidth as f32;
        if self.len == 0 || !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Ok(Array1::from_elem(queries.len(), f64::NAN));
        }

        let nan_rows: Vec<bool> = queries.iter().map(|x| x.is_nan()).collect();
        let host_queries: Vec<f32> = queries.iter().map(|&x| if x.is_nan() { 0.0 } else { x }).collect();

        // Query and output buffers share the binding limit; split large batches.
        let chunk_len = max_binding_elements(&self.context.device.limits()).max(1);
        let mut raw = Vec::with_capacity(host_queries.len());
        for chunk in host_queries.chunks(chunk_len) {
            raw.extend(self.dispatch(chunk, bandwidth)?);
        }

        Ok(raw
            .into_iter()
            .zip(nan_rows)
            .map(|(v, is_nan)| if is_nan { f64::NAN } else { f64::from(v) })
            .collect())
    }
}

impl DeviceCenters {
    /// Run the shader over `queries` and read the results back, blocking until done.
    fn dispatch(&self, queries: &[f32], bandwidth: f32) -> Result<Vec<f32>> {
        let ctx = &self.context;
        let device = &ctx.device;
        let query_count = queries.len();
        let output_size = (query_count * std::mem::size_of::<f32>()) as u64;

        let params = GpuParams {
            center_count: self.len as u32,
            query_count: query_count as u32,
            two_h2: 2.0 * bandwidth * bandwidth,
            log_norm: (self.len as f64).ln() as f32
                + ((2.0 * std::f32::consts::PI).sqrt() * bandwidth).ln(),
        };

        let queries_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Queries Buffer"),
            contents: bytemuck::cast_slice(queries),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Log Density Bind Group"),
            layout: &ctx.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: queries_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Log Density Command Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Log Density Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&ctx.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);

            // Spill into the y dimension when x would exceed the per-dimension limit.
            let groups = (query_count as u32).div_ceil(WORKGROUP_SIZE);
            let groups_x = groups.min(MAX_WORKGROUPS_PER_DIM);
            let groups_y = groups.div_ceil(groups_x);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = sender.send(v);
        });

        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| Error::Backend(format!("failed to poll device: {e}")))?;

        match block_on(receiver.receive()) {
            Some(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
                drop(data);
                staging_buffer.unmap();

                queries_buffer.destroy();
                params_buffer.destroy();
                output_buffer.destroy();
                staging_buffer.destroy();

                tracing::debug!(queries = query_count, centers = self.len, "GPU log-density dispatch");
                Ok(result)
            }
            Some(Err(e)) => Err(Error::Backend(format!("failed to map output buffer: {e}"))),
            None => Err(Error::Backend("failed to read back results from GPU".to_string())),
        }
    }
}
