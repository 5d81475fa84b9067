use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::gpu::WgpuAllocator;
use crate::scene::Family;
use crate::vertex::{FanCache, LineIndexCache, LINE_INDICES, fan_index_count};

use super::ctx::{RenderCtx, RenderTarget};
use super::pipeline::{PipelineCache, PipelineKey};
use super::plan::{DrawCall, FramePlan};
use super::uniforms::{FRAGMENT_UNIFORM_SIZE, VERTEX_UNIFORM_SIZE};

/// Records a [`FramePlan`] into a single render pass.
///
/// Per-draw uniforms live in one arena buffer, two aligned slots per draw
/// (vertex then fragment), bound through dynamic offsets. Each driver owns
/// its own encoder; pipelines are shared.
pub struct FrameEncoder {
    pipelines: Arc<PipelineCache>,
    sampler: wgpu::Sampler,
    stride: u64,

    uniform_buffer: Option<wgpu::Buffer>,
    uniform_capacity: u64,
    uniform_bind_group: Option<wgpu::BindGroup>,
    scratch: Vec<u8>,

    fans: FanCache,
    fan_ibo: Option<(u64, wgpu::Buffer)>,
    lines: LineIndexCache,
    line_ibo: Option<(u64, wgpu::Buffer)>,
}

impl FrameEncoder {
    pub fn new(device: &wgpu::Device, pipelines: Arc<PipelineCache>) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tetra mesh sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment.max(1));

        Self {
            pipelines,
            sampler,
            stride: uniform_stride(align),
            uniform_buffer: None,
            uniform_capacity: 0,
            uniform_bind_group: None,
            scratch: Vec::new(),
            fans: FanCache::new(),
            fan_ibo: None,
            lines: LineIndexCache::new(),
            line_ibo: None,
        }
    }

    pub fn pipelines(&self) -> &Arc<PipelineCache> {
        &self.pipelines
    }

    /// Clears the targets to `plan.clear` and draws every call in order.
    ///
    /// Draws whose pipeline could not be built are skipped.
    pub fn encode(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        plan: &FramePlan<WgpuAllocator>,
    ) {
        self.write_uniforms(ctx, plan);
        self.sync_index_buffers(ctx, plan);

        let pipeline = |family| {
            self.pipelines.get(PipelineKey {
                family,
                format: ctx.format,
                sample_count: ctx.sample_count,
            })
        };
        let tri = pipeline(Family::Tri);
        let lin = pipeline(Family::Lin);
        let dot = pipeline(Family::Dot);

        // Bind groups must outlive the pass.
        let texture_groups: Vec<Option<wgpu::BindGroup>> = plan
            .draws
            .iter()
            .map(|draw| match draw {
                DrawCall::Tri { texture, .. } => Some(self.texture_bind_group(ctx, &texture.view)),
                _ => None,
            })
            .collect();

        let [r, g, b, a] = plan.clear.map(f64::from);
        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tetra frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: target.resolve_view,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some(uniforms) = self.uniform_bind_group.as_ref() else {
            return;
        };

        for (i, draw) in plan.draws.iter().enumerate() {
            let offsets = self.offsets(i);

            match draw {
                DrawCall::Tri {
                    buffer, vertices, ..
                } => {
                    let (Some(pipeline), Some(textures)) = (&tri, &texture_groups[i]) else {
                        continue;
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, uniforms, &offsets);
                    pass.set_bind_group(1, textures, &[]);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..*vertices, 0..1);
                }
                DrawCall::Lin {
                    buffer, segments, ..
                } => {
                    let (Some(pipeline), Some((_, ibo))) = (&lin, &self.line_ibo) else {
                        continue;
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, uniforms, &offsets);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..segments * LINE_INDICES.len() as u32, 0, 0..1);
                }
                DrawCall::Dot {
                    buffer,
                    instances,
                    fan_vertices,
                    ..
                } => {
                    let (Some(pipeline), Some((_, ibo))) = (&dot, &self.fan_ibo) else {
                        continue;
                    };
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, uniforms, &offsets);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..fan_index_count(*fan_vertices), 0, 0..*instances);
                }
            }
        }
    }

    fn offsets(&self, draw: usize) -> [u32; 2] {
        let vertex = 2 * draw as u64 * self.stride;
        [vertex as u32, (vertex + self.stride) as u32]
    }

    fn write_uniforms(&mut self, ctx: &RenderCtx<'_>, plan: &FramePlan<WgpuAllocator>) {
        let stride = self.stride as usize;
        let slots = (2 * plan.len()).max(2);

        self.scratch.clear();
        self.scratch.resize(slots * stride, 0);

        for (i, draw) in plan.draws.iter().enumerate() {
            let vertex: &[u8] = match draw {
                DrawCall::Tri { uniform, .. } => bytemuck::bytes_of(uniform),
                DrawCall::Lin { uniform, .. } => bytemuck::bytes_of(uniform),
                DrawCall::Dot { uniform, .. } => bytemuck::bytes_of(uniform),
            };
            let fragment = bytemuck::bytes_of(draw.fragment());

            let at = 2 * i * stride;
            self.scratch[at..at + vertex.len()].copy_from_slice(vertex);
            self.scratch[at + stride..at + stride + fragment.len()].copy_from_slice(fragment);
        }

        self.ensure_uniform_capacity(ctx, self.scratch.len() as u64);
        if let Some(ubo) = self.uniform_buffer.as_ref() {
            ctx.queue.write_buffer(ubo, 0, &self.scratch);
        }
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: u64) {
        if required <= self.uniform_capacity && self.uniform_buffer.is_some() {
            return;
        }

        let capacity = required.next_power_of_two().max(self.stride * 32);
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tetra uniform arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tetra uniform bind group"),
            layout: self.pipelines.uniform_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &ubo,
                        offset: 0,
                        size: NonZeroU64::new(VERTEX_UNIFORM_SIZE),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &ubo,
                        offset: 0,
                        size: NonZeroU64::new(FRAGMENT_UNIFORM_SIZE),
                    }),
                },
            ],
        });

        log::trace!("uniform arena grown to {capacity} bytes");
        self.uniform_buffer = Some(ubo);
        self.uniform_capacity = capacity;
        self.uniform_bind_group = Some(bind_group);
    }

    fn sync_index_buffers(&mut self, ctx: &RenderCtx<'_>, plan: &FramePlan<WgpuAllocator>) {
        let fan_vertices = plan.max_fan_vertices();
        if fan_vertices > 0 {
            self.fans.ensure(fan_vertices);
            if self.fan_ibo.as_ref().map(|(g, _)| *g) != Some(self.fans.generation()) {
                let ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tetra dot fan ibo"),
                    contents: bytemuck::cast_slice(self.fans.indices()),
                    usage: wgpu::BufferUsages::INDEX,
                });
                self.fan_ibo = Some((self.fans.generation(), ibo));
            }
        }

        let segments = plan.max_line_segments();
        if segments > 0 {
            self.lines.ensure(segments);
            if self.line_ibo.as_ref().map(|(g, _)| *g) != Some(self.lines.generation()) {
                let ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tetra line ibo"),
                    contents: bytemuck::cast_slice(self.lines.indices()),
                    usage: wgpu::BufferUsages::INDEX,
                });
                self.line_ibo = Some((self.lines.generation(), ibo));
            }
        }
    }

    fn texture_bind_group(&self, ctx: &RenderCtx<'_>, view: &wgpu::TextureView) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tetra mesh texture bind group"),
            layout: self.pipelines.texture_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

/// Distance between uniform slots: the larger block rounded up to the
/// device's dynamic-offset alignment.
fn uniform_stride(align: u64) -> u64 {
    VERTEX_UNIFORM_SIZE.max(FRAGMENT_UNIFORM_SIZE).div_ceil(align) * align
}
