use std::collections::HashMap;
use std::num::NonZeroU64;

use parking_lot::Mutex;

use crate::scene::{Family, FamilySet};
use crate::vertex::{DotInstance, LinVertex, TriVertex};

use super::uniforms::{FRAGMENT_UNIFORM_SIZE, VERTEX_UNIFORM_SIZE};

/// Identity of a built pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineKey {
    pub family: Family,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// Process-wide cache of family pipelines, shared by every driver.
///
/// Each key is built at most once. A family whose shader fails to compile, or
/// whose pipeline the device rejects for a target, is remembered as absent
/// and never retried.
pub struct PipelineCache {
    device: wgpu::Device,
    depth_format: wgpu::TextureFormat,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    shaders: Mutex<HashMap<Family, Option<wgpu::ShaderModule>>>,
    pipelines: Mutex<HashMap<PipelineKey, Option<wgpu::RenderPipeline>>>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, depth_format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tetra uniform bgl"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX, VERTEX_UNIFORM_SIZE),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT, FRAGMENT_UNIFORM_SIZE),
            ],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tetra texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            device: device.clone(),
            depth_format,
            uniform_layout,
            texture_layout,
            shaders: Mutex::new(HashMap::new()),
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    /// Group 0: per-draw vertex and fragment uniforms (dynamic offsets).
    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    /// Group 1 of the triangle pipeline: texture and sampler.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Pipeline for `key`, building it on first request.
    pub fn get(&self, key: PipelineKey) -> Option<wgpu::RenderPipeline> {
        if let Some(cached) = self.pipelines.lock().get(&key) {
            return cached.clone();
        }

        let built = self
            .shader(key.family)
            .and_then(|module| self.build(key, &module));

        self.pipelines
            .lock()
            .entry(key)
            .or_insert(built)
            .clone()
    }

    /// Families usable when rendering into `format` at `sample_count`.
    pub fn available(&self, format: wgpu::TextureFormat, sample_count: u32) -> FamilySet {
        Family::DRAW_ORDER
            .into_iter()
            .filter(|&family| {
                self.get(PipelineKey {
                    family,
                    format,
                    sample_count,
                })
                .is_some()
            })
            .collect()
    }

    fn shader(&self, family: Family) -> Option<wgpu::ShaderModule> {
        let mut shaders = self.shaders.lock();
        shaders
            .entry(family)
            .or_insert_with(|| compile(&self.device, family))
            .clone()
    }

    /// `None` when the device rejects the pipeline for this target.
    fn build(&self, key: PipelineKey, module: &wgpu::ShaderModule) -> Option<wgpu::RenderPipeline> {
        let PipelineKey {
            family,
            format,
            sample_count,
        } = key;

        let label = format!("tetra {family} pipeline");
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let tri_layouts = [&self.uniform_layout, &self.texture_layout];
        let bind_group_layouts: &[&wgpu::BindGroupLayout] = match family {
            Family::Tri => &tri_layouts,
            Family::Lin | Family::Dot => &tri_layouts[..1],
        };

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&label),
                bind_group_layouts,
                immediate_size: 0,
            });

        let buffers = match family {
            Family::Tri => [TriVertex::layout()],
            Family::Lin => [LinVertex::layout()],
            Family::Dot => [DotInstance::layout()],
        };

        // Strokes and dots are extruded in screen space and may flip winding.
        let cull_mode = match family {
            Family::Tri => Some(wgpu::Face::Back),
            Family::Lin | Family::Dot => None,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: self.depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview_mask: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(scope.pop()) {
            log::error!("{family} pipeline rejected for {format:?} x{sample_count}: {err}");
            return None;
        }

        log::info!("built {family} pipeline for {format:?} x{sample_count}");
        Some(pipeline)
    }
}

/// Straight (non-premultiplied) alpha over.
fn alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

fn source(family: Family) -> &'static str {
    match family {
        Family::Tri => include_str!("shaders/tri.wgsl"),
        Family::Lin => include_str!("shaders/lin.wgsl"),
        Family::Dot => include_str!("shaders/dot.wgsl"),
    }
}

/// Compiles the shader for `family`; `None` if the compiler reported errors.
fn compile(device: &wgpu::Device, family: Family) -> Option<wgpu::ShaderModule> {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(family.name()),
        source: wgpu::ShaderSource::Wgsl(source(family).into()),
    });

    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<&str> = info
        .messages
        .iter()
        .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
        .map(|m| m.message.as_str())
        .collect();

    if errors.is_empty() {
        Some(module)
    } else {
        log::error!("{family} shader failed to compile: {}", errors.join("; "));
        None
    }
}
