/// wgpu adapter: vertex layout for `GlyphVertex`, atlas texture upload and
/// a pipeline that draws a `TextBuffer` in pixel coordinates, y up.

use crate::atlas::{Depth, TextureAtlas};
use crate::text::{GlyphVertex, TextBuffer};
use std::borrow::Cow;

impl GlyphVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,  // vertex
        1 => Float32x2,  // tex_coord
        2 => Float32x4,  // color
        3 => Float32,    // ashift
        4 => Float32,    // agamma
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GlyphVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Texture format holding an atlas of `depth`. There is no three-channel
/// format, so LCD atlases are widened to RGBA on upload.
pub fn texture_format(depth: Depth) -> wgpu::TextureFormat {
    match depth {
        Depth::Alpha => wgpu::TextureFormat::R8Unorm,
        Depth::Rgb | Depth::Rgba => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Atlas bytes laid out for `texture_format`.
pub fn texel_data(atlas: &TextureAtlas) -> Cow<'_, [u8]> {
    match atlas.depth() {
        Depth::Rgb => Cow::Owned(
            atlas
                .data()
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
        ),
        _ => Cow::Borrowed(atlas.data()),
    }
}

fn texel_bytes(depth: Depth) -> u32 {
    match depth {
        Depth::Alpha => 1,
        _ => 4,
    }
}

/// GPU copy of a `TextureAtlas`, re-uploaded whenever the atlas is marked
/// modified.
pub struct AtlasTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
    depth: Depth,
}

impl AtlasTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, atlas: &mut TextureAtlas) -> Self {
        let (width, height) = (atlas.width() as u32, atlas.height() as u32);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph-atlas"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(atlas.depth()),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let tex = Self { texture, view, width, height, depth: atlas.depth() };
        tex.write(queue, atlas);
        atlas.take_modified();
        tex
    }

    fn write(&self, queue: &wgpu::Queue, atlas: &TextureAtlas) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texel_data(atlas),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * texel_bytes(self.depth)),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Upload if modified. Returns true when the texture was recreated
    /// because the atlas grew, in which case bind groups must be rebuilt.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, atlas: &mut TextureAtlas) -> bool {
        if !atlas.take_modified() {
            return false;
        }
        if (atlas.width() as u32, atlas.height() as u32) != (self.width, self.height) {
            log::debug!("recreating atlas texture at {}x{}", atlas.width(), atlas.height());
            *self = Self::new(device, queue, atlas);
            return true;
        }
        self.write(queue, atlas);
        false
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    viewport: [f32; 2],
    lcd: u32,
    _pad: u32,
}

/// Draws text buffers over one atlas.
pub struct TextPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub atlas: AtlasTexture,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    globals: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl TextPipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        atlas: &mut TextureAtlas,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let atlas_texture = AtlasTexture::new(device, queue, atlas);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("text-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("text-bind-group-layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let bind_group = Self::bind_group(device, &bind_group_layout, &atlas_texture, &sampler, &globals);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("text-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SRC.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("text-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("text-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GlyphVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = Self::buffer(device, "text-vertices", 0, wgpu::BufferUsages::VERTEX);
        let index_buffer = Self::buffer(device, "text-indices", 0, wgpu::BufferUsages::INDEX);

        Self {
            pipeline,
            atlas: atlas_texture,
            bind_group_layout,
            bind_group,
            sampler,
            globals,
            vertex_buffer,
            index_buffer,
            index_count: 0,
        }
    }

    fn bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        atlas: &AtlasTexture,
        sampler: &wgpu::Sampler,
        globals: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("text-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&atlas.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: globals.as_entire_binding() },
            ],
        })
    }

    fn buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            // Zero-sized buffers cannot be bound.
            size: size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload the atlas if needed and the buffer's geometry, for a target
    /// of `width` x `height` pixels.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        atlas: &mut TextureAtlas,
        text: &TextBuffer,
        width: f32,
        height: f32,
    ) {
        if self.atlas.update(device, queue, atlas) {
            self.bind_group =
                Self::bind_group(device, &self.bind_group_layout, &self.atlas, &self.sampler, &self.globals);
        }
        let globals = Globals {
            viewport: [width, height],
            lcd: u32::from(atlas.depth() == Depth::Rgb),
            _pad: 0,
        };
        queue.write_buffer(&self.globals, 0, bytemuck::bytes_of(&globals));

        let vertices = text.buffer().vertex_bytes();
        let indices = text.buffer().index_bytes();
        if vertices.len() as u64 > self.vertex_buffer.size() {
            self.vertex_buffer = Self::buffer(device, "text-vertices", vertices.len() as u64, wgpu::BufferUsages::VERTEX);
        }
        if indices.len() as u64 > self.index_buffer.size() {
            self.index_buffer = Self::buffer(device, "text-indices", indices.len() as u64, wgpu::BufferUsages::INDEX);
        }
        if !indices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, vertices);
            queue.write_buffer(&self.index_buffer, 0, indices);
        }
        self.index_count = text.buffer().indices().len() as u32;
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Pixel positions to clip space; coverage from the atlas, with LCD
/// atlases resampled at the subpixel `shift` and alpha raised to
/// 1 / `gamma`.
pub const SHADER_SRC: &str = r#"
struct Globals {
    viewport: vec2<f32>,
    lcd: u32,
    _pad: u32,
};

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) color: vec4<f32>,
    @location(3) shift: f32,
    @location(4) gamma: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) shift: f32,
    @location(3) gamma: f32,
};

@group(0) @binding(0) var atlas_texture: texture_2d<f32>;
@group(0) @binding(1) var atlas_sampler: sampler;
@group(0) @binding(2) var<uniform> globals: Globals;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let ndc = in.position.xy / globals.viewport * 2.0 - vec2<f32>(1.0, 1.0);
    out.clip_position = vec4<f32>(ndc, in.position.z, 1.0);
    out.tex_coord = in.tex_coord;
    out.color = in.color;
    out.shift = in.shift;
    out.gamma = in.gamma;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let current = textureSample(atlas_texture, atlas_sampler, in.tex_coord);
    let texel = 1.0 / vec2<f32>(textureDimensions(atlas_texture));
    let previous = textureSample(atlas_texture, atlas_sampler, in.tex_coord - vec2<f32>(texel.x, 0.0));
    let gamma = max(in.gamma, 0.0001);

    if (globals.lcd == 0u) {
        let a = pow(current.r, 1.0 / gamma);
        return vec4<f32>(in.color.rgb, in.color.a * a);
    }

    var r = current.r;
    var g = current.g;
    var b = current.b;
    if (in.shift <= 1.0 / 3.0) {
        let z = 3.0 * in.shift;
        r = mix(current.r, previous.b, z);
        g = mix(current.g, current.r, z);
        b = mix(current.b, current.g, z);
    } else if (in.shift <= 2.0 / 3.0) {
        let z = 3.0 * in.shift - 1.0;
        r = mix(previous.b, previous.g, z);
        g = mix(current.r, previous.b, z);
        b = mix(current.g, current.r, z);
    } else {
        let z = 3.0 * in.shift - 2.0;
        r = mix(previous.g, previous.r, z);
        g = mix(previous.b, previous.g, z);
        b = mix(current.r, previous.b, z);
    }
    let t = max(max(r, g), b);
    let base = vec4<f32>(in.color.rgb, (r + g + b) / 3.0);
    let mixed = t * base + (1.0 - t) * vec4<f32>(r, g, b, min(min(r, g), b));
    return vec4<f32>(mixed.rgb, in.color.a * pow(mixed.a, 1.0 / gamma));
}
"#;
