use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use log::warn;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::app::App;
use crate::material::{BandedParams, GiftParams, MaterialVariant, OrnamentParams, SkyParams, SnowGroundParams};
use crate::obj::MeshData;
use crate::palette;
use crate::post::PostChain;
use crate::scene::{
    cube, ground_plane, octahedron, TreeScene, GIFT_SIZE, GROUND_SEGMENTS, GROUND_SIZE, SKY_SIZE,
    STAR_RADIUS, TREE_SCALE,
};

const BANDED_SHADER: &str = include_str!("shaders/banded.wgsl");
const ORNAMENT_SHADER: &str = include_str!("shaders/ornament.wgsl");
const GIFT_SHADER: &str = include_str!("shaders/gift.wgsl");
const SNOW_GROUND_SHADER: &str = include_str!("shaders/snow_ground.wgsl");
const SKY_SHADER: &str = include_str!("shaders/sky.wgsl");
const SNOW_POINTS_SHADER: &str = include_str!("shaders/snow_points.wgsl");
const FIREFLIES_SHADER: &str = include_str!("shaders/fireflies.wgsl");
const TEXT_SHADER: &str = include_str!("shaders/text.wgsl");
const STYLIZE_SHADER: &str = include_str!("shaders/stylize.wgsl");
const BLOOM_SHADER: &str = include_str!("shaders/bloom.wgsl");
const VIGNETTE_SHADER: &str = include_str!("shaders/vignette.wgsl");

/// Scene passes render into this before the post chain tone-maps down to the
/// sRGB surface; the ornament glow needs headroom above 1.0.
const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const SNOW_BASE_SIZE: f32 = 0.1;
const FIREFLY_BASE_SIZE: f32 = 160.0;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// GPU renderer backed by wgpu.
///
/// Owns the window surface, the scene pipelines, and the offscreen targets
/// the post-process chain ping-pongs through. Scene content arrives lazily:
/// tree and greeting draws are built the first frame their assets are ready.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    post_layout: wgpu::BindGroupLayout,
    bloom_layout: wgpu::BindGroupLayout,
    post: PostResources,
    statics: StaticScene,
    tree_draws: Option<TreeDraws>,
    text_draws: Option<Vec<TextDraw>>,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window. Static scene
    /// geometry (ground, sky, gifts, particle quads) is uploaded here; the
    /// tree and greeting meshes are picked up later from the app state.
    pub async fn new(window: Arc<Window>, app: &App) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals-bind-layout"),
            entries: &[uniform_entry(0)],
        });
        // One layout serves every per-draw constant struct; sizes differ per
        // shading model so the binding size is checked at bind time.
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-layout"),
            entries: &[uniform_entry(0)],
        });
        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-bind-layout"),
            entries: &[
                uniform_entry(0),
                sampler_entry(1),
                texture_entry(2),
            ],
        });
        let bloom_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-bind-layout"),
            entries: &[
                uniform_entry(0),
                sampler_entry(1),
                texture_entry(2),
                texture_entry(3),
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals-bind-group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipelines = Pipelines::create(
            &device,
            &globals_layout,
            &material_layout,
            &post_layout,
            &bloom_layout,
            surface_format,
        );

        let post = PostResources::create(
            &device,
            &post_layout,
            &bloom_layout,
            &sampler,
            config.width,
            config.height,
            &app.post,
        );

        let statics = StaticScene::create(&device, &material_layout, app, config.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            pipelines,
            sampler,
            globals_buffer,
            globals_bind_group,
            material_layout,
            post_layout,
            bloom_layout,
            post,
            statics,
            tree_draws: None,
            text_draws: None,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Resizes the swap chain, the depth buffer, and every offscreen target.
    /// `post` must already hold the new resolution (App::resize runs first).
    pub fn resize(&mut self, new_size: PhysicalSize<u32>, post: &PostChain) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
        self.post = PostResources::create(
            &self.device,
            &self.post_layout,
            &self.bloom_layout,
            &self.sampler,
            new_size.width,
            new_size.height,
            post,
        );
        // The snow point-size law scales with viewport height.
        self.queue.write_buffer(
            &self.statics.snow_uniform,
            0,
            bytes_of(&snow_constants(new_size.height)),
        );
    }

    /// Draws one frame of the app state through the full pass chain:
    /// scene -> stylize -> bloom -> vignette -> surface.
    pub fn render(&mut self, app: &App, camera: &CameraParams) -> Result<(), wgpu::SurfaceError> {
        self.ensure_scene(app);
        self.upload_frame_state(app, camera);

        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        self.encode_scene_pass(&mut encoder, app);
        self.encode_post_passes(&mut encoder, &surface_view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Builds GPU resources for assets that finished loading since the last
    /// frame. Runs every frame but is a no-op once everything is resident.
    fn ensure_scene(&mut self, app: &App) {
        if self.tree_draws.is_none() {
            if let Some(tree) = app.tree.as_ready() {
                self.tree_draws = Some(self.build_tree(tree));
            }
        }
        if self.text_draws.is_none() {
            if let Some(meshes) = app.greeting_meshes.as_ready() {
                let mut draws = Vec::new();
                for (index, line) in app.greeting.iter().enumerate() {
                    let Some(mesh) = meshes.get(&line.mesh) else {
                        warn!("greeting mesh {} missing, line skipped", line.mesh);
                        continue;
                    };
                    draws.push(TextDraw::create(
                        &self.device,
                        &self.material_layout,
                        mesh,
                        index,
                    ));
                }
                self.text_draws = Some(draws);
            }
        }
    }

    fn build_tree(&self, tree: &TreeScene) -> TreeDraws {
        let model = Mat4::from_scale(Vec3::splat(TREE_SCALE));
        let mut banded = Vec::new();
        let mut ornaments = Vec::new();
        for part in &tree.parts {
            let buffers = MeshBuffers::from_mesh(&self.device, &part.mesh, &part.name);
            match part.variant {
                MaterialVariant::Foliage(params) | MaterialVariant::Star(params) => {
                    let constants = banded_constants(&params, model);
                    banded.push((
                        buffers,
                        material_bind_group(
                            &self.device,
                            &self.material_layout,
                            &constants,
                            &part.name,
                        ),
                    ));
                }
                MaterialVariant::Ornament(params) => {
                    let constants = ornament_constants(&params, model);
                    ornaments.push((
                        buffers,
                        material_bind_group(
                            &self.device,
                            &self.material_layout,
                            &constants,
                            &part.name,
                        ),
                    ));
                }
                // Tree parts are only ever foliage or ornaments.
                _ => {}
            }
        }

        let star_constants = banded_constants(
            &BandedParams::star(),
            Mat4::from_translation(tree.star_position),
        );
        let star_bind_group =
            material_bind_group(&self.device, &self.material_layout, &star_constants, "star");

        TreeDraws {
            banded,
            ornaments,
            star_bind_group,
        }
    }

    fn upload_frame_state(&mut self, app: &App, camera: &CameraParams) {
        let elapsed = app.fireflies.time();
        let globals = GlobalUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            resolution: [
                self.size.width as f32,
                self.size.height as f32,
                self.window.scale_factor() as f32,
                elapsed,
            ],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytes_of(&globals));

        let s = &app.post.stylize;
        let stylize = StylizeUniform {
            a: [s.resolution.x, s.resolution.y, s.time, s.posterize_levels],
            b: [
                s.halftone_scale,
                s.halftone_strength,
                s.rgb_shift,
                s.edge_strength,
            ],
            ink: s.ink.extend(1.0).into(),
        };
        self.queue
            .write_buffer(&self.post.stylize_buffer, 0, bytes_of(&stylize));

        self.queue.write_buffer(
            &self.statics.snow_instances,
            0,
            bytemuck::cast_slice(&pack_instances(app.snow.positions(), app.snow.scales())),
        );

        if let Some(draws) = &self.text_draws {
            for draw in draws {
                let Some(pulse) = app.pulses.get(draw.line_index) else {
                    continue;
                };
                let line = &app.greeting[draw.line_index];
                let model = Mat4::from_translation(Vec3::new(
                    0.0,
                    line.base_y + pulse.y_offset,
                    line.z,
                )) * Mat4::from_rotation_y(pulse.yaw)
                    * Mat4::from_rotation_z(pulse.roll)
                    * Mat4::from_scale(Vec3::splat(line.size * pulse.scale));
                let constants = TextConstants {
                    model: model.to_cols_array_2d(),
                    normal: mat3_to_3x4(Mat3::from_mat4(model).inverse().transpose()),
                    color: line.style.color.extend(1.0).into(),
                    emissive: line.style.emissive.extend(pulse.emissive_intensity).into(),
                };
                self.queue
                    .write_buffer(&draw.uniform, 0, bytes_of(&constants));
            }
        }
    }

    fn encode_scene_pass(&self, encoder: &mut wgpu::CommandEncoder, app: &App) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.post.hdr_a.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.02,
                        g: 0.02,
                        b: 0.08,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.globals_bind_group, &[]);

        // Backdrop first, depth writes off.
        pass.set_pipeline(&self.pipelines.sky);
        pass.set_bind_group(1, &self.statics.sky_bind_group, &[]);
        self.statics.sky.draw(&mut pass);

        pass.set_pipeline(&self.pipelines.ground);
        pass.set_bind_group(1, &self.statics.ground_bind_group, &[]);
        self.statics.ground.draw(&mut pass);

        if let Some(tree) = &self.tree_draws {
            pass.set_pipeline(&self.pipelines.banded);
            for (buffers, bind_group) in &tree.banded {
                pass.set_bind_group(1, bind_group, &[]);
                buffers.draw(&mut pass);
            }
            pass.set_bind_group(1, &tree.star_bind_group, &[]);
            self.statics.star.draw(&mut pass);

            pass.set_pipeline(&self.pipelines.ornament);
            for (buffers, bind_group) in &tree.ornaments {
                pass.set_bind_group(1, bind_group, &[]);
                buffers.draw(&mut pass);
            }
        }

        pass.set_pipeline(&self.pipelines.gift);
        for bind_group in &self.statics.gift_bind_groups {
            pass.set_bind_group(1, bind_group, &[]);
            self.statics.gift.draw(&mut pass);
        }

        if let Some(draws) = &self.text_draws {
            if !app.pulses.is_empty() {
                pass.set_pipeline(&self.pipelines.text);
                for draw in draws {
                    pass.set_bind_group(1, &draw.bind_group, &[]);
                    draw.buffers.draw(&mut pass);
                }
            }
        }

        // Translucent particles last, depth tested but not written.
        pass.set_pipeline(&self.pipelines.snow);
        pass.set_bind_group(1, &self.statics.snow_bind_group, &[]);
        pass.set_vertex_buffer(0, self.statics.quad_corners.slice(..));
        pass.set_vertex_buffer(1, self.statics.snow_instances.slice(..));
        pass.draw(0..6, 0..app.snow.len() as u32);

        pass.set_pipeline(&self.pipelines.fireflies);
        pass.set_bind_group(1, &self.statics.firefly_bind_group, &[]);
        pass.set_vertex_buffer(0, self.statics.quad_corners.slice(..));
        pass.set_vertex_buffer(1, self.statics.firefly_instances.slice(..));
        pass.draw(0..6, 0..self.statics.firefly_count);
    }

    fn encode_post_passes(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        // hdr_a -> stylize -> hdr_b
        fullscreen_pass(
            encoder,
            "stylize-pass",
            &self.post.hdr_b.view,
            &self.pipelines.stylize,
            &self.post.stylize_bind_group,
        );
        // hdr_b -> threshold -> bloom_a (half resolution)
        fullscreen_pass(
            encoder,
            "bloom-threshold-pass",
            &self.post.bloom_a.view,
            &self.pipelines.bloom_threshold,
            &self.post.threshold_bind_group,
        );
        // bloom_a -> horizontal blur -> bloom_b
        fullscreen_pass(
            encoder,
            "bloom-blur-h-pass",
            &self.post.bloom_b.view,
            &self.pipelines.bloom_blur,
            &self.post.blur_h_bind_group,
        );
        // bloom_b -> vertical blur -> bloom_a
        fullscreen_pass(
            encoder,
            "bloom-blur-v-pass",
            &self.post.bloom_a.view,
            &self.pipelines.bloom_blur,
            &self.post.blur_v_bind_group,
        );
        // hdr_b + bloom_a -> combine -> hdr_a
        fullscreen_pass(
            encoder,
            "bloom-combine-pass",
            &self.post.hdr_a.view,
            &self.pipelines.bloom_combine,
            &self.post.combine_bind_group,
        );
        // hdr_a -> vignette -> surface
        fullscreen_pass(
            encoder,
            "vignette-pass",
            surface_view,
            &self.pipelines.vignette,
            &self.post.vignette_bind_group,
        );
    }
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

struct Pipelines {
    banded: wgpu::RenderPipeline,
    ornament: wgpu::RenderPipeline,
    gift: wgpu::RenderPipeline,
    ground: wgpu::RenderPipeline,
    sky: wgpu::RenderPipeline,
    text: wgpu::RenderPipeline,
    snow: wgpu::RenderPipeline,
    fireflies: wgpu::RenderPipeline,
    stylize: wgpu::RenderPipeline,
    bloom_threshold: wgpu::RenderPipeline,
    bloom_blur: wgpu::RenderPipeline,
    bloom_combine: wgpu::RenderPipeline,
    vignette: wgpu::RenderPipeline,
}

impl Pipelines {
    fn create(
        device: &wgpu::Device,
        globals_layout: &wgpu::BindGroupLayout,
        material_layout: &wgpu::BindGroupLayout,
        post_layout: &wgpu::BindGroupLayout,
        bloom_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[globals_layout, material_layout],
            push_constant_ranges: &[],
        });
        let post_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-pipeline-layout"),
            bind_group_layouts: &[post_layout],
            push_constant_ranges: &[],
        });
        let bloom_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-pipeline-layout"),
            bind_group_layouts: &[bloom_layout],
            push_constant_ranges: &[],
        });

        let module = |label: &str, source: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.to_string().into()),
            })
        };

        let banded_module = module("banded-shader", BANDED_SHADER);
        let ornament_module = module("ornament-shader", ORNAMENT_SHADER);
        let gift_module = module("gift-shader", GIFT_SHADER);
        let ground_module = module("snow-ground-shader", SNOW_GROUND_SHADER);
        let sky_module = module("sky-shader", SKY_SHADER);
        let snow_module = module("snow-points-shader", SNOW_POINTS_SHADER);
        let firefly_module = module("fireflies-shader", FIREFLIES_SHADER);
        let text_module = module("text-shader", TEXT_SHADER);
        let stylize_module = module("stylize-shader", STYLIZE_SHADER);
        let bloom_module = module("bloom-shader", BLOOM_SHADER);
        let vignette_module = module("vignette-shader", VIGNETTE_SHADER);

        let mesh = mesh_layout();
        let mesh_uv = mesh_uv_layout();
        let positions = position_layout();
        let particle = particle_layouts();

        Self {
            banded: scene_pipeline(
                device,
                &scene_layout,
                "banded-pipeline",
                &banded_module,
                &[mesh.clone()],
                None,
                true,
            ),
            ornament: scene_pipeline(
                device,
                &scene_layout,
                "ornament-pipeline",
                &ornament_module,
                &[mesh.clone()],
                None,
                true,
            ),
            gift: scene_pipeline(
                device,
                &scene_layout,
                "gift-pipeline",
                &gift_module,
                &[mesh_uv.clone()],
                None,
                true,
            ),
            ground: scene_pipeline(
                device,
                &scene_layout,
                "ground-pipeline",
                &ground_module,
                &[positions],
                None,
                true,
            ),
            sky: scene_pipeline(
                device,
                &scene_layout,
                "sky-pipeline",
                &sky_module,
                &[mesh_uv],
                None,
                false,
            ),
            text: scene_pipeline(
                device,
                &scene_layout,
                "text-pipeline",
                &text_module,
                &[mesh],
                None,
                true,
            ),
            snow: scene_pipeline(
                device,
                &scene_layout,
                "snow-pipeline",
                &snow_module,
                &particle,
                Some(wgpu::BlendState::ALPHA_BLENDING),
                false,
            ),
            fireflies: scene_pipeline(
                device,
                &scene_layout,
                "fireflies-pipeline",
                &firefly_module,
                &particle,
                Some(wgpu::BlendState::ALPHA_BLENDING),
                false,
            ),
            stylize: post_pipeline(
                device,
                &post_pipeline_layout,
                "stylize-pipeline",
                &stylize_module,
                "fs_main",
                HDR_FORMAT,
            ),
            bloom_threshold: post_pipeline(
                device,
                &bloom_pipeline_layout,
                "bloom-threshold-pipeline",
                &bloom_module,
                "fs_threshold",
                HDR_FORMAT,
            ),
            bloom_blur: post_pipeline(
                device,
                &bloom_pipeline_layout,
                "bloom-blur-pipeline",
                &bloom_module,
                "fs_blur",
                HDR_FORMAT,
            ),
            bloom_combine: post_pipeline(
                device,
                &bloom_pipeline_layout,
                "bloom-combine-pipeline",
                &bloom_module,
                "fs_combine",
                HDR_FORMAT,
            ),
            vignette: post_pipeline(
                device,
                &post_pipeline_layout,
                "vignette-pipeline",
                &vignette_module,
                "fs_main",
                surface_format,
            ),
        }
    }
}

fn scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    module: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout],
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers,
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn post_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: fragment_entry,
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

const MESH_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const MESH_UV_ATTRS: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const CORNER_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const INSTANCE_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![1 => Float32x3, 2 => Float32];

fn mesh_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (6 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRS,
    }
}

fn mesh_uv_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (8 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_UV_ATTRS,
    }
}

fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (3 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRS,
    }
}

fn particle_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [
        wgpu::VertexBufferLayout {
            array_stride: (2 * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &CORNER_ATTRS,
        },
        wgpu::VertexBufferLayout {
            array_stride: (4 * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &INSTANCE_ATTRS,
        },
    ]
}

/// Offscreen targets and the bind groups wiring the post chain together.
/// Recreated wholesale on resize; every bind group references a view.
struct PostResources {
    hdr_a: RenderTarget,
    hdr_b: RenderTarget,
    bloom_a: RenderTarget,
    bloom_b: RenderTarget,
    stylize_buffer: wgpu::Buffer,
    stylize_bind_group: wgpu::BindGroup,
    threshold_bind_group: wgpu::BindGroup,
    blur_h_bind_group: wgpu::BindGroup,
    blur_v_bind_group: wgpu::BindGroup,
    combine_bind_group: wgpu::BindGroup,
    vignette_bind_group: wgpu::BindGroup,
}

impl PostResources {
    fn create(
        device: &wgpu::Device,
        post_layout: &wgpu::BindGroupLayout,
        bloom_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        chain: &PostChain,
    ) -> Self {
        let hdr_a = RenderTarget::create(device, width, height, "hdr-a");
        let hdr_b = RenderTarget::create(device, width, height, "hdr-b");
        // Bloom runs at half resolution; the blur radius covers twice the
        // distance for free and the glow stays soft.
        let half_w = (width / 2).max(1);
        let half_h = (height / 2).max(1);
        let bloom_a = RenderTarget::create(device, half_w, half_h, "bloom-a");
        let bloom_b = RenderTarget::create(device, half_w, half_h, "bloom-b");

        let stylize_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stylize-uniform"),
            size: std::mem::size_of::<StylizeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bloom = &chain.bloom;
        let half_res = [half_w as f32, half_h as f32];
        let bloom_buffer = |label: &str, a: [f32; 4], b: [f32; 4]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes_of(&BloomUniform { a, b }),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        let threshold_buffer = bloom_buffer(
            "bloom-threshold-uniform",
            [half_res[0], half_res[1], bloom.threshold, bloom.strength],
            [0.0; 4],
        );
        let blur_h_buffer = bloom_buffer(
            "bloom-blur-h-uniform",
            [half_res[0], half_res[1], bloom.threshold, bloom.strength],
            [1.0, 0.0, bloom.radius, 0.0],
        );
        let blur_v_buffer = bloom_buffer(
            "bloom-blur-v-uniform",
            [half_res[0], half_res[1], bloom.threshold, bloom.strength],
            [0.0, 1.0, bloom.radius, 0.0],
        );
        let combine_buffer = bloom_buffer(
            "bloom-combine-uniform",
            [width as f32, height as f32, bloom.threshold, bloom.strength],
            [0.0; 4],
        );

        let vignette = &chain.vignette;
        let vignette_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vignette-uniform"),
            contents: bytes_of(&VignetteUniform {
                a: [
                    width as f32,
                    height as f32,
                    vignette.offset,
                    vignette.darkness,
                ],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let post_bind_group = |label: &str, buffer: &wgpu::Buffer, source: &RenderTarget| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                ],
            })
        };
        let bloom_bind_group =
            |label: &str, buffer: &wgpu::Buffer, source: &RenderTarget, aux: &RenderTarget| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout: bloom_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&source.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(&aux.view),
                        },
                    ],
                })
            };

        let stylize_bind_group = post_bind_group("stylize-bind-group", &stylize_buffer, &hdr_a);
        let threshold_bind_group =
            bloom_bind_group("bloom-threshold-bind-group", &threshold_buffer, &hdr_b, &hdr_b);
        let blur_h_bind_group =
            bloom_bind_group("bloom-blur-h-bind-group", &blur_h_buffer, &bloom_a, &bloom_a);
        let blur_v_bind_group =
            bloom_bind_group("bloom-blur-v-bind-group", &blur_v_buffer, &bloom_b, &bloom_b);
        let combine_bind_group =
            bloom_bind_group("bloom-combine-bind-group", &combine_buffer, &hdr_b, &bloom_a);
        let vignette_bind_group =
            post_bind_group("vignette-bind-group", &vignette_buffer, &hdr_a);

        Self {
            hdr_a,
            hdr_b,
            bloom_a,
            bloom_b,
            stylize_buffer,
            stylize_bind_group,
            threshold_bind_group,
            blur_h_bind_group,
            blur_v_bind_group,
            combine_bind_group,
            vignette_bind_group,
        }
    }
}

/// Static geometry uploaded once at startup.
struct StaticScene {
    ground: MeshBuffers,
    ground_bind_group: wgpu::BindGroup,
    sky: MeshBuffers,
    sky_bind_group: wgpu::BindGroup,
    star: MeshBuffers,
    gift: MeshBuffers,
    gift_bind_groups: Vec<wgpu::BindGroup>,
    quad_corners: wgpu::Buffer,
    snow_instances: wgpu::Buffer,
    snow_uniform: wgpu::Buffer,
    snow_bind_group: wgpu::BindGroup,
    firefly_instances: wgpu::Buffer,
    firefly_count: u32,
    firefly_bind_group: wgpu::BindGroup,
}

impl StaticScene {
    fn create(
        device: &wgpu::Device,
        material_layout: &wgpu::BindGroupLayout,
        app: &App,
        viewport_height: u32,
    ) -> Self {
        let (ground_vertices, ground_indices) = ground_plane(GROUND_SIZE, GROUND_SEGMENTS);
        let ground = MeshBuffers::from_raw(device, &ground_vertices, &ground_indices, "ground");
        let ground_bind_group = material_bind_group(
            device,
            material_layout,
            &ground_constants(&SnowGroundParams::default()),
            "ground",
        );

        let (sky_vertices, sky_indices) = cube(SKY_SIZE);
        let sky = MeshBuffers::from_raw(device, &sky_vertices, &sky_indices, "sky");
        let sky_bind_group = material_bind_group(
            device,
            material_layout,
            &sky_constants(&SkyParams::default()),
            "sky",
        );

        let (star_vertices, star_indices) = octahedron(STAR_RADIUS);
        let star = MeshBuffers::from_raw(device, &star_vertices, &star_indices, "star");

        let (gift_vertices, gift_indices) = cube(GIFT_SIZE);
        let gift = MeshBuffers::from_raw(device, &gift_vertices, &gift_indices, "gift");
        let gift_bind_groups = app
            .gifts
            .iter()
            .enumerate()
            .map(|(index, placement)| {
                let model = Mat4::from_translation(placement.position)
                    * Mat4::from_rotation_y(placement.rotation_y);
                material_bind_group(
                    device,
                    material_layout,
                    &gift_constants(&placement.params, model),
                    &format!("gift-{index}"),
                )
            })
            .collect();

        // Two triangles spanning [-0.5, 0.5]^2, shared by both particle
        // systems.
        let quad: [f32; 12] = [
            -0.5, -0.5, 0.5, -0.5, 0.5, 0.5, //
            -0.5, -0.5, 0.5, 0.5, -0.5, 0.5,
        ];
        let quad_corners = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle-quad"),
            contents: bytemuck::cast_slice(&quad),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let snow_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("snow-instances"),
            size: (app.snow.len() * 4 * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let snow_uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("snow-uniform"),
            contents: bytes_of(&snow_constants(viewport_height)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let snow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("snow-bind-group"),
            layout: material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: snow_uniform.as_entire_binding(),
            }],
        });

        let firefly_data = pack_instances(app.fireflies.positions(), app.fireflies.scales());
        let firefly_instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("firefly-instances"),
            contents: bytemuck::cast_slice(&firefly_data),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let firefly_bind_group = material_bind_group(
            device,
            material_layout,
            &FireflyConstants {
                params: [FIREFLY_BASE_SIZE, 0.0, 0.0, 0.0],
            },
            "fireflies",
        );

        Self {
            ground,
            ground_bind_group,
            sky,
            sky_bind_group,
            star,
            gift,
            gift_bind_groups,
            quad_corners,
            snow_instances,
            snow_uniform,
            snow_bind_group,
            firefly_instances,
            firefly_count: app.fireflies.positions().len() as u32,
            firefly_bind_group,
        }
    }
}

/// Tree draws split by pipeline, built once the tree asset is ready.
struct TreeDraws {
    banded: Vec<(MeshBuffers, wgpu::BindGroup)>,
    ornaments: Vec<(MeshBuffers, wgpu::BindGroup)>,
    star_bind_group: wgpu::BindGroup,
}

/// One greeting line's GPU state. The uniform is rewritten every frame with
/// the current pulse.
struct TextDraw {
    buffers: MeshBuffers,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    line_index: usize,
}

impl TextDraw {
    fn create(
        device: &wgpu::Device,
        material_layout: &wgpu::BindGroupLayout,
        mesh: &MeshData,
        line_index: usize,
    ) -> Self {
        let label = format!("greeting-{line_index}");
        let buffers = MeshBuffers::from_mesh(device, mesh, &label);
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}-uniform")),
            size: std::mem::size_of::<TextConstants>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-bind-group")),
            layout: material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        Self {
            buffers,
            uniform,
            bind_group,
            line_index,
        }
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        Self::from_raw(device, &mesh.vertices, &mesh.indices, label)
    }

    fn from_raw(device: &wgpu::Device, vertices: &[f32], indices: &[u32], label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: indices.len() as u32,
        }
    }

    fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn create(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn material_bind_group<T: Pod>(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    constants: &T,
    label: &str,
) -> wgpu::BindGroup {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-uniform")),
        contents: bytes_of(constants),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label}-bind-group")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

/// Interleaves particle positions and scales into the instance layout
/// `[x, y, z, scale]`.
fn pack_instances(positions: &[Vec3], scales: &[f32]) -> Vec<f32> {
    let mut data = Vec::with_capacity(positions.len() * 4);
    for (p, s) in positions.iter().zip(scales) {
        data.extend_from_slice(&[p.x, p.y, p.z, *s]);
    }
    data
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

fn banded_constants(params: &BandedParams, model: Mat4) -> BandedConstants {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    let colors = params.palette.colors();
    let thresholds = params.palette.thresholds();
    BandedConstants {
        model: model.to_cols_array_2d(),
        normal: mat3_to_3x4(normal),
        palette: [
            colors[0].extend(1.0).into(),
            colors[1].extend(1.0).into(),
            colors[2].extend(1.0).into(),
            colors[3].extend(1.0).into(),
        ],
        thresholds: [thresholds[0], thresholds[1], thresholds[2], 0.0],
        light_position: params.light_position.extend(1.0).into(),
        ink: palette::ink().extend(1.0).into(),
        params: [params.edge_weight, params.sparkle, 0.0, 0.0],
    }
}

fn ornament_constants(params: &OrnamentParams, model: Mat4) -> OrnamentConstants {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    OrnamentConstants {
        model: model.to_cols_array_2d(),
        normal: mat3_to_3x4(normal),
        base: params.base.extend(1.0).into(),
        shadow: params.shadow.extend(1.0).into(),
        accent: params.accent.extend(1.0).into(),
        ink: params.ink.extend(1.0).into(),
    }
}

fn gift_constants(params: &GiftParams, model: Mat4) -> GiftConstants {
    let normal = Mat3::from_mat4(model).inverse().transpose();
    GiftConstants {
        model: model.to_cols_array_2d(),
        normal: mat3_to_3x4(normal),
        base: params.base.extend(1.0).into(),
        ribbon: params.ribbon.extend(1.0).into(),
    }
}

fn ground_constants(params: &SnowGroundParams) -> GroundConstants {
    GroundConstants {
        model: Mat4::IDENTITY.to_cols_array_2d(),
        color: params.color.extend(1.0).into(),
        fog_color: params.fog_color.extend(1.0).into(),
    }
}

fn sky_constants(params: &SkyParams) -> SkyConstants {
    SkyConstants {
        model: Mat4::IDENTITY.to_cols_array_2d(),
        top: params.top.extend(1.0).into(),
        bottom: params.bottom.extend(1.0).into(),
        params: [params.offset, params.exponent, 0.0, 0.0],
    }
}

fn snow_constants(viewport_height: u32) -> SnowConstants {
    SnowConstants {
        color: [0.96, 0.98, 1.0, 1.0],
        params: [SNOW_BASE_SIZE, viewport_height as f32 * 0.5, 0.0, 0.0],
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    /// xy: viewport px, z: pixel ratio, w: elapsed seconds.
    resolution: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BandedConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    palette: [[f32; 4]; 4],
    thresholds: [f32; 4],
    light_position: [f32; 4],
    ink: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct OrnamentConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    base: [f32; 4],
    shadow: [f32; 4],
    accent: [f32; 4],
    ink: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GiftConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    base: [f32; 4],
    ribbon: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GroundConstants {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    fog_color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SkyConstants {
    model: [[f32; 4]; 4],
    top: [f32; 4],
    bottom: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SnowConstants {
    color: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FireflyConstants {
    params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TextConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color: [f32; 4],
    emissive: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct StylizeUniform {
    a: [f32; 4],
    b: [f32; 4],
    ink: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BloomUniform {
    a: [f32; 4],
    b: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct VignetteUniform {
    a: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_interleave_position_and_scale() {
        let data = pack_instances(
            &[Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)],
            &[0.5, 1.5],
        );
        assert_eq!(data, vec![1.0, 2.0, 3.0, 0.5, 4.0, 5.0, 6.0, 1.5]);
    }

    #[test]
    fn banded_constants_carry_the_palette_in_band_order() {
        let constants = banded_constants(&BandedParams::foliage(), Mat4::IDENTITY);
        let expected = palette::foliage();
        for (slot, color) in constants.palette.iter().zip(expected.colors()) {
            assert_eq!(&slot[..3], &[color.x, color.y, color.z]);
        }
        assert!(constants.thresholds[0] > constants.thresholds[1]);
        assert!(constants.thresholds[1] > constants.thresholds[2]);
    }

    #[test]
    fn normal_matrix_columns_pad_to_vec4() {
        let m = mat3_to_3x4(Mat3::IDENTITY);
        assert_eq!(m[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(m[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(m[2], [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn snow_size_law_tracks_viewport_height() {
        let a = snow_constants(600);
        let b = snow_constants(1200);
        assert_eq!(a.params[1] * 2.0, b.params[1]);
        assert_eq!(a.params[0], b.params[0]);
    }
}
