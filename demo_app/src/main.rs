//! Sky demo application
//!
//! Drives the scene renderer core over headless storage for a handful of
//! frames: a sky is created and edited between frames, a viewport is resized,
//! and a logging backend reports what it would draw.
//!
//! Pass a `.toml` or `.ron` renderer configuration as the first argument to
//! override the defaults.

use nalgebra::{Point3, Vector3};
use scene_rd::foundation::logging;
use scene_rd::prelude::*;
use scene_rd::render::environment::{AmbientLight, AmbientSource, ToneMapper, Tonemap};

/// Render buffer storage of the logging backend
#[derive(Debug, Default)]
struct LoggedBuffers {
    width: u32,
    height: u32,
    samples: u32,
    frames: u64,
}

impl RenderBufferData for LoggedBuffers {
    fn configure(
        &mut self,
        render_target: RenderTargetHandle,
        width: u32,
        height: u32,
        msaa: ViewportMsaa,
    ) -> RenderResult<()> {
        log::info!("Buffers for {:?} configured to {}x{} ({:?})", render_target, width, height, msaa);
        self.width = width;
        self.height = height;
        self.samples = msaa.sample_count();
        Ok(())
    }

    fn release(&mut self) {
        log::info!("Buffers released after {} frame(s)", self.frames);
    }
}

/// Backend that logs each render instead of drawing
#[derive(Debug, Default)]
struct LoggingBackend;

impl SceneBackend for LoggingBackend {
    type BufferData = LoggedBuffers;
    type Instance = &'static str;

    fn create_render_buffer_data(&mut self) -> RenderResult<LoggedBuffers> {
        Ok(LoggedBuffers::default())
    }

    fn render_scene(
        &mut self,
        buffers: &mut LoggedBuffers,
        data: &SceneRenderData<'_, &'static str>,
        resources: &SceneResources<'_>,
    ) -> RenderResult<()> {
        buffers.frames += 1;

        let environments = resources.environments;
        let radiance = environments.sky_radiance(data.environment, resources.skies);
        let exposure = environments.exposure(data.environment);

        log::info!(
            "Frame {}: {}x{} x{} samples, {} instance(s) {:?}, radiance {:?}, exposure {:.2}",
            buffers.frames,
            buffers.width,
            buffers.height,
            buffers.samples,
            data.instances.len(),
            data.instances,
            radiance,
            exposure
        );
        Ok(())
    }
}

fn load_config() -> Result<SceneRendererConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading renderer configuration from {}", path);
            Ok(SceneRendererConfig::load_from_file(path)?)
        }
        None => Ok(SceneRendererConfig::default()),
    }
}

fn camera(aspect: f32) -> CameraState {
    let eye = Point3::new(0.0, 2.0, 8.0);
    let view = Mat4::look_at_rh(&eye, &Point3::origin(), &Vector3::y());
    let transform = view.try_inverse().unwrap_or_else(Mat4::identity);
    let projection = Mat4::new_perspective(aspect, 45f32.to_radians(), 0.1, 100.0);

    CameraState::perspective(transform, projection)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(log::LevelFilter::Debug);

    log::info!("Starting sky demo");

    let config = load_config()?;
    let mut storage = HeadlessStorage::new();
    let panorama = storage.texture_register(2048, 1024);
    let mut renderer = SceneRenderer::new(LoggingBackend, storage, config)?;

    log::info!(
        "Roughness layers: {}, cubemap array: {}",
        renderer.get_roughness_layers(),
        renderer.is_using_radiance_cubemap_array()
    );

    let sky = renderer.sky_create();
    renderer.sky_set_texture(sky, panorama)?;
    renderer.sky_set_mode(sky, SkyMode::Realtime)?;

    let env = renderer.environment_create();
    {
        let environments = renderer.environments_mut();
        environments.set_background(env, EnvironmentBackground::Sky)?;
        environments.set_sky(env, sky)?;
        environments.set_ambient_light(
            env,
            AmbientLight {
                color: Color::rgb(0.2, 0.25, 0.3),
                source: AmbientSource::Sky,
                energy: 1.0,
                sky_contribution: 0.8,
                ..AmbientLight::default()
            },
        )?;
        environments.set_tonemap(
            env,
            Tonemap {
                tone_mapper: ToneMapper::Aces,
                exposure: 1.2,
                ..Tonemap::default()
            },
        )?;
    }

    let buffers = renderer.render_buffers_create();
    let mut size = (800, 600);
    renderer.render_buffers_configure(buffers, RenderTargetHandle(1), size.0, size.1, ViewportMsaa::Disabled)?;

    let instances = ["ground", "teapot", "asteroid"];

    for frame in 0..4u32 {
        match frame {
            1 => {
                // Several edits, one regeneration at the next render
                renderer.sky_set_mode(sky, SkyMode::Quality)?;
                renderer.sky_set_radiance_size(sky, 512)?;
            }
            2 => {
                size = (1024, 768);
                renderer.render_buffers_configure(buffers, RenderTargetHandle(1), size.0, size.1, ViewportMsaa::X4)?;
            }
            _ => {}
        }

        let data = SceneRenderData::new(camera(size.0 as f32 / size.1 as f32))
            .with_instances(&instances)
            .with_environment(env);

        renderer.render_scene(buffers, &data)?;
        renderer.update()?;
    }

    log::info!(
        "Storage received {} command(s), {} texture(s) live",
        renderer.storage().commands().len(),
        renderer.storage().live_texture_count()
    );

    renderer.free(buffers);
    renderer.free(env);
    renderer.free(sky);

    log::info!("Sky demo finished");
    Ok(())
}
