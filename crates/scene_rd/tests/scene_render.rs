//! End-to-end tests of the scene renderer over headless storage

use approx::assert_relative_eq;
use scene_rd::prelude::*;
use scene_rd::render::environment::{Tonemap, MIN_EXPOSURE};
use scene_rd::render::storage::StorageCommand;
use scene_rd::render::{SceneResource, StorageCapabilities};

#[derive(Debug, Default)]
struct RecordedBuffers {
    render_target: RenderTargetHandle,
    width: u32,
    height: u32,
    msaa: ViewportMsaa,
    configure_calls: u32,
    frames: u32,
}

impl RenderBufferData for RecordedBuffers {
    fn configure(
        &mut self,
        render_target: RenderTargetHandle,
        width: u32,
        height: u32,
        msaa: ViewportMsaa,
    ) -> RenderResult<()> {
        self.render_target = render_target;
        self.width = width;
        self.height = height;
        self.msaa = msaa;
        self.configure_calls += 1;
        Ok(())
    }
}

/// What the backend observed during one render
#[derive(Debug, Clone, PartialEq)]
struct RenderedFrame {
    instances: Vec<u32>,
    environment: EnvironmentHandle,
    sky_radiance: Option<TextureHandle>,
    dirty_skies: usize,
    orthogonal: bool,
}

#[derive(Debug, Default)]
struct RecordingBackend {
    created: u32,
    frames: Vec<RenderedFrame>,
}

impl SceneBackend for RecordingBackend {
    type BufferData = RecordedBuffers;
    type Instance = u32;

    fn create_render_buffer_data(&mut self) -> RenderResult<RecordedBuffers> {
        self.created += 1;
        Ok(RecordedBuffers::default())
    }

    fn render_scene(
        &mut self,
        buffers: &mut RecordedBuffers,
        data: &SceneRenderData<'_, u32>,
        resources: &SceneResources<'_>,
    ) -> RenderResult<()> {
        buffers.frames += 1;
        self.frames.push(RenderedFrame {
            instances: data.instances.to_vec(),
            environment: data.environment,
            sky_radiance: resources.environments.sky_radiance(data.environment, resources.skies),
            dirty_skies: resources.skies.dirty_count(),
            orthogonal: data.camera.orthogonal,
        });
        Ok(())
    }
}

type TestRenderer = SceneRenderer<RecordingBackend, HeadlessStorage>;

fn renderer() -> TestRenderer {
    scene_rd::foundation::logging::try_init();
    SceneRenderer::new(RecordingBackend::default(), HeadlessStorage::new(), SceneRendererConfig::default()).unwrap()
}

fn configured_buffers(renderer: &mut TestRenderer) -> RenderBuffersHandle {
    let buffers = renderer.render_buffers_create();
    renderer
        .render_buffers_configure(buffers, RenderTargetHandle(1), 640, 480, ViewportMsaa::Disabled)
        .unwrap();
    buffers
}

#[test]
fn quality_sky_is_convolved_before_rendering() {
    let mut renderer = renderer();
    let buffers = configured_buffers(&mut renderer);

    let panorama = renderer.storage_mut().texture_register(2048, 1024);
    let sky = renderer.sky_create();
    renderer.sky_set_mode(sky, SkyMode::Quality).unwrap();
    renderer.sky_set_radiance_size(sky, 512).unwrap();
    renderer.sky_set_texture(sky, panorama).unwrap();

    let env = renderer.environment_create();
    renderer.environments_mut().set_sky(env, sky).unwrap();
    renderer.environments_mut().set_background(env, EnvironmentBackground::Sky).unwrap();

    assert!(!renderer.sky_get_radiance_texture(sky).is_valid());

    let frame = SceneRenderData::new(CameraState::default()).with_environment(env);
    renderer.render_scene(buffers, &frame).unwrap();

    let radiance = renderer.sky_get_radiance_texture(sky);
    assert!(radiance.is_valid());
    assert_eq!(renderer.storage().radiance_desc(radiance).unwrap().size, 512);

    let quality = renderer.config().sky.ggx_samples_quality;
    assert_eq!(renderer.skies().get(sky).unwrap().radiance_samples(), quality);
    assert_ne!(quality, renderer.config().sky.ggx_samples_realtime);
    assert!(renderer.storage().filter_passes().all(|pass| pass.sample_count == quality));

    let rendered = &renderer.backend().frames[0];
    assert_eq!(rendered.dirty_skies, 0);
    assert_eq!(rendered.sky_radiance, Some(radiance));
}

#[test]
fn reconfigure_reflects_latest_size() {
    let mut renderer = renderer();
    let buffers = renderer.render_buffers_create();

    renderer
        .render_buffers_configure(buffers, RenderTargetHandle(3), 800, 600, ViewportMsaa::Disabled)
        .unwrap();
    renderer
        .render_buffers_configure(buffers, RenderTargetHandle(3), 1024, 768, ViewportMsaa::Disabled)
        .unwrap();

    let data = renderer.render_buffers().get(buffers).unwrap().data().unwrap();
    assert_eq!((data.width, data.height), (1024, 768));
    assert_eq!(data.configure_calls, 2);
    assert_eq!(data.render_target, RenderTargetHandle(3));
    assert_eq!(renderer.backend().created, 1);
}

#[test]
fn render_without_sky_calls_backend_once() {
    let mut renderer = renderer();
    let buffers = configured_buffers(&mut renderer);
    let env = renderer.environment_create();

    let instances = [1, 2, 3];
    let frame = SceneRenderData::new(CameraState::default())
        .with_instances(&instances)
        .with_environment(env);
    renderer.render_scene(buffers, &frame).unwrap();

    assert_eq!(renderer.backend().frames.len(), 1);
    assert_eq!(renderer.backend().frames[0].instances, vec![1, 2, 3]);
    assert_eq!(renderer.backend().frames[0].sky_radiance, None);
    assert_eq!(renderer.render_buffers().get(buffers).unwrap().data().unwrap().frames, 1);
}

#[test]
fn stale_sky_reference_is_tolerated() {
    let mut renderer = renderer();
    let buffers = configured_buffers(&mut renderer);

    let sky = renderer.sky_create();
    let env = renderer.environment_create();
    renderer.environments_mut().set_sky(env, sky).unwrap();
    assert!(renderer.free(sky));

    let frame = SceneRenderData::new(CameraState::default()).with_environment(env);
    renderer.render_scene(buffers, &frame).unwrap();

    assert_eq!(renderer.backend().frames.len(), 1);
    assert_eq!(renderer.backend().frames[0].sky_radiance, None);
}

#[test]
fn render_errors_do_not_reach_backend() {
    let mut renderer = renderer();
    let frame = SceneRenderData::new(CameraState::default());

    let unconfigured = renderer.render_buffers_create();
    assert_eq!(
        renderer.render_scene(unconfigured, &frame),
        Err(RenderError::UnconfiguredRenderBuffers)
    );

    let buffers = configured_buffers(&mut renderer);
    assert!(renderer.free(buffers));
    assert_eq!(
        renderer.render_scene(buffers, &frame),
        Err(RenderError::InvalidHandle { kind: "render buffers" })
    );

    assert!(renderer.backend().frames.is_empty());
}

#[test]
fn sky_edits_between_frames_flush_once() {
    let mut renderer = renderer();
    let buffers = configured_buffers(&mut renderer);
    let frame = SceneRenderData::new(CameraState::default());

    let panorama = renderer.storage_mut().texture_register(1024, 512);
    let sky = renderer.sky_create();
    renderer.sky_set_texture(sky, panorama).unwrap();
    renderer.sky_set_mode(sky, SkyMode::Realtime).unwrap();
    renderer.sky_set_radiance_size(sky, 128).unwrap();
    assert_eq!(renderer.skies().dirty_count(), 1);

    renderer.render_scene(buffers, &frame).unwrap();
    let copies = |renderer: &TestRenderer| {
        renderer
            .storage()
            .commands()
            .iter()
            .filter(|command| matches!(command, StorageCommand::CopyPanorama { .. }))
            .count()
    };
    assert_eq!(copies(&renderer), 1);

    renderer.render_scene(buffers, &frame).unwrap();
    assert_eq!(copies(&renderer), 1);
    assert_eq!(renderer.backend().frames.len(), 2);
}

#[test]
fn capabilities_decide_radiance_layout() {
    let capabilities = StorageCapabilities {
        roughness_layers: 6,
        ..StorageCapabilities::default()
    };
    let storage = HeadlessStorage::with_capabilities(capabilities);
    let renderer =
        SceneRenderer::new(RecordingBackend::default(), storage, SceneRendererConfig::default()).unwrap();

    assert_eq!(renderer.get_roughness_layers(), 6);
    assert!(renderer.is_using_radiance_cubemap_array());

    let config = SceneRendererConfig::default().with_cubemap_array(false);
    let renderer = SceneRenderer::new(RecordingBackend::default(), HeadlessStorage::new(), config).unwrap();
    assert!(!renderer.is_using_radiance_cubemap_array());
}

#[test]
fn invalid_config_is_rejected() {
    let config = SceneRendererConfig::default().with_ggx_samples(0, 128);
    let result = SceneRenderer::new(RecordingBackend::default(), HeadlessStorage::new(), config);

    assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
}

#[test]
fn environment_tonemap_round_trip() {
    let mut renderer = renderer();
    let env = renderer.environment_create();

    let tonemap = Tonemap {
        exposure: 0.0,
        white: 4.0,
        ..Tonemap::default()
    };
    renderer.environments_mut().set_tonemap(env, tonemap).unwrap();
    renderer.environments_mut().set_bg_energy(env, 2.5).unwrap();

    assert_relative_eq!(renderer.environments().exposure(env), MIN_EXPOSURE);
    assert_relative_eq!(renderer.environments().white(env), 4.0);
    assert_relative_eq!(renderer.environments().bg_energy(env), 2.5);
    assert!(renderer.is_environment(env));

    assert!(renderer.free(SceneResource::Environment(env)));
    assert!(!renderer.is_environment(env));
}

#[test]
fn reflection_probe_claims_atlas_slot() {
    let mut renderer = renderer();
    let atlas = renderer.atlases_mut().reflection_atlas_create();
    renderer.atlases_mut().reflection_atlas_set_subdivision(atlas, 1).unwrap();

    let first = renderer
        .instances_mut()
        .reflection_probe_instance_create(scene_rd::render::ReflectionProbeHandle(1));
    let second = renderer
        .instances_mut()
        .reflection_probe_instance_create(scene_rd::render::ReflectionProbeHandle(2));

    assert!(renderer.reflection_probe_instance_begin_render(first, atlas).unwrap());
    assert!(!renderer.reflection_probe_instance_begin_render(second, atlas).unwrap());

    let steps = renderer.get_roughness_layers();
    for _ in 1..steps {
        assert!(!renderer.reflection_probe_instance_postprocess_step(first).unwrap());
    }
    assert!(renderer.reflection_probe_instance_postprocess_step(first).unwrap());
    assert!(renderer.instances().reflection_probe_instance_has_reflection(first));

    assert!(renderer.free(first));
    assert!(renderer.reflection_probe_instance_begin_render(second, atlas).unwrap());
}

#[test]
fn update_clears_light_visibility() {
    let mut renderer = renderer();
    let light = renderer
        .instances_mut()
        .light_instance_create(scene_rd::render::LightHandle(9));
    renderer.instances_mut().light_instance_mark_visible(light).unwrap();

    assert_eq!(renderer.update().unwrap(), 0);
    assert!(!renderer.instances().light_instance(light).unwrap().visible);
}

#[test]
fn freeing_sky_releases_storage() {
    let mut storage = HeadlessStorage::new();
    let panorama = storage.texture_register(512, 256);

    let mut renderer = SceneRenderer::new(RecordingBackend::default(), storage, SceneRendererConfig::default()).unwrap();
    let sky = renderer.sky_create();
    renderer.sky_set_texture(sky, panorama).unwrap();
    renderer.update().unwrap();

    // panorama + radiance + base cubemap + views
    assert!(renderer.storage().live_texture_count() > 3);
    assert!(renderer.storage().live_framebuffer_count() > 0);
    assert!(renderer.free(sky));
    assert_eq!(renderer.storage().live_texture_count(), 1);
    assert_eq!(renderer.storage().live_framebuffer_count(), 0);
}
