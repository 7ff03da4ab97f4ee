use std::sync::Mutex;

use super::*;
use crate::foundation::error::{BackendError, BackendResult, CaptureError, ConfigError, status};
use crate::render::backend::{BackendKind, SurfaceConfig, WindowHandle};
use crate::runtime::{HostEnv, init};

#[derive(Default)]
struct Log {
    created: u32,
    released: u32,
    resized: Vec<(u32, u32)>,
    pts: Vec<Option<f64>>,
    fail_init: bool,
    fail_eval: bool,
}

#[derive(Clone, Default)]
struct FakeFactory {
    log: Arc<Mutex<Log>>,
}

impl FakeFactory {
    fn log(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }
}

struct FakeBackend {
    log: Arc<Mutex<Log>>,
    kind: BackendKind,
}

impl BackendFactory for FakeFactory {
    fn supports(&self, kind: BackendKind) -> bool {
        matches!(kind, BackendKind::Auto | BackendKind::Vulkan)
    }

    fn create(&self, kind: BackendKind) -> BackendResult<Box<dyn Backend>> {
        self.log().created += 1;
        Ok(Box::new(FakeBackend {
            log: self.log.clone(),
            kind,
        }))
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn initialize(&mut self, _cfg: &SurfaceConfig) -> BackendResult<()> {
        if self.log.lock().unwrap().fail_init {
            return Err(BackendError::failed("init failed"));
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.log.lock().unwrap().resized.push((width, height));
        Ok(())
    }

    fn evaluate_graph(&mut self, _plan: &FramePlan) -> BackendResult<()> {
        if self.log.lock().unwrap().fail_eval {
            return Err(BackendError::failed("device lost"));
        }
        Ok(())
    }

    fn present(&mut self, pts: Option<f64>) -> BackendResult<()> {
        self.log.lock().unwrap().pts.push(pts);
        Ok(())
    }

    fn read_pixels(&mut self, dst: &mut [u8]) -> BackendResult<()> {
        dst.fill(0x42);
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released += 1;
    }
}

fn fake_context() -> (RenderContext, FakeFactory) {
    init(HostEnv::new());
    let factory = FakeFactory::default();
    let ctx = RenderContext::with_factory(Arc::new(factory.clone())).unwrap();
    (ctx, factory)
}

#[test]
fn operations_before_configure_are_state_errors() {
    let (mut ctx, _) = fake_context();
    assert_eq!(ctx.state(), ContextState::Created);
    for err in [
        ctx.draw(0.0).unwrap_err(),
        ctx.resize(4, 4).unwrap_err(),
        ctx.load_scene("Quad").unwrap_err(),
        ctx.reset_scene().unwrap_err(),
        ctx.set_capture_buffer(CaptureBuffer::new(4)).unwrap_err(),
    ] {
        assert_eq!(err.status_code(), status::INVALID_STATE);
    }
}

#[test]
fn failed_backend_init_keeps_previous_configuration() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(8, 8)).unwrap();
    ctx.load_scene("Rclr").unwrap();

    factory.log().fail_init = true;
    let err = ctx.configure(Config::offscreen(16, 16)).unwrap_err();
    assert_eq!(err.status_code(), status::BACKEND);
    assert_eq!(ctx.size(), Some(SurfaceSize::new(8, 8)));
    assert_eq!(factory.log().released, 1, "only the rejected backend is released");

    factory.log().fail_init = false;
    ctx.draw(0.0).unwrap();
    assert_eq!(ctx.frame_count(), 1);
}

#[test]
fn invalid_config_touches_nothing() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(8, 8)).unwrap();

    let mut bad = Config::offscreen(8, 8);
    bad.backend = BackendKind::OpenGL;
    let err = ctx.configure(bad).unwrap_err();
    assert!(matches!(
        err,
        NglError::Config(ConfigError::UnsupportedBackend(BackendKind::OpenGL))
    ));
    assert_eq!(err.status_code(), status::UNSUPPORTED_BACKEND);
    assert_eq!(factory.log().created, 1);

    let mut bad = Config::offscreen(8, 8);
    bad.capture_buffer = Some(CaptureBuffer::new(3));
    let err = ctx.configure(bad).unwrap_err();
    assert!(matches!(
        err,
        NglError::Capture(CaptureError::CapacityMismatch { .. })
    ));
    assert_eq!(factory.log().created, 1);
}

#[test]
fn reconfigure_keeps_scene_and_same_size_binding() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(4, 4)).unwrap();
    ctx.load_scene("Rclr").unwrap();
    let buf = CaptureBuffer::for_size(4, 4);
    ctx.set_capture_buffer(buf.clone()).unwrap();
    ctx.draw(0.0).unwrap();

    let mut cfg = Config::offscreen(4, 4);
    cfg.backend = BackendKind::Vulkan;
    ctx.configure(cfg).unwrap();
    assert_eq!(factory.log().released, 1);
    assert!(ctx.scene().is_some());
    assert!(ctx.has_capture_buffer());
    assert_eq!(ctx.frame_state().frames(), 0);

    ctx.configure(Config::offscreen(8, 4)).unwrap();
    assert!(ctx.scene().is_some());
    assert!(!ctx.has_capture_buffer());
}

#[test]
fn embedded_capture_buffer_becomes_binding() {
    let (mut ctx, _) = fake_context();
    let host = CaptureBuffer::for_size(2, 2);
    let mut cfg = Config::offscreen(2, 2);
    cfg.capture_buffer = Some(host.clone());
    ctx.configure(cfg).unwrap();
    assert!(ctx.capture_buffer().unwrap().same_buffer(&host));
    assert!(ctx.config().unwrap().capture_buffer.is_none());

    ctx.draw(1.0).unwrap();
    assert_eq!(host.to_vec().unwrap(), vec![0x42; 16]);
}

#[test]
fn failed_draw_leaves_buffer_and_counters() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(1, 1)).unwrap();
    let host = CaptureBuffer::from_vec(vec![9, 9, 9, 9]);
    ctx.set_capture_buffer(host.clone()).unwrap();

    factory.log().fail_eval = true;
    let err = ctx.draw(0.5).unwrap_err();
    assert_eq!(err.status_code(), status::BACKEND);
    assert_eq!(host.to_vec().unwrap(), vec![9, 9, 9, 9]);
    assert_eq!(ctx.frame_count(), 0);
    assert!(factory.log().pts.is_empty(), "no retry, no present");
}

#[test]
fn presentation_timestamp_follows_config() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(2, 2)).unwrap();
    ctx.draw(0.25).unwrap();

    let mut cfg = Config::offscreen(2, 2);
    cfg.set_surface_pts = true;
    ctx.configure(cfg).unwrap();
    ctx.draw(0.5).unwrap();
    assert_eq!(factory.log().pts, vec![None, Some(0.5)]);
}

#[test]
fn draw_time_must_be_finite() {
    let (mut ctx, _) = fake_context();
    ctx.configure(Config::offscreen(2, 2)).unwrap();
    for t in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = ctx.draw(t).unwrap_err();
        assert_eq!(err.status_code(), status::INVALID_TIME);
    }
    ctx.draw(2.0).unwrap();
    ctx.draw(1.0).unwrap();
    assert_eq!(ctx.frame_count(), 2);
}

#[test]
fn onscreen_resize_reaches_backend_and_unbinds_capture() {
    let (mut ctx, factory) = fake_context();
    let mut cfg = Config::offscreen(4, 4);
    cfg.offscreen = false;
    cfg.window = Some(WindowHandle(1));
    ctx.configure(cfg).unwrap();
    ctx.set_capture_buffer(CaptureBuffer::for_size(4, 4)).unwrap();

    ctx.resize(4, 4).unwrap();
    assert!(factory.log().resized.is_empty());
    assert!(ctx.has_capture_buffer());

    assert!(ctx.resize(0, 4).is_err());
    ctx.resize(8, 6).unwrap();
    assert_eq!(factory.log().resized, vec![(8, 6)]);
    assert_eq!(ctx.size(), Some(SurfaceSize::new(8, 6)));
    assert!(!ctx.has_capture_buffer());
}

#[test]
fn release_is_idempotent_and_final() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(2, 2)).unwrap();
    ctx.release();
    ctx.release();
    assert_eq!(factory.log().released, 1);
    assert_eq!(ctx.state(), ContextState::Released);
    assert_eq!(ctx.draw(0.0).unwrap_err().status_code(), status::RELEASED);
    assert_eq!(
        ctx.configure(Config::offscreen(2, 2))
            .unwrap_err()
            .status_code(),
        status::RELEASED
    );
    drop(ctx);
    assert_eq!(factory.log().released, 1);
}

#[test]
fn drop_releases_backend() {
    let (mut ctx, factory) = fake_context();
    ctx.configure(Config::offscreen(2, 2)).unwrap();
    drop(ctx);
    assert_eq!(factory.log().released, 1);
}
