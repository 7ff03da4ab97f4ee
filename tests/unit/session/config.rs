use super::*;
use crate::render::backend::DefaultBackendFactory;

fn check(cfg: &Config) -> Result<(), ConfigError> {
    cfg.validate(&DefaultBackendFactory::default())
}

#[test]
fn offscreen_defaults_are_valid() {
    assert_eq!(check(&Config::offscreen(256, 256)), Ok(()));
}

#[test]
fn offscreen_needs_dimensions() {
    assert_eq!(
        check(&Config::offscreen(0, 16)),
        Err(ConfigError::InvalidDimensions {
            width: 0,
            height: 16
        })
    );
}

#[test]
fn window_rules() {
    let mut cfg = Config::offscreen(4, 4);
    cfg.window = Some(WindowHandle(0xdead));
    assert_eq!(check(&cfg), Err(ConfigError::UnexpectedWindow));

    cfg.offscreen = false;
    assert_eq!(check(&cfg), Ok(()));

    cfg.window = None;
    assert_eq!(check(&cfg), Err(ConfigError::MissingWindow));
}

#[test]
fn field_ranges() {
    let mut cfg = Config::offscreen(4, 4);
    cfg.samples = 3;
    assert_eq!(check(&cfg), Err(ConfigError::InvalidSamples(3)));

    let mut cfg = Config::offscreen(4, 4);
    cfg.clear_color = [0.0, 1.5, 0.0, 1.0];
    assert!(matches!(check(&cfg), Err(ConfigError::InvalidClearColor(_))));
    cfg.clear_color = [f32::NAN, 0.0, 0.0, 1.0];
    assert!(matches!(check(&cfg), Err(ConfigError::InvalidClearColor(_))));

    let mut cfg = Config::offscreen(4, 4);
    cfg.hud_scale = 0;
    assert_eq!(check(&cfg), Err(ConfigError::InvalidHudScale(0)));
}

#[test]
fn gpu_selectors_need_a_supporting_factory() {
    let mut cfg = Config::offscreen(4, 4);
    cfg.backend = BackendKind::OpenGLES;
    assert_eq!(
        check(&cfg),
        Err(ConfigError::UnsupportedBackend(BackendKind::OpenGLES))
    );
}

#[test]
fn loads_from_json_with_defaults() {
    let cfg: Config = serde_json::from_str(
        r#"{ "width": 320, "height": 240, "clear_color": [1, 1, 0, 1], "backend": "auto" }"#,
    )
    .unwrap();
    assert_eq!(cfg.size(), SurfaceSize::new(320, 240));
    assert!(cfg.offscreen);
    assert_eq!(cfg.hud_scale, 1);
    assert_eq!(cfg.clear_color, [1.0, 1.0, 0.0, 1.0]);

    let bad = serde_json::from_str::<Config>(r#"{ "widht": 3 }"#);
    assert!(bad.is_err());
}
