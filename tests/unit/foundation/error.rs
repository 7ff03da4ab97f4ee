use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        NglError::from(ConfigError::MissingWindow)
            .to_string()
            .contains("config error:")
    );
    assert!(
        NglError::from(StateError::OffscreenResize)
            .to_string()
            .contains("state error:")
    );
    assert!(
        NglError::from(BackendError::failed("x"))
            .to_string()
            .contains("backend error:")
    );
    let parse = ParseError::new(3, 7, ParseErrorKind::UnknownNodeType("Nope".to_string()));
    assert!(NglError::from(parse).to_string().contains("line 3, column 7"));
}

#[test]
fn status_codes_are_distinct_per_kind() {
    let codes = [
        ParseError::new(1, 1, ParseErrorKind::UnknownNodeType("X".into())).status_code(),
        ParseError::new(
            1,
            1,
            ParseErrorKind::UnknownParameter {
                node_type: "Quad",
                param: "x".into(),
            },
        )
        .status_code(),
        ParseError::new(
            1,
            1,
            ParseErrorKind::DanglingOrForwardReference {
                param: "texture".into(),
                distance: 4,
                declared: 1,
            },
        )
        .status_code(),
        ParseError::new(1, 1, ParseErrorKind::MalformedMetadata("x".into())).status_code(),
        NglError::from(ConfigError::MissingWindow).status_code(),
        NglError::from(ConfigError::UnsupportedBackend(BackendKind::Vulkan)).status_code(),
        NglError::from(StateError::Released { op: "draw" }).status_code(),
        NglError::from(StateError::NotConfigured { op: "draw" }).status_code(),
        NglError::from(CaptureError::CapacityMismatch {
            expected: 4,
            actual: 3,
        })
        .status_code(),
        NglError::from(BackendError::failed("x")).status_code(),
        NglError::InvalidTime(f64::NAN).status_code(),
        NglError::from(EvalError::PlanTooLarge {
            node: NodeIndex(2),
            ops: 10,
            limit: 8,
        })
        .status_code(),
    ];
    for (i, a) in codes.iter().enumerate() {
        assert_ne!(*a, status::OK);
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn backend_other_preserves_source() {
    let base = std::io::Error::other("device lost");
    let err = NglError::from(BackendError::Other(anyhow::Error::new(base)));
    assert!(err.to_string().contains("device lost"));
}
