use super::*;
use crate::foundation::error::status;

const MEDIA_SCENE: &str = "
    # Nope.GL v0.11.0
    # duration=403Z9000000000000
    # aspect_ratio=320/240
    # framerate=60/1
    Mdia filename:content://org.example.provider/medias/cat.mp4
    Tex2 data_src:1
    Quad
    Rtex texture:2 geometry:1
";

fn err_kind(text: &str) -> ParseErrorKind {
    parse(text).unwrap_err().kind
}

#[test]
fn media_scene_resolves_relative_references() {
    let scene = parse(MEDIA_SCENE).unwrap();
    assert_eq!(scene.len(), 4);

    let kinds: Vec<_> = scene.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Media,
            NodeKind::Texture2D,
            NodeKind::Quad,
            NodeKind::RenderTexture
        ]
    );

    assert_eq!(scene.nodes()[1].reference("data_src"), Some(NodeIndex(1)));
    assert_eq!(scene.nodes()[3].reference("texture"), Some(NodeIndex(2)));
    assert_eq!(scene.nodes()[3].reference("geometry"), Some(NodeIndex(3)));
    assert_eq!(
        scene.nodes()[0].str("filename"),
        Some("content://org.example.provider/medias/cat.mp4")
    );
}

#[test]
fn media_scene_metadata() {
    let scene = parse(MEDIA_SCENE).unwrap();
    let meta = scene.meta();
    assert_eq!(meta.version.as_deref(), Some("0.11.0"));
    assert_eq!(meta.duration, Some(25.0));
    assert_eq!(meta.aspect_ratio, Rational::new(320, 240));
    assert_eq!(meta.framerate, Rational::new(60, 1));
}

#[test]
fn indices_follow_declaration_order() {
    let scene = parse("Quad\nQuad\n\nQuad\nRclr geometry:2\n").unwrap();
    for (i, node) in scene.nodes().iter().enumerate() {
        assert_eq!(node.index, NodeIndex(i as u32 + 1));
    }
    for node in scene.nodes() {
        for (_, r) in node.references() {
            assert!(r.target < node.index);
        }
    }
    assert_eq!(scene.nodes()[3].reference("geometry"), Some(NodeIndex(2)));
}

#[test]
fn self_and_forward_references_are_rejected() {
    assert!(matches!(
        err_kind("Tex2\nRtex texture:0"),
        ParseErrorKind::DanglingOrForwardReference { distance: 0, .. }
    ));
    assert!(matches!(
        err_kind("Tex2\nRtex texture:2"),
        ParseErrorKind::DanglingOrForwardReference {
            distance: 2,
            declared: 1,
            ..
        }
    ));
    assert!(matches!(
        err_kind("Tex2\nRtex texture:-1"),
        ParseErrorKind::DanglingOrForwardReference { .. }
    ));
}

#[test]
fn unknown_type_is_located() {
    let e = parse("# framerate=30/1\n  Mdia filename:a.png\n  Nope x:1").unwrap_err();
    assert_eq!(e.line, 3);
    assert_eq!(e.column, 3);
    assert_eq!(e.kind, ParseErrorKind::UnknownNodeType("Nope".to_owned()));
    assert_eq!(e.status_code(), status::UNKNOWN_NODE_TYPE);
}

#[test]
fn unknown_parameter_is_located() {
    let e = parse("Quad corner:0,0,0 bogus:1").unwrap_err();
    assert_eq!((e.line, e.column), (1, 19));
    assert!(matches!(e.kind, ParseErrorKind::UnknownParameter { .. }));
}

#[test]
fn bare_integer_is_literal_for_numeric_slots() {
    let scene = parse("Tex2 width:1 height:2").unwrap();
    assert_eq!(scene.nodes()[0].int("width"), 1);
    assert_eq!(scene.nodes()[0].int("height"), 2);
    assert_eq!(scene.nodes()[0].reference("data_src"), None);
}

#[test]
fn reference_kind_is_checked() {
    assert!(matches!(
        err_kind("Quad\nRtex texture:1"),
        ParseErrorKind::ReferenceTypeMismatch {
            found: "Quad",
            ..
        }
    ));
}

#[test]
fn required_and_duplicate_parameters() {
    assert_eq!(
        err_kind("Rtex"),
        ParseErrorKind::MissingParameter {
            node_type: "RenderTexture",
            param: "texture"
        }
    );
    assert_eq!(
        err_kind("Quad corner:0,0,0 corner:1,1,1"),
        ParseErrorKind::DuplicateParameter("corner".to_owned())
    );
}

#[test]
fn metadata_after_nodes_is_rejected() {
    let e = parse("Quad\n# framerate=60/1").unwrap_err();
    assert_eq!(e.line, 2);
    assert!(matches!(e.kind, ParseErrorKind::MalformedMetadata(_)));
}

#[test]
fn malformed_metadata_values() {
    assert!(matches!(
        err_kind("# framerate=60"),
        ParseErrorKind::MalformedMetadata(_)
    ));
    assert!(matches!(
        err_kind("# aspect_ratio=4/0"),
        ParseErrorKind::MalformedMetadata(_)
    ));
    assert!(matches!(
        err_kind("# duration=abc"),
        ParseErrorKind::MalformedMetadata(_)
    ));
    assert!(parse("# author=someone\nQuad").is_ok());
}

#[test]
fn literal_decoding() {
    let scene = parse(concat!(
        "Mdia filename:my%20clip.png audio_tex:0\n",
        "Quad corner:-1,-1,0 width:2,0,0 height:0,2,0\n",
        "Rclr color:1,0,0 opacity:3FEZ0000000000000 geometry:1\n",
        "Mdia filename:\"quoted name.png\"\n",
    ))
    .unwrap();
    assert_eq!(scene.nodes()[0].str("filename"), Some("my clip.png"));
    assert!(!scene.nodes()[0].bool("audio_tex"));
    assert_eq!(scene.nodes()[1].vec::<3>("corner"), [-1.0, -1.0, 0.0]);
    assert_eq!(scene.nodes()[2].float("opacity"), 0.5);
    assert_eq!(scene.nodes()[2].vec::<3>("color"), [1.0, 0.0, 0.0]);
    assert_eq!(scene.nodes()[3].str("filename"), Some("quoted name.png"));
}

#[test]
fn malformed_literals() {
    assert!(matches!(
        err_kind("Quad corner:1,2"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    assert!(matches!(
        err_kind("Tex2 width:wide"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    assert!(matches!(
        err_kind("Mdia filename:a audio_tex:maybe"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    assert!(matches!(
        err_kind("Tex2 width:\"3\""),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    assert!(matches!(
        err_kind("Mdia filename:bad%zz"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
}

#[test]
fn vector_components_must_fit_single_precision() {
    assert!(matches!(
        err_kind("Quad corner:1e300,0,0"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    assert!(matches!(
        err_kind("Rclr color:1,-1e39,0"),
        ParseErrorKind::MalformedLiteral { .. }
    ));
    let scene = parse("Quad corner:3.0e38,0,0").unwrap();
    let x = scene.nodes()[0].vec::<3>("corner")[0];
    assert!(x.is_finite() && x > 2.9e38);
}

#[test]
fn percent_escapes_need_two_hex_digits() {
    for bad in ["Mdia filename:bad%+1", "Mdia filename:bad%-1", "Mdia filename:bad%1"] {
        assert!(
            matches!(err_kind(bad), ParseErrorKind::MalformedLiteral { .. }),
            "{bad}"
        );
    }
    let scene = parse("Mdia filename:a%2Bb%2f").unwrap();
    assert_eq!(scene.nodes()[0].str("filename"), Some("a+b/"));
}

#[test]
fn group_children_reference_list() {
    let scene = parse("Rclr\nRclr color:0,1,0\nGrup children:2,1").unwrap();
    let targets: Vec<_> = scene.nodes()[2]
        .reference_list("children")
        .iter()
        .map(|r| r.target)
        .collect();
    assert_eq!(targets, vec![NodeIndex(1), NodeIndex(2)]);
}

#[test]
fn long_type_names_are_accepted() {
    let scene = parse("Quad\nRenderColor geometry:1").unwrap();
    assert_eq!(scene.root().map(|n| n.kind), Some(NodeKind::RenderColor));
}

#[test]
fn empty_text_is_an_empty_scene() {
    let scene = parse("\n   \n# Nope.GL v1.0\n").unwrap();
    assert!(scene.is_empty());
    assert!(scene.root().is_none());
}
