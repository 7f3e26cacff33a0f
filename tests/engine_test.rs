//! Single-shot entry point and cross-cutting engine behavior.

mod common;

use pretty_assertions::assert_eq;

use ditherlab::{
    dither_once, Adjustments, Algorithm, BackendSet, ColorMode, EngineError, MaskRegion,
    MultiToneVariant, PaletteColor, PatternKind, RenderOptions,
};

use common::gradient_source;

fn all_algorithms() -> Vec<Algorithm> {
    vec![
        Algorithm::ordered(),
        Algorithm::floyd_steinberg(),
        Algorithm::atkinson(),
        Algorithm::JarvisJudiceNinke { threshold: 128 },
        Algorithm::Stucki { threshold: 128 },
        Algorithm::Burkes { threshold: 128 },
        Algorithm::SierraLite { threshold: 128 },
        Algorithm::Random {
            threshold: 128,
            noise_amplitude: 128.0,
        },
        Algorithm::BlueNoise { threshold: 128 },
        Algorithm::VoidAndCluster,
        Algorithm::Riemersma { threshold: 128 },
        Algorithm::DirectBinarySearch { threshold: 128 },
        Algorithm::halftone(),
        Algorithm::pattern(PatternKind::Waves),
        Algorithm::MultiTone {
            levels: 3,
            variant: MultiToneVariant::Ordered,
            dot_size: 4,
        },
    ]
}

#[test]
fn test_dither_once_every_algorithm() {
    let backends = BackendSet::scalar_only();
    let source = gradient_source(16, 16);

    for algorithm in all_algorithms() {
        let label = algorithm.label();
        let image = dither_once(&backends, &source, 16, 16, &RenderOptions::new(algorithm))
            .unwrap_or_else(|e| panic!("{label} failed: {e}"));
        assert_eq!(image.width(), 16);
        assert_eq!(image.height(), 16);
        assert_eq!(image.pixels().len(), 16 * 16 * 4);
        assert!(
            image.pixels().chunks_exact(4).all(|px| px[3] == 255),
            "{label}: alpha must be opaque"
        );
    }
}

#[test]
fn test_dither_once_rgb_mode() {
    let backends = BackendSet::scalar_only();
    let source = gradient_source(16, 16);
    let options = RenderOptions {
        algorithm: Algorithm::ordered(),
        color_mode: ColorMode::Rgb,
        adjustments: Adjustments::default(),
    };
    let image = dither_once(&backends, &source, 16, 16, &options).unwrap();
    for px in image.pixels().chunks_exact(4) {
        for &channel in &px[..3] {
            assert!(channel == 0 || channel == 255, "channels dither binary");
        }
    }
}

#[test]
fn test_dither_once_custom_palette() {
    let backends = BackendSet::scalar_only();
    let source = gradient_source(16, 16);
    let colors = vec![
        PaletteColor::from_hex("#102030").unwrap(),
        PaletteColor::from_hex("#e0d0c0").unwrap(),
    ];
    let options = RenderOptions {
        algorithm: Algorithm::atkinson(),
        color_mode: ColorMode::Custom {
            colors: colors.clone(),
        },
        adjustments: Adjustments::default(),
    };
    let image = dither_once(&backends, &source, 16, 16, &options).unwrap();
    for px in image.pixels().chunks_exact(4) {
        let c = PaletteColor {
            r: px[0],
            g: px[1],
            b: px[2],
        };
        assert!(colors.contains(&c), "{c:?} is not a palette entry");
    }
}

#[test]
fn test_no_backend_at_all() {
    let backends = BackendSet::new(Vec::new());
    let source = gradient_source(8, 8);
    let err = dither_once(&backends, &source, 8, 8, &RenderOptions::default()).unwrap_err();
    assert!(matches!(err, EngineError::NoSupportingBackend { .. }));
}

#[test]
fn test_selective_composition_through_core() {
    // The compositor is pure core functionality; drive it end to end the
    // way a host would, with engine types.
    let source = gradient_source(16, 16);
    let gray = dither_core::intensity::rgba_to_gray(&source);

    let mut mask = vec![0u8; 16 * 16];
    mask[..16 * 8].fill(255); // top half

    let out = dither_core::selective_dither(
        &gray,
        16,
        16,
        &[MaskRegion::new(mask, Algorithm::halftone())],
        &Algorithm::ordered(),
    );

    let halftone = dither_core::dither(&gray, 16, 16, &Algorithm::halftone());
    let ordered = dither_core::dither(&gray, 16, 16, &Algorithm::ordered());
    assert_eq!(&out[..16 * 8 * 4], &halftone[..16 * 8 * 4]);
    assert_eq!(&out[16 * 8 * 4..], &ordered[16 * 8 * 4..]);
}

#[test]
fn test_render_options_serde_round_trip() {
    let options = RenderOptions {
        algorithm: Algorithm::Halftone {
            dot_size: 5,
            spacing: 7,
            angle: 22.5,
        },
        color_mode: ColorMode::Custom {
            colors: vec![PaletteColor::BLACK, PaletteColor::WHITE],
        },
        adjustments: Adjustments {
            brightness: 10.0,
            gamma: 1.4,
            ..Default::default()
        },
    };
    let json = serde_json::to_string(&options).unwrap();
    let back: RenderOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(options, back);
}
