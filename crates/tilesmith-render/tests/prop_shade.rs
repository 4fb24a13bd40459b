use proptest::prelude::*;
use tilesmith_geom::Vec3;
use tilesmith_render::shade::{contour_alpha_xz, smoothstep, texture_blend};

fn unit() -> impl Strategy<Value = f32> {
    0.0f32..=1.0
}

/// Three layer alphas whose sum stays within one, as painting keeps them.
fn normalized_alpha() -> impl Strategy<Value = [f32; 3]> {
    (unit(), unit(), unit()).prop_map(|(a, b, c)| {
        let sum = a + b + c;
        if sum > 1.0 { [a / sum, b / sum, c / sum] } else { [a, b, c] }
    })
}

proptest! {
    #[test]
    fn same_colour_everywhere_blends_to_itself(
        rgb in (unit(), unit(), unit()),
        alpha in normalized_alpha(),
        layers in 1usize..=4,
    ) {
        let c = [rgb.0, rgb.1, rgb.2];
        let out = texture_blend(layers, &[c; 4], &alpha);
        for ch in 0..3 {
            prop_assert!((out[ch] - c[ch]).abs() < 1e-4, "{:?} vs {:?}", out, c);
        }
        prop_assert_eq!(out[3], 1.0);
    }

    #[test]
    fn blend_stays_in_gamut(
        colours in proptest::array::uniform4((unit(), unit(), unit())),
        alpha in normalized_alpha(),
        layers in 0usize..=4,
    ) {
        let layer_colours = colours.map(|(r, g, b)| [r, g, b]);
        let out = texture_blend(layers, &layer_colours, &alpha);
        prop_assert!(out.iter().all(|v| (-1e-5..=1.0 + 1e-5).contains(v)), "{:?}", out);
    }

    #[test]
    fn unused_layers_have_no_weight(alpha in normalized_alpha()) {
        let mut colours = [[0.0; 3]; 4];
        colours[1] = [1.0, 1.0, 1.0];
        colours[2] = [1.0, 1.0, 1.0];
        colours[3] = [1.0, 1.0, 1.0];
        prop_assert_eq!(texture_blend(1, &colours, &alpha), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn smoothstep_is_monotonic_and_bounded(e0 in -10.0f32..10.0, span in 0.01f32..10.0, a in -30.0f32..30.0, b in -30.0f32..30.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (s_lo, s_hi) = (smoothstep(e0, e0 + span, lo), smoothstep(e0, e0 + span, hi));
        prop_assert!((0.0..=1.0).contains(&s_lo) && (0.0..=1.0).contains(&s_hi));
        prop_assert!(s_lo <= s_hi + 1e-6);
    }

    #[test]
    fn contour_coverage_is_a_fraction(x in -2000.0f32..2000.0, z in -2000.0f32..2000.0, w in 0.01f32..2.0) {
        let c = contour_alpha_xz(4.0, Vec3::new(x, 0.0, z), Vec3::new(w, 0.0, w));
        prop_assert!((0.0..=1.0).contains(&c));
    }
}
