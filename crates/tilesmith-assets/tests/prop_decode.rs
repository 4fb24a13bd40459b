use proptest::prelude::*;
use tilesmith_assets::{blp, m2};

fn blp_prefixed(rest: Vec<u8>) -> Vec<u8> {
    let mut data = b"BLP2".to_vec();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend(rest);
    data
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn texture_decode_never_panics(rest in proptest::collection::vec(any::<u8>(), 0..2048)) {
        if let Ok(tex) = blp::decode(&blp_prefixed(rest)) {
            prop_assert!(!tex.mips.is_empty());
            for mip in &tex.mips {
                prop_assert_eq!(mip.rgba.len(), mip.width as usize * mip.height as usize * 4);
            }
        }
    }

    #[test]
    fn small_headers_with_garbage_mips_decode_or_fail_cleanly(
        compression in 1u8..=3,
        alpha_depth in prop::sample::select(vec![0u8, 1, 4, 8]),
        alpha_type in 0u8..4,
        w in 1u32..16,
        h in 1u32..16,
        body in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let mut rest = vec![compression, alpha_depth, alpha_type, 0];
        rest.extend_from_slice(&w.to_le_bytes());
        rest.extend_from_slice(&h.to_le_bytes());
        let payload = (blp::HEADER_LEN + blp::PALETTE_LEN) as u32;
        rest.extend_from_slice(&payload.to_le_bytes());
        rest.extend_from_slice(&[0u8; 15 * 4]);
        rest.extend_from_slice(&(body.len() as u32).to_le_bytes());
        rest.extend_from_slice(&[0u8; 15 * 4]);
        rest.resize(blp::HEADER_LEN + blp::PALETTE_LEN - 8, 0);
        rest.extend(body);
        if let Ok(tex) = blp::decode(&blp_prefixed(rest)) {
            prop_assert_eq!(tex.width, w);
            prop_assert_eq!(tex.mips[0].rgba.len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn model_decode_never_panics(version in 256u32..=274, rest in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut data = m2::MAGIC.to_vec();
        data.extend_from_slice(&version.to_le_bytes());
        data.extend(rest);
        if let Ok(model) = m2::decode(&data) {
            prop_assert_eq!(model.positions.len(), model.normals.len());
            prop_assert_eq!(model.positions.len(), model.uvs.len());
        }
    }
}
