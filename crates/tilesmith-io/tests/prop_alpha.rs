use proptest::prelude::*;
use tilesmith_io::alpha::{AlphaFormat, decode, encode};
use tilesmith_terrain::{ALPHA_SIZE, AlphaMap};

fn blocky_map() -> impl Strategy<Value = AlphaMap> {
    prop::collection::vec((0u8..=255, 1usize..200), 1..64).prop_map(|runs| {
        let mut values = Vec::with_capacity(ALPHA_SIZE * ALPHA_SIZE);
        for (v, n) in runs.iter().cycle() {
            if values.len() == ALPHA_SIZE * ALPHA_SIZE {
                break;
            }
            let take = (*n).min(ALPHA_SIZE * ALPHA_SIZE - values.len());
            values.extend(std::iter::repeat_n(*v, take));
        }
        AlphaMap::from_slice(&values).unwrap()
    })
}

fn nibble_map() -> impl Strategy<Value = AlphaMap> {
    prop::collection::vec(0u8..16, ALPHA_SIZE * ALPHA_SIZE).prop_map(|n| {
        let v: Vec<u8> = n.into_iter().map(|n| n * 17).collect();
        AlphaMap::from_slice(&v).unwrap()
    })
}

proptest! {
    #[test]
    fn run_length_restores_any_map(map in blocky_map()) {
        let bytes = encode(&map, AlphaFormat::Rle8);
        let (back, used) = decode(&bytes, AlphaFormat::Rle8, false).unwrap();
        prop_assert_eq!(used, bytes.len());
        prop_assert_eq!(back, map);
    }

    // 4-bit weights survive small -> big -> small exactly.
    #[test]
    fn nibble_weights_are_exact(map in nibble_map()) {
        let packed = encode(&map, AlphaFormat::Packed4);
        let (big, _) = decode(&packed, AlphaFormat::Packed4, false).unwrap();
        prop_assert_eq!(&big, &map);
        let raw = encode(&big, AlphaFormat::Raw8);
        let (again, _) = decode(&raw, AlphaFormat::Raw8, false).unwrap();
        prop_assert_eq!(encode(&again, AlphaFormat::Packed4), packed);
    }
}
