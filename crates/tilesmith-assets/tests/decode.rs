use byteorder::{LittleEndian, WriteBytesExt};
use tilesmith_assets::blp::{HEADER_LEN, PALETTE_LEN};
use tilesmith_assets::{AssetCache, AssetError, AssetLoader, DirectoryAssetLoader, blp};

/// Builds a BLP2 file whose mip payloads follow the header back to back.
fn blp_file(compression: u8, alpha_depth: u8, alpha_type: u8, w: u32, h: u32, palette: Option<&[u8]>, mips: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"BLP2");
    out.write_u32::<LittleEndian>(1).unwrap();
    out.extend_from_slice(&[compression, alpha_depth, alpha_type, (mips.len() > 1) as u8]);
    out.write_u32::<LittleEndian>(w).unwrap();
    out.write_u32::<LittleEndian>(h).unwrap();
    let mut offset = (HEADER_LEN + PALETTE_LEN) as u32;
    let mut offsets = [0u32; 16];
    let mut sizes = [0u32; 16];
    for (i, m) in mips.iter().enumerate() {
        offsets[i] = offset;
        sizes[i] = m.len() as u32;
        offset += m.len() as u32;
    }
    for v in offsets.iter().chain(sizes.iter()) {
        out.write_u32::<LittleEndian>(*v).unwrap();
    }
    assert_eq!(out.len(), HEADER_LEN);
    let mut pal = vec![0u8; PALETTE_LEN];
    if let Some(p) = palette {
        pal[..p.len()].copy_from_slice(p);
    }
    out.extend_from_slice(&pal);
    for m in mips {
        out.extend_from_slice(m);
    }
    out
}

#[test]
fn palette_with_one_bit_alpha_and_mips() {
    // Entry 0 is blue, entry 1 is red; stored as BGRA.
    let palette = [255, 0, 0, 0, 0, 0, 255, 0];
    let top = {
        let mut m = vec![0, 1, 1, 0, 1, 1, 1, 1];
        m.push(0b1111_0101);
        m
    };
    let small = vec![1, 0, 0b0000_0011];
    let data = blp_file(1, 1, 0, 4, 2, Some(&palette), &[top, small]);
    let tex = blp::decode(&data).unwrap();
    assert_eq!((tex.width, tex.height), (4, 2));
    assert_eq!(tex.mips.len(), 2);
    assert_eq!(tex.pixel(0, 0), [0, 0, 255, 255]);
    assert_eq!(tex.pixel(1, 0), [255, 0, 0, 0]);
    assert_eq!(tex.pixel(2, 0), [255, 0, 0, 255]);
    assert_eq!(tex.pixel(3, 1), [255, 0, 0, 255]);
    assert_eq!((tex.mips[1].width, tex.mips[1].height), (2, 1));
    assert_eq!(&tex.mips[1].rgba[..4], &[255, 0, 0, 255]);
}

#[test]
fn dxt1_block_with_punch_through() {
    // c0 is blue, c1 is red; c0 <= c1 selects three-colour mode.
    let c0: u16 = 0x001f;
    let c1: u16 = 0xf800;
    let mut block = Vec::new();
    block.write_u16::<LittleEndian>(c0).unwrap();
    block.write_u16::<LittleEndian>(c1).unwrap();
    // Row 0: indices 0,1,2,3; other rows 0.
    block.write_u32::<LittleEndian>(0b11_10_01_00).unwrap();
    let data = blp_file(2, 1, 0, 4, 4, None, &[block]);
    let tex = blp::decode(&data).unwrap();
    assert_eq!(tex.pixel(0, 0), [0, 0, 255, 255]);
    assert_eq!(tex.pixel(1, 0), [255, 0, 0, 255]);
    assert_eq!(tex.pixel(2, 0), [127, 0, 127, 255]);
    assert_eq!(tex.pixel(3, 0)[3], 0);
    assert_eq!(tex.pixel(3, 3), [0, 0, 255, 255]);
}

#[test]
fn dxt5_interpolates_alpha() {
    let mut block = vec![255u8, 0];
    // Alpha indices: pixel 0 -> 0 (255), pixel 1 -> 1 (0), rest 0.
    let bits: u64 = 1 << 3;
    block.extend_from_slice(&bits.to_le_bytes()[..6]);
    block.write_u16::<LittleEndian>(0xffff).unwrap();
    block.write_u16::<LittleEndian>(0x0000).unwrap();
    block.write_u32::<LittleEndian>(0).unwrap();
    let data = blp_file(2, 8, 7, 4, 4, None, &[block]);
    let tex = blp::decode(&data).unwrap();
    assert_eq!(tex.pixel(0, 0), [255, 255, 255, 255]);
    assert_eq!(tex.pixel(1, 0), [255, 255, 255, 0]);
}

#[test]
fn raw_pixels_are_swizzled_and_truncation_is_reported() {
    let data = blp_file(3, 8, 8, 1, 1, None, &[vec![10, 20, 30, 40]]);
    assert_eq!(blp::decode(&data).unwrap().pixel(0, 0), [30, 20, 10, 40]);

    let mut short = blp_file(3, 8, 8, 2, 2, None, &[vec![0; 16]]);
    short.truncate(short.len() - 1);
    assert!(matches!(blp::decode(&short), Err(AssetError::Overrun { .. })));
}

#[test]
fn directory_loader_feeds_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let tileset = dir.path().join("tileset/elwynn");
    std::fs::create_dir_all(&tileset).unwrap();
    std::fs::write(
        tileset.join("grass.blp"),
        blp_file(3, 8, 8, 1, 1, None, &[vec![1, 2, 3, 4]]),
    )
    .unwrap();
    std::fs::write(tileset.join("broken.blp"), b"BLP2").unwrap();

    let loader = DirectoryAssetLoader::new(dir.path());
    assert!(loader.decode_texture("Tileset\\Elwynn\\Grass.blp").is_ok());

    let mut cache = AssetCache::new(Box::new(loader));
    assert_eq!(cache.texture("TILESET\\ELWYNN\\GRASS.BLP").pixel(0, 0), [3, 2, 1, 4]);
    cache.texture("tileset/elwynn/broken.blp");
    cache.texture("tileset/elwynn/absent.blp");
    assert!(!cache.is_placeholder("tileset/elwynn/grass.blp"));
    assert!(cache.is_placeholder("tileset/elwynn/broken.blp"));
    assert_eq!(cache.placeholder_count(), 2);
}
