use tilesmith_geom::Vec3;
use tilesmith_terrain::chunk::{inner_index, outer_index, vertex_offset};
use tilesmith_terrain::liquid::{LIQUID_CELLS, LIQUID_VERTS};
use tilesmith_terrain::{Chunk, LiquidLayer, MAP_VERTICES, UNIT_SIZE};

/// Flat vertex arrays in the layout the GPU backend uploads.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    /// Detail texture coordinates, repeating once per unit.
    pub uv: Vec<f32>,
    /// Alpha map coordinates, 0..1 across the chunk.
    pub uv2: Vec<f32>,
    pub idx: Vec<u16>,
    pub col: Vec<u8>,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across frames.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.uv2.clear();
        self.idx.clear();
        self.col.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    fn push_vertex(&mut self, p: Vec3, n: Vec3, uv: (f32, f32), uv2: (f32, f32), rgba: [u8; 4]) {
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.norm.extend_from_slice(&[n.x, n.y, n.z]);
        self.uv.extend_from_slice(&[uv.0, uv.1]);
        self.uv2.extend_from_slice(&[uv2.0, uv2.1]);
        self.col.extend_from_slice(&rgba);
    }

    pub fn triangle_normal(&self, t: usize) -> Vec3 {
        let v = |k: usize| {
            let i = self.idx[t * 3 + k] as usize * 3;
            Vec3::new(self.pos[i], self.pos[i + 1], self.pos[i + 2])
        };
        let (a, b, c) = (v(0), v(1), v(2));
        (b - a).cross(c - a).normalized()
    }
}

/// Four triangles per quad around its inner vertex; quads under a hole are
/// left out.
pub fn build_chunk_mesh(chunk: &Chunk) -> MeshBuild {
    let mut mesh = MeshBuild::default();
    build_chunk_mesh_into(chunk, &mut mesh);
    mesh
}

pub fn build_chunk_mesh_into(chunk: &Chunk, mesh: &mut MeshBuild) {
    mesh.clear_keep_capacity();
    let colors = chunk.colors();
    let normals = chunk.normals();
    for i in 0..MAP_VERTICES {
        let (u, v) = vertex_offset(i);
        // Raw file bytes; the shader scales 127 back to 1.0.
        let mccv = colors[i];
        mesh.push_vertex(
            chunk.vertex_position(i),
            normals[i],
            (u, v),
            (u / 8.0, v / 8.0),
            [mccv.r, mccv.g, mccv.b, 255],
        );
    }
    for row in 0..8 {
        for col in 0..8 {
            let bit = 1u16 << ((row / 2) * 4 + col / 2);
            if chunk.holes & bit != 0 {
                continue;
            }
            let tl = outer_index(row, col) as u16;
            let tr = outer_index(row, col + 1) as u16;
            let bl = outer_index(row + 1, col) as u16;
            let br = outer_index(row + 1, col + 1) as u16;
            let c = inner_index(row, col) as u16;
            mesh.idx.extend_from_slice(&[c, tr, tl, c, br, tr, c, bl, br, c, tl, bl]);
        }
    }
}

/// Two triangles per visible liquid cell.
pub fn build_liquid_mesh(chunk: &Chunk, layer: &LiquidLayer) -> MeshBuild {
    let mut mesh = MeshBuild::default();
    for row in 0..LIQUID_VERTS {
        for col in 0..LIQUID_VERTS {
            let p = Vec3::new(
                chunk.xbase + col as f32 * UNIT_SIZE,
                layer.height(row, col),
                chunk.zbase + row as f32 * UNIT_SIZE,
            );
            let depth = layer.depths[row * LIQUID_VERTS + col];
            mesh.push_vertex(
                p,
                Vec3::UP,
                (col as f32, row as f32),
                (col as f32 / 8.0, row as f32 / 8.0),
                [255, 255, 255, depth],
            );
        }
    }
    for row in 0..LIQUID_CELLS {
        for col in 0..LIQUID_CELLS {
            if !layer.cell(row, col) {
                continue;
            }
            let tl = (row * LIQUID_VERTS + col) as u16;
            let tr = tl + 1;
            let bl = tl + LIQUID_VERTS as u16;
            let br = bl + 1;
            mesh.idx.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
        }
    }
    mesh
}
