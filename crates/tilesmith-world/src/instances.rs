use hashbrown::{HashMap, HashSet};
use tilesmith_geom::{Aabb, Vec3};
use tilesmith_io::model_extents;
use tilesmith_terrain::{Instance, ObjectKind, TileIndex};

/// Placed objects by uid.
///
/// Every mutation returns the tiles whose saved object lists are affected:
/// the tiles covered by the old extents plus the ones covered by the new.
#[derive(Clone, Debug, Default)]
pub struct InstanceRegistry {
    instances: HashMap<u32, Instance>,
    next_uid: u32,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, uid: u32) -> Option<&Instance> {
        self.instances.get(&uid)
    }

    /// All instances ordered by uid.
    pub fn sorted(&self) -> Vec<&Instance> {
        let mut out: Vec<&Instance> = self.instances.values().collect();
        out.sort_by_key(|i| i.uid);
        out
    }

    /// Instances whose extents overlap `tile`, ordered by uid.
    pub fn on_tile(&self, tile: TileIndex) -> Vec<Instance> {
        let mut out: Vec<Instance> = self
            .instances
            .values()
            .filter(|i| i.covered_tiles().contains(&tile))
            .cloned()
            .collect();
        out.sort_by_key(|i| i.uid);
        out
    }

    pub fn allocate_uid(&mut self) -> u32 {
        while self.instances.contains_key(&self.next_uid) {
            self.next_uid = self.next_uid.wrapping_add(1);
        }
        let uid = self.next_uid;
        self.next_uid = self.next_uid.wrapping_add(1);
        uid
    }

    /// Registers an instance read from a file. Objects spanning several
    /// tiles are stored in each of them, so a known uid is ignored.
    pub fn insert_loaded(&mut self, instance: Instance) -> bool {
        if self.instances.contains_key(&instance.uid) {
            return false;
        }
        self.next_uid = self.next_uid.max(instance.uid.wrapping_add(1));
        self.instances.insert(instance.uid, instance);
        true
    }

    /// Places a new object under a fresh uid.
    pub fn add(&mut self, mut instance: Instance) -> (u32, Vec<TileIndex>) {
        instance.uid = self.allocate_uid();
        if instance.kind == ObjectKind::Model {
            instance.extents = model_extents(instance.position, instance.scale);
        }
        let uid = instance.uid;
        let tiles = instance.covered_tiles();
        self.instances.insert(uid, instance);
        (uid, tiles)
    }

    pub fn remove(&mut self, uid: u32) -> Option<(Instance, Vec<TileIndex>)> {
        let inst = self.instances.remove(&uid)?;
        let tiles = inst.covered_tiles();
        Some((inst, tiles))
    }

    pub fn move_by(&mut self, uid: u32, delta: Vec3) -> Option<Vec<TileIndex>> {
        self.update(uid, |inst| {
            inst.position += delta;
            inst.extents = Aabb::new(inst.extents.min + delta, inst.extents.max + delta);
        })
    }

    /// Adds `delta` degrees to the rotation. Map object footprints turn with
    /// the yaw component.
    pub fn rotate(&mut self, uid: u32, delta: Vec3) -> Option<Vec<TileIndex>> {
        self.update(uid, |inst| {
            inst.rotation += delta;
            if inst.kind == ObjectKind::MapObject && delta.y != 0.0 {
                inst.extents = yawed_footprint(&inst.extents, inst.position, delta.y);
            }
        })
    }

    pub fn set_scale(&mut self, uid: u32, scale: u16) -> Option<Vec<TileIndex>> {
        self.update(uid, |inst| {
            if inst.kind == ObjectKind::MapObject && inst.scale > 0 && scale > 0 {
                let k = scale as f32 / inst.scale as f32;
                let p = inst.position;
                inst.extents = Aabb::new(p + (inst.extents.min - p) * k, p + (inst.extents.max - p) * k);
            }
            inst.scale = scale;
        })
    }

    fn update(&mut self, uid: u32, f: impl FnOnce(&mut Instance)) -> Option<Vec<TileIndex>> {
        let inst = self.instances.get_mut(&uid)?;
        let mut tiles = inst.covered_tiles();
        f(inst);
        if inst.kind == ObjectKind::Model {
            inst.extents = model_extents(inst.position, inst.scale);
        }
        for t in inst.covered_tiles() {
            if !tiles.contains(&t) {
                tiles.push(t);
            }
        }
        Some(tiles)
    }

    /// Removes every instance that duplicates one with a lower uid.
    /// Returns the removed uids and the affected tiles.
    pub fn delete_duplicates(&mut self) -> (Vec<u32>, Vec<TileIndex>) {
        let ordered: Vec<Instance> = self.sorted().into_iter().cloned().collect();
        let mut removed = Vec::new();
        let mut tiles = HashSet::new();
        for (i, inst) in ordered.iter().enumerate() {
            if removed.contains(&inst.uid) {
                continue;
            }
            for other in &ordered[i + 1..] {
                if !removed.contains(&other.uid) && other.is_duplicate_of(inst) {
                    removed.push(other.uid);
                }
            }
        }
        for uid in &removed {
            if let Some((_, covered)) = self.remove(*uid) {
                tiles.extend(covered);
            }
        }
        (removed, sorted_tiles(tiles))
    }

    /// Removes every instance positioned on `tile`.
    pub fn clear_tile(&mut self, tile: TileIndex) -> (Vec<u32>, Vec<TileIndex>) {
        let mut uids: Vec<u32> = self
            .instances
            .values()
            .filter(|i| TileIndex::from_pos(i.position) == Some(tile))
            .map(|i| i.uid)
            .collect();
        uids.sort_unstable();
        let mut tiles = HashSet::new();
        for uid in &uids {
            if let Some((_, covered)) = self.remove(*uid) {
                tiles.extend(covered);
            }
        }
        (uids, sorted_tiles(tiles))
    }

    /// Drops instances that no longer touch any tile for which `keep` holds.
    pub fn retain_on(&mut self, keep: impl Fn(TileIndex) -> bool) -> usize {
        let before = self.instances.len();
        self.instances
            .retain(|_, inst| inst.covered_tiles().into_iter().any(&keep));
        before - self.instances.len()
    }
}

fn sorted_tiles(tiles: HashSet<TileIndex>) -> Vec<TileIndex> {
    let mut out: Vec<TileIndex> = tiles.into_iter().collect();
    out.sort();
    out
}

fn yawed_footprint(bb: &Aabb, pivot: Vec3, degrees: f32) -> Aabb {
    let (s, c) = degrees.to_radians().sin_cos();
    let corners = [
        (bb.min.x, bb.min.z),
        (bb.max.x, bb.min.z),
        (bb.min.x, bb.max.z),
        (bb.max.x, bb.max.z),
    ];
    let mut out = Aabb::new(
        Vec3::new(f32::INFINITY, bb.min.y, f32::INFINITY),
        Vec3::new(f32::NEG_INFINITY, bb.max.y, f32::NEG_INFINITY),
    );
    for (x, z) in corners {
        let dx = x - pivot.x;
        let dz = z - pivot.z;
        let rx = pivot.x + dx * c - dz * s;
        let rz = pivot.z + dx * s + dz * c;
        out.min.x = out.min.x.min(rx);
        out.max.x = out.max.x.max(rx);
        out.min.z = out.min.z.min(rz);
        out.max.z = out.max.z.max(rz);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesmith_terrain::TILE_SIZE;

    fn model_at(x: f32, z: f32) -> Instance {
        let position = Vec3::new(x, 0.0, z);
        Instance {
            uid: 0,
            kind: ObjectKind::Model,
            filename: "world/generic/bush.m2".into(),
            position,
            rotation: Vec3::ZERO,
            scale: Instance::UNIT_SCALE,
            flags: 0,
            doodad_set: 0,
            name_set: 0,
            extents: model_extents(position, Instance::UNIT_SCALE),
        }
    }

    #[test]
    fn moving_across_a_tile_edge_reports_both_tiles() {
        let mut reg = InstanceRegistry::new();
        let (uid, tiles) = reg.add(model_at(TILE_SIZE * 5.5, TILE_SIZE * 5.5));
        assert_eq!(tiles, vec![TileIndex::new(5, 5)]);
        let touched = reg.move_by(uid, Vec3::new(TILE_SIZE, 0.0, 0.0)).unwrap();
        assert_eq!(touched, vec![TileIndex::new(5, 5), TileIndex::new(6, 5)]);
        assert!(reg.move_by(uid + 1, Vec3::ZERO).is_none());
    }

    #[test]
    fn loaded_uids_are_never_reallocated() {
        let mut reg = InstanceRegistry::new();
        let mut inst = model_at(10.0, 10.0);
        inst.uid = 41;
        assert!(reg.insert_loaded(inst.clone()));
        assert!(!reg.insert_loaded(inst));
        let (uid, _) = reg.add(model_at(20.0, 20.0));
        assert_eq!(uid, 42);
    }

    #[test]
    fn duplicates_keep_the_lowest_uid() {
        let mut reg = InstanceRegistry::new();
        let (a, _) = reg.add(model_at(100.0, 100.0));
        let (b, _) = reg.add(model_at(100.0, 100.0));
        let (c, _) = reg.add(model_at(300.0, 100.0));
        let (removed, tiles) = reg.delete_duplicates();
        assert_eq!(removed, vec![b]);
        assert_eq!(tiles, vec![TileIndex::new(0, 0)]);
        assert!(reg.get(a).is_some() && reg.get(c).is_some());
        assert!(reg.delete_duplicates().0.is_empty());
    }

    #[test]
    fn quarter_turn_swaps_footprint_axes() {
        let bb = Aabb::new(Vec3::new(-10.0, 0.0, -2.0), Vec3::new(10.0, 5.0, 2.0));
        let turned = yawed_footprint(&bb, Vec3::ZERO, 90.0);
        assert!((turned.max.x - 2.0).abs() < 1e-4);
        assert!((turned.max.z - 10.0).abs() < 1e-4);
        assert_eq!(turned.max.y, 5.0);
    }
}
