use tilesmith_geom::Vec3;
use tilesmith_terrain::LiquidPaint;

use crate::context::EditContext;

impl EditContext<'_> {
    pub fn paint_liquid(&mut self, paint: &LiquidPaint) -> bool {
        let keys = self.chunks_in_range(paint.pos, paint.radius);
        let changed = self.apply(&keys, |c| c.paint_liquid(paint));
        self.commit(&changed, false)
    }

    /// Sets the liquid type of `layer` on every chunk of the tile.
    pub fn set_liquid_type(&mut self, pos: Vec3, layer: usize, liquid_id: u16) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.liquid.set_liquid_type(layer, liquid_id));
        self.commit(&changed, false)
    }

    pub fn liquid_type(&mut self, pos: Vec3, layer: usize) -> Option<u16> {
        let key = self.chunk_at(pos)?;
        self.index.chunk(key)?.liquid.liquid_type(layer)
    }

    /// Derives liquid depth from the height above ground across the tile.
    pub fn auto_gen_liquid_depth(&mut self, pos: Vec3) -> bool {
        let factor = self.settings.liquid_depth_factor;
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.auto_gen_liquid_depth(factor));
        self.commit(&changed, false)
    }

    /// Hides liquid cells buried under the terrain across the tile.
    pub fn crop_liquid(&mut self, pos: Vec3) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.crop_liquid());
        self.commit(&changed, false)
    }
}
