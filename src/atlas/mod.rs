//! Glyph atlas allocator
//!
//! Owns a growable list of fixed-size atlas pages. Reservations are tried
//! against each page in creation order; when every page is full a new one is
//! appended. Pages are never merged, compacted or evicted, and a reservation
//! never moves once issued.

pub mod packer;
pub mod surface;

use log::{debug, info};

use crate::constants::{
    DEFAULT_ATLAS_HEIGHT, DEFAULT_ATLAS_SPACING, DEFAULT_ATLAS_WIDTH, MAX_ATLAS_DIMENSION,
};
use crate::error::{FontError, Result};

pub use packer::SkylinePacker;
pub use surface::Surface;

/// Index of an atlas page in its allocator (creation order)
///
/// Only meaningful for the allocator (and face) that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(usize);

impl AtlasId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Atlas page geometry and pixel conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasSettings {
    pub width: u32,
    pub height: u32,
    /// Empty pixels kept between neighbouring cells
    pub spacing: u32,
    /// Pages store sRGB-encoded pixels
    pub srgb: bool,
    /// Memory row 0 is the bottom of the texture
    pub flipped: bool,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_ATLAS_WIDTH,
            height: DEFAULT_ATLAS_HEIGHT,
            spacing: DEFAULT_ATLAS_SPACING,
            srgb: false,
            flipped: false,
        }
    }
}

impl AtlasSettings {
    /// Reject unusable page geometry
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FontError::InvalidConfig(format!(
                "atlas size must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        if self.width > MAX_ATLAS_DIMENSION || self.height > MAX_ATLAS_DIMENSION {
            return Err(FontError::InvalidConfig(format!(
                "atlas size {}x{} exceeds {}",
                self.width, self.height, MAX_ATLAS_DIMENSION
            )));
        }
        if self.spacing >= self.width.min(self.height) {
            return Err(FontError::InvalidConfig(format!(
                "atlas spacing {} leaves no room in a {}x{} page",
                self.spacing, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A committed rectangle inside one atlas page (memory coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasReservation {
    pub atlas: AtlasId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasReservation {
    /// Rectangle in memory rows of the page
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Rectangle in texture space (row 0 = top) for a page of `page_height`
    pub fn texture_rect(&self, page_height: u32, flipped: bool) -> Rect {
        if flipped {
            Rect::new(self.x, page_height - self.y - self.height, self.width, self.height)
        } else {
            self.rect()
        }
    }
}

/// One atlas page: pixels plus free-space bookkeeping
#[derive(Debug)]
pub struct Atlas {
    surface: Surface,
    packer: SkylinePacker,
    cells: usize,
}

impl Atlas {
    fn new(settings: &AtlasSettings) -> Self {
        Self {
            surface: Surface::new(settings.width, settings.height, settings.flipped, settings.srgb),
            packer: SkylinePacker::new(settings.width, settings.height),
            cells: 0,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Number of reservations issued from this page
    pub fn cell_count(&self) -> usize {
        self.cells
    }
}

/// Append-only arena of atlas pages
#[derive(Debug)]
pub struct AtlasAllocator {
    settings: AtlasSettings,
    atlases: Vec<Atlas>,
}

impl AtlasAllocator {
    /// Create an empty allocator; pages are added on first reservation
    pub fn new(settings: AtlasSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            atlases: Vec::new(),
        })
    }

    pub fn settings(&self) -> &AtlasSettings {
        &self.settings
    }

    /// Reserve a `width`x`height` rectangle, growing the page list if needed
    pub fn reserve(&mut self, width: u32, height: u32) -> Result<AtlasReservation> {
        let s = self.settings;
        if width == 0 || height == 0 {
            return Err(FontError::InvalidConfig(format!(
                "cannot reserve an empty {}x{} cell",
                width, height
            )));
        }
        if width > s.width || height > s.height {
            return Err(FontError::GlyphTooLarge {
                width,
                height,
                atlas_width: s.width,
                atlas_height: s.height,
            });
        }

        // Spacing goes right/below each cell; the page edge can absorb it
        let cell_w = (width + s.spacing).min(s.width);
        let cell_h = (height + s.spacing).min(s.height);

        for (i, atlas) in self.atlases.iter_mut().enumerate() {
            if let Some((x, y)) = atlas.packer.pack(cell_w, cell_h) {
                return Ok(Self::commit(atlas, AtlasId(i), x, y, width, height));
            }
        }

        let mut atlas = Atlas::new(&s);
        let id = AtlasId(self.atlases.len());
        info!(
            "Atlas page {} created: {}x{} (spacing={}, srgb={}, flipped={})",
            id.0, s.width, s.height, s.spacing, s.srgb, s.flipped
        );

        // An empty page that cannot take the cell means it never will
        let (x, y) = atlas
            .packer
            .pack(cell_w, cell_h)
            .ok_or(FontError::GlyphTooLarge {
                width,
                height,
                atlas_width: s.width,
                atlas_height: s.height,
            })?;
        let reservation = Self::commit(&mut atlas, id, x, y, width, height);
        self.atlases.push(atlas);
        Ok(reservation)
    }

    fn commit(
        atlas: &mut Atlas,
        id: AtlasId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> AtlasReservation {
        atlas.cells += 1;
        atlas.surface.invalidate();
        debug!(
            "Atlas reserve: page={} at ({}, {}) {}x{}",
            id.0, x, y, width, height
        );
        AtlasReservation {
            atlas: id,
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pages created so far
    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    pub fn get(&self, id: AtlasId) -> Option<&Atlas> {
        self.atlases.get(id.0)
    }

    pub(crate) fn surface_mut(&mut self, id: AtlasId) -> Option<&mut Surface> {
        self.atlases.get_mut(id.0).map(|a| &mut a.surface)
    }

    /// Pages in creation order
    pub fn iter(&self) -> impl Iterator<Item = (AtlasId, &Atlas)> {
        self.atlases.iter().enumerate().map(|(i, a)| (AtlasId(i), a))
    }

    /// Pages needing upload; their dirty flags are cleared
    pub fn take_dirty(&mut self) -> Vec<(AtlasId, &Surface)> {
        self.atlases
            .iter_mut()
            .enumerate()
            .filter_map(|(i, atlas)| {
                if !atlas.surface.is_dirty() {
                    return None;
                }
                atlas.surface.clear_dirty();
                let atlas: &Atlas = atlas;
                Some((AtlasId(i), &atlas.surface))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator for randomized packing runs
    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }

        fn range(&mut self, lo: u32, hi: u32) -> u32 {
            lo + self.next() % (hi - lo + 1)
        }
    }

    fn settings(width: u32, height: u32, spacing: u32) -> AtlasSettings {
        AtlasSettings {
            width,
            height,
            spacing,
            ..Default::default()
        }
    }

    fn overlaps(a: &AtlasReservation, b: &AtlasReservation) -> bool {
        a.atlas == b.atlas
            && a.x < b.x + b.width
            && b.x < a.x + a.width
            && a.y < b.y + b.height
            && b.y < a.y + a.height
    }

    #[test]
    fn test_random_reservations_never_overlap() {
        for seed in [1u32, 7, 42, 1234, 99991] {
            let mut rng = XorShift(seed);
            let mut alloc = AtlasAllocator::new(settings(128, 96, 2)).unwrap();
            let mut issued = Vec::new();

            for _ in 0..300 {
                let w = rng.range(1, 40);
                let h = rng.range(1, 40);
                let r = alloc.reserve(w, h).unwrap();
                assert_eq!((r.width, r.height), (w, h));
                assert!(r.x + r.width <= 128 && r.y + r.height <= 96);
                issued.push(r);
            }

            for (i, a) in issued.iter().enumerate() {
                for b in &issued[i + 1..] {
                    assert!(!overlaps(a, b), "{:?} overlaps {:?}", a, b);
                }
            }
            assert!(alloc.len() > 1, "300 cells should spill onto more pages");
        }
    }

    #[test]
    fn test_spacing_separates_cells() {
        let mut alloc = AtlasAllocator::new(settings(64, 64, 3)).unwrap();
        let a = alloc.reserve(10, 10).unwrap();
        let b = alloc.reserve(10, 10).unwrap();
        assert_eq!(a.atlas, b.atlas);
        assert_eq!(b.x, a.x + 10 + 3);
    }

    #[test]
    fn test_new_page_when_full() {
        let mut alloc = AtlasAllocator::new(settings(32, 32, 0)).unwrap();
        let a = alloc.reserve(32, 32).unwrap();
        let b = alloc.reserve(8, 8).unwrap();
        assert_eq!(a.atlas.index(), 0);
        assert_eq!(b.atlas.index(), 1);
        assert_eq!((b.x, b.y), (0, 0));
        assert_eq!(alloc.len(), 2);
        // Older pages are tried first again
        assert_eq!(alloc.get(a.atlas).unwrap().cell_count(), 1);
    }

    #[test]
    fn test_full_width_cell_fits_despite_spacing() {
        let mut alloc = AtlasAllocator::new(settings(32, 32, 2)).unwrap();
        let r = alloc.reserve(32, 4).unwrap();
        assert_eq!((r.x, r.y), (0, 0));
    }

    #[test]
    fn test_glyph_too_large() {
        let mut alloc = AtlasAllocator::new(settings(32, 32, 0)).unwrap();
        let err = alloc.reserve(33, 4).unwrap_err();
        assert!(matches!(err, FontError::GlyphTooLarge { width: 33, .. }));
        assert!(alloc.is_empty());
    }

    #[test]
    fn test_texture_rect_of_flipped_page() {
        let r = AtlasReservation {
            atlas: AtlasId(0),
            x: 5,
            y: 10,
            width: 4,
            height: 6,
        };
        assert_eq!(r.texture_rect(100, false), Rect::new(5, 10, 4, 6));
        assert_eq!(r.texture_rect(100, true), Rect::new(5, 84, 4, 6));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(AtlasAllocator::new(settings(0, 32, 0)).is_err());
        assert!(AtlasAllocator::new(settings(32, 32, 32)).is_err());
        assert!(AtlasAllocator::new(settings(MAX_ATLAS_DIMENSION + 1, 32, 0)).is_err());
    }

    #[test]
    fn test_take_dirty_clears_flags() {
        let mut alloc = AtlasAllocator::new(settings(32, 32, 0)).unwrap();
        alloc.reserve(4, 4).unwrap();
        let dirty: Vec<usize> = alloc.take_dirty().iter().map(|(id, _)| id.index()).collect();
        assert_eq!(dirty, vec![0]);
        assert!(alloc.take_dirty().is_empty());
    }
}
