// THEORY:
// The `Area` module is the content-addressing layer of the engine. An `Area`
// is an immutable snapshot of a rectangular pixel window, taken fresh from a
// sprite on every read, together with a structural hash computed once at
// construction.
//
// Key architectural principles:
// 1.  **Hash As Identity**: The content hash is the area's identity for every
//     indexing purpose. There is deliberately no secondary pixel-by-pixel
//     equality check, so two physically different windows that collide are
//     treated as the same area. This mirrors the trade-off the correlation
//     index is built around: one cheap u64 comparison per candidate window.
// 2.  **Ephemeral Snapshots**: Areas are never mutated and never cached
//     against the live sheet. Staleness is handled by re-reading the window
//     and comparing hashes, not by trying to keep snapshots in sync.
// 3.  **Cheap Rejection First**: `contains_opaque_pixel` short-circuits on
//     the first opaque pixel, so fully transparent windows are skipped before
//     any snapshot or hashing work is spent on them.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::sprite::Sprite;
use std::fmt;

/// A (width, height) pair with structural equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The smallest unit window, used for whole-sheet pixel scans.
    pub fn unit() -> Self {
        Self::new(1, 1)
    }

    pub fn square(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// An immutable, content-addressed snapshot of a rectangular pixel window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    dims: Dimensions,
    /// Row-major snapshot of the window's pixels.
    pixels: Vec<Pixel>,
    opaque_pixel_count: u32,
    content_hash: u64,
}

impl Area {
    pub fn new(dims: Dimensions, pixels: Vec<Pixel>) -> Self {
        debug_assert_eq!(pixels.len() as u64, dims.square());
        let opaque_pixel_count = pixels.iter().filter(|p| p.is_opaque()).count() as u32;
        let content_hash = Self::hash_contents(dims, &pixels);
        Self {
            dims,
            pixels,
            opaque_pixel_count,
            content_hash,
        }
    }

    /// Snapshots a `dims`-sized window starting at (x, y). The caller
    /// guarantees the window fits inside the sprite's bounds.
    pub fn read(sprite: &Sprite, x: u32, y: u32, dims: Dimensions) -> Self {
        let mut pixels = Vec::with_capacity(dims.square() as usize);
        for yy in 0..dims.height {
            for xx in 0..dims.width {
                pixels.push(sprite.pixel(x + xx, y + yy));
            }
        }
        Self::new(dims, pixels)
    }

    /// Zeroes every pixel of the window in place, making it fully transparent.
    pub fn erase(sprite: &mut Sprite, x: u32, y: u32, dims: Dimensions) {
        for yy in 0..dims.height {
            for xx in 0..dims.width {
                sprite.set_pixel(x + xx, y + yy, Pixel::TRANSPARENT);
            }
        }
    }

    /// Short-circuits on the first opaque pixel found in the window.
    pub fn contains_opaque_pixel(sprite: &Sprite, x: u32, y: u32, dims: Dimensions) -> bool {
        for yy in 0..dims.height {
            for xx in 0..dims.width {
                if sprite.pixel(x + xx, y + yy).is_opaque() {
                    return true;
                }
            }
        }
        false
    }

    /// Deterministic, order-sensitive FNV-1a fold over every pixel's packed
    /// channels, then the dimensions. Collisions merge silently.
    fn hash_contents(dims: Dimensions, pixels: &[Pixel]) -> u64 {
        let mut hash = FNV_OFFSET;
        for pixel in pixels {
            hash ^= pixel.packed() as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash ^= (dims.width as u64) << 32 | dims.height as u64;
        hash.wrapping_mul(FNV_PRIME)
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> u32 {
        self.pixels.len() as u32
    }

    pub fn opaque_pixel_count(&self) -> u32 {
        self.opaque_pixel_count
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite_with_block(width: u32, height: u32, bx: u32, by: u32, bw: u32, bh: u32) -> Sprite {
        let mut sprite = Sprite::blank(width, height);
        for y in by..by + bh {
            for x in bx..bx + bw {
                sprite.set_pixel(x, y, Pixel::new(200, 10, 10, 255));
            }
        }
        sprite
    }

    #[test]
    fn identical_content_hashes_identically() {
        let sprite = sprite_with_block(6, 6, 0, 0, 2, 2);
        let other = sprite_with_block(6, 6, 4, 4, 2, 2);
        let dims = Dimensions::new(2, 2);
        let a = Area::read(&sprite, 0, 0, dims);
        let b = Area::read(&other, 4, 4, dims);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a, b);
    }

    #[test]
    fn double_read_of_unchanged_window_is_equal() {
        let sprite = sprite_with_block(4, 4, 1, 1, 2, 2);
        let dims = Dimensions::new(3, 3);
        let first = Area::read(&sprite, 0, 0, dims);
        let second = Area::read(&sprite, 0, 0, dims);
        assert_eq!(first.content_hash(), second.content_hash());
        assert_eq!(first.pixels(), second.pixels());
    }

    #[test]
    fn hash_is_order_sensitive() {
        let dims = Dimensions::new(2, 1);
        let a = Area::new(dims, vec![Pixel::new(1, 0, 0, 255), Pixel::new(2, 0, 0, 255)]);
        let b = Area::new(dims, vec![Pixel::new(2, 0, 0, 255), Pixel::new(1, 0, 0, 255)]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_depends_on_dimensions() {
        let pixels = vec![Pixel::new(5, 5, 5, 255); 4];
        let wide = Area::new(Dimensions::new(4, 1), pixels.clone());
        let tall = Area::new(Dimensions::new(1, 4), pixels);
        assert_ne!(wide.content_hash(), tall.content_hash());
    }

    #[test]
    fn erase_clears_every_opaque_pixel() {
        let mut sprite = sprite_with_block(5, 5, 1, 1, 3, 3);
        let dims = Dimensions::new(3, 3);
        assert!(Area::contains_opaque_pixel(&sprite, 1, 1, dims));
        Area::erase(&mut sprite, 1, 1, dims);
        assert!(!Area::contains_opaque_pixel(&sprite, 1, 1, dims));
        // Erasure is idempotent.
        Area::erase(&mut sprite, 1, 1, dims);
        assert!(!Area::contains_opaque_pixel(&sprite, 1, 1, dims));
    }

    #[test]
    fn opaque_count_tracks_window_content() {
        let sprite = sprite_with_block(4, 4, 0, 0, 2, 2);
        let area = Area::read(&sprite, 0, 0, Dimensions::new(3, 3));
        assert_eq!(area.pixel_count(), 9);
        assert_eq!(area.opaque_pixel_count(), 4);
    }
}
