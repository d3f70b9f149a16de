// THEORY:
// The `sprite` module holds the mutable side of the data model. A `Sprite` is
// a fixed-size 2D grid of `Pixel`s stored as a flattened row-major vector,
// and a `SpriteSheet` is the fixed, ordered collection of sprites that one
// optimization run operates on.
//
// Key architectural principles:
// 1.  **Dumb Data Containers**: Like the pixel module, sprites know how to
//     index and mutate their own grid but carry no optimization logic. All
//     window-level reads and erasures live in the `area` module.
// 2.  **Exclusive Ownership**: A `SpriteSheet` is owned by the removal loop
//     for the duration of a run. Enumerators and scoring policies only borrow
//     it (or clone it) for the length of a single call.
// 3.  **Fixed Geometry**: Width and height never change after construction;
//     erasure zeroes pixels in place rather than resizing anything.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};

/// A fixed-size mutable grid of pixels, identified by its index in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    /// Flattened row-major pixel data, `len == width * height`.
    pixels: Vec<Pixel>,
}

impl Sprite {
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        assert_eq!(
            pixels.len(),
            (width * height) as usize,
            "pixel buffer does not match sprite geometry"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A fully transparent sprite of the given geometry.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![Pixel::TRANSPARENT; (width * height) as usize])
    }

    /// Builds a sprite from a raw RGBA8 buffer (4 bytes per pixel, row-major).
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Self {
        assert_eq!(
            bytes.len(),
            (width * height) as usize * CHANNELS,
            "byte buffer does not match sprite geometry"
        );
        let pixels = bytes.chunks_exact(CHANNELS).map(Pixel::from).collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.pixels[self.offset(x, y)]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        let offset = self.offset(x, y);
        self.pixels[offset] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> u64 {
        self.pixels.len() as u64
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y * self.width + x) as usize
    }
}

/// The fixed, ordered dataset of sprites sharing one coordinate space.
#[derive(Debug, Clone, Default)]
pub struct SpriteSheet {
    sprites: Vec<Sprite>,
}

impl SpriteSheet {
    pub fn new(sprites: Vec<Sprite>) -> Self {
        Self { sprites }
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn sprite(&self, index: usize) -> &Sprite {
        &self.sprites[index]
    }

    pub fn sprite_mut(&mut self, index: usize) -> &mut Sprite {
        &mut self.sprites[index]
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn total_pixels(&self) -> u64 {
        self.sprites.iter().map(Sprite::pixel_count).sum()
    }

    /// The largest width and height over all sprites, the natural upper bound
    /// for candidate window sizes.
    pub fn max_dimensions(&self) -> (u32, u32) {
        let width = self.sprites.iter().map(Sprite::width).max().unwrap_or(0);
        let height = self.sprites.iter().map(Sprite::height).max().unwrap_or(0);
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_indexing() {
        let mut sprite = Sprite::blank(3, 2);
        sprite.set_pixel(2, 1, Pixel::new(9, 9, 9, 9));
        assert_eq!(sprite.pixel(2, 1), Pixel::new(9, 9, 9, 9));
        assert_eq!(sprite.pixels()[5], Pixel::new(9, 9, 9, 9));
        assert_eq!(sprite.pixel(0, 0), Pixel::TRANSPARENT);
    }

    #[test]
    fn from_rgba_bytes_matches_manual_grid() {
        let bytes = [
            1u8, 2, 3, 4, // (0,0)
            5, 6, 7, 8, // (1,0)
            9, 10, 11, 12, // (0,1)
            13, 14, 15, 16, // (1,1)
        ];
        let sprite = Sprite::from_rgba_bytes(2, 2, &bytes);
        assert_eq!(sprite.pixel(1, 0), Pixel::new(5, 6, 7, 8));
        assert_eq!(sprite.pixel(0, 1), Pixel::new(9, 10, 11, 12));
    }

    #[test]
    fn sheet_max_dimensions() {
        let sheet = SpriteSheet::new(vec![Sprite::blank(4, 2), Sprite::blank(3, 7)]);
        assert_eq!(sheet.max_dimensions(), (4, 7));
        assert_eq!(sheet.total_pixels(), 8 + 21);
    }
}
