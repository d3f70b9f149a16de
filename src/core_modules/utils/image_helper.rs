pub mod image_helper {
    use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
    use crate::core_modules::sprite::{Sprite, SpriteSheet};
    use image::ImageEncoder;
    use std::path::Path;

    /// Encodes one sprite as an RGBA PNG at `path`.
    pub fn save_sprite(path: &Path, sprite: &Sprite) -> Result<(), image::error::ImageError> {
        let buffer = sprite.to_rgba_bytes();
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(
            &buffer,
            sprite.width(),
            sprite.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Decodes an image file into a sprite, converting to RGBA on the way in.
    pub fn load_sprite(path: &Path) -> Result<Sprite, image::error::ImageError> {
        let decoded = image::open(path)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Sprite::from_rgba_bytes(width, height, decoded.as_raw()))
    }

    /// Decodes a batch of image files into one sheet, preserving order.
    pub fn load_sheet(paths: &[&Path]) -> Result<SpriteSheet, image::error::ImageError> {
        let mut sprites = Vec::with_capacity(paths.len());
        for path in paths {
            sprites.push(load_sprite(path)?);
        }
        Ok(SpriteSheet::new(sprites))
    }

    /// Writes every sprite of the sheet next to `stem`, numbered by index.
    pub fn save_sheet(
        directory: &Path,
        stem: &str,
        sheet: &SpriteSheet,
    ) -> Result<(), image::error::ImageError> {
        for (index, sprite) in sheet.sprites().iter().enumerate() {
            let path = directory.join(format!("{stem}_{index}.png"));
            save_sprite(&path, sprite)?;
        }
        Ok(())
    }

    impl Sprite {
        /// RGBA byte view of the sprite, row-major.
        pub fn to_rgba_bytes(&self) -> Vec<u8> {
            let mut buffer = Vec::with_capacity(self.pixels().len() * CHANNELS);
            for &pixel in self.pixels() {
                let bytes: [u8; CHANNELS] = pixel.into();
                buffer.extend_from_slice(&bytes);
            }
            buffer
        }
    }

    /// Uniformly colored sprite, handy for fixtures.
    pub fn solid_sprite(width: u32, height: u32, pixel: Pixel) -> Sprite {
        let mut sprite = Sprite::blank(width, height);
        for y in 0..height {
            for x in 0..width {
                sprite.set_pixel(x, y, pixel);
            }
        }
        sprite
    }
}
