pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;

    pub const CHANNELS: usize = 4;

    /// A single RGBA pixel value. Opacity is defined as `alpha > 0`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    impl Pixel {
        /// The fully erased pixel: every channel at its minimum.
        pub const TRANSPARENT: Pixel = Pixel {
            red: 0,
            green: 0,
            blue: 0,
            alpha: 0,
        };

        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn is_opaque(&self) -> bool {
            self.alpha > 0
        }

        /// All four channels packed into a single value, used as the unit of
        /// content hashing for areas.
        pub fn packed(&self) -> u32 {
            u32::from_le_bytes([self.red, self.green, self.blue, self.alpha])
        }
    }

    impl From<&[Byte]> for Pixel {
        fn from(bytes: &[Byte]) -> Self {
            if bytes.len() != CHANNELS {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn opacity_is_any_nonzero_alpha() {
        assert!(Pixel::new(0, 0, 0, 1).is_opaque());
        assert!(Pixel::new(255, 255, 255, 255).is_opaque());
        assert!(!Pixel::new(255, 255, 255, 0).is_opaque());
        assert!(!Pixel::TRANSPARENT.is_opaque());
    }

    #[test]
    fn packed_value_is_channel_order_sensitive() {
        let a = Pixel::new(1, 2, 3, 4);
        let b = Pixel::new(4, 3, 2, 1);
        assert_ne!(a.packed(), b.packed());
        assert_eq!(a.packed(), Pixel::new(1, 2, 3, 4).packed());
    }

    #[test]
    fn byte_round_trip() {
        let pixel = Pixel::from(&[10u8, 20, 30, 40][..]);
        let bytes: [u8; CHANNELS] = pixel.into();
        assert_eq!(bytes, [10, 20, 30, 40]);
    }
}
