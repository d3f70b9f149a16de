// THEORY:
// Candidate window sizes are produced by a chain of `SizingPolicy` stages.
// Each stage receives the previous stage's output and may transform, filter,
// or extend it; the engine treats the final sequence as an ordered, finite
// list and validates nothing beyond "non-empty, no degenerate dimensions".
//
// The default policy walks a zig-zag descent from the configured maximum
// window down to the unit window, trading one axis at a time so that both
// wide and tall candidates appear throughout the sequence.

use crate::cancel::CancellationToken;
use crate::core_modules::area::Dimensions;

/// A chainable producer of candidate window dimensions.
pub trait SizingPolicy: Send + Sync {
    /// Transforms the previous stage's output into this stage's output.
    /// Returning `None` means the stage produced nothing for the next stage.
    fn configure_sizings(
        &self,
        previous: Option<Vec<Dimensions>>,
        sprite_count: usize,
        max_width: u32,
        max_height: u32,
        ct: &CancellationToken,
    ) -> Option<Vec<Dimensions>>;
}

/// Zig-zag descent from (max_width, max_height) down to the unit window.
#[derive(Debug, Default)]
pub struct DefaultSizingPolicy;

impl SizingPolicy for DefaultSizingPolicy {
    fn configure_sizings(
        &self,
        previous: Option<Vec<Dimensions>>,
        _sprite_count: usize,
        max_width: u32,
        max_height: u32,
        ct: &CancellationToken,
    ) -> Option<Vec<Dimensions>> {
        let mut result = previous.unwrap_or_default();

        let mut x = max_width as i64;
        let mut y = max_height as i64;
        let mut counter: i64 = if x != y {
            if x < y { 1 } else { 2 }
        } else {
            0
        };

        while x > 0 && y > 0 {
            if ct.is_cancelled() {
                break;
            }
            result.push(Dimensions::new(x as u32, y as u32));
            match counter % 3 {
                1 => {
                    x += 1;
                    y -= 1;
                }
                _ => x -= 1,
            }
            counter += 1;
        }

        Some(result)
    }
}

/// Appends the 1x1 window if the chain so far did not produce it, so that a
/// run can always consume isolated opaque pixels.
#[derive(Debug, Default)]
pub struct EnsureUnitSizing;

impl SizingPolicy for EnsureUnitSizing {
    fn configure_sizings(
        &self,
        previous: Option<Vec<Dimensions>>,
        _sprite_count: usize,
        _max_width: u32,
        _max_height: u32,
        _ct: &CancellationToken,
    ) -> Option<Vec<Dimensions>> {
        let mut result = previous.unwrap_or_default();
        if !result.contains(&Dimensions::unit()) {
            result.push(Dimensions::unit());
        }
        Some(result)
    }
}
