// THEORY:
// The `AreaEnumerator` is the traversal strategy of the engine: it knows how
// to visit every valid window position for a given window size, and nothing
// else. The removal loop only depends on the four enumeration modes below,
// never on a particular traversal order.
//
// Key architectural principles:
// 1.  **Four Modes, One Contract**: through-sprite (one sprite), all
//     (sequential over the sheet), parallel (fan-out with cooperative
//     cancellation), and copy (walks a private clone so callers can simulate
//     destructive what-if edits without touching the live sheet).
// 2.  **Borrow, Never Retain**: every mode borrows the sheet for the duration
//     of one call. Enumerators are stateless and hold no sheet reference.
// 3.  **Explicit Construction**: concrete strategies are chosen through
//     `EnumeratorKind` and a plain factory function, resolved at compile
//     time. No runtime type introspection.
// 4.  **Cancellation Granularity**: the parallel mode splits each sprite into
//     bands sized off the worker count; a band is the unit of work, so a
//     cancel lands within one band of latency while in-flight bands finish.

use crate::cancel::CancellationToken;
use crate::core_modules::area::Dimensions;
use crate::core_modules::sprite::{Sprite, SpriteSheet};
use rayon::prelude::*;

/// Strategy object walking valid window positions over sprites.
///
/// A position (x, y) is valid when the whole `dims` window fits inside the
/// sprite, last fitting position included.
pub trait AreaEnumerator: Send + Sync {
    /// Visits every valid position within one sprite.
    fn enumerate_through_sprite(
        &self,
        sheet: &SpriteSheet,
        sprite_index: usize,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    );

    /// Visits every valid position across the whole sheet, sequentially.
    fn enumerate_all(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    );

    /// Same coverage as `enumerate_all`, fanned out across worker threads.
    /// Once `ct` is observed no new band of positions is scheduled.
    fn enumerate_parallel(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        ct: &CancellationToken,
        visit: &(dyn Fn(&Sprite, usize, u32, u32) + Send + Sync),
    );

    /// Walks a private clone of the sheet, handing the callback mutable
    /// access to the clone. Edits persist across callbacks within one call
    /// and never reach the live sheet.
    fn enumerate_copy(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&mut Sprite, usize, u32, u32),
    );
}

/// Inclusive maxima for valid window origins, or `None` when the window does
/// not fit the sprite at all.
fn origin_bounds(sprite: &Sprite, dims: Dimensions) -> Option<(u32, u32)> {
    if sprite.width() < dims.width || sprite.height() < dims.height {
        return None;
    }
    Some((sprite.width() - dims.width, sprite.height() - dims.height))
}

/// Row-major traversal: y outer, x inner.
#[derive(Debug, Default)]
pub struct ScanlineEnumerator;

/// The classic column-major traversal: x outer, y inner.
#[derive(Debug, Default)]
pub struct ColumnMajorEnumerator;

impl AreaEnumerator for ScanlineEnumerator {
    fn enumerate_through_sprite(
        &self,
        sheet: &SpriteSheet,
        sprite_index: usize,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    ) {
        let sprite = sheet.sprite(sprite_index);
        let Some((max_x, max_y)) = origin_bounds(sprite, dims) else {
            return;
        };
        for y in 0..=max_y {
            for x in 0..=max_x {
                visit(sprite, sprite_index, x, y);
            }
        }
    }

    fn enumerate_all(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    ) {
        for index in 0..sheet.len() {
            self.enumerate_through_sprite(sheet, index, dims, visit);
        }
    }

    fn enumerate_parallel(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        ct: &CancellationToken,
        visit: &(dyn Fn(&Sprite, usize, u32, u32) + Send + Sync),
    ) {
        let bands = num_cpus::get().max(1) as u32;
        (0..sheet.len()).into_par_iter().for_each(|index| {
            let sprite = sheet.sprite(index);
            let Some((max_x, max_y)) = origin_bounds(sprite, dims) else {
                return;
            };
            let rows = max_y + 1;
            let band_height = rows.div_ceil(bands).max(1);
            (0..bands).into_par_iter().for_each(|band| {
                if ct.is_cancelled() {
                    return;
                }
                let y_start = band * band_height;
                if y_start >= rows {
                    return;
                }
                let y_end = (y_start + band_height).min(rows);
                for y in y_start..y_end {
                    for x in 0..=max_x {
                        visit(sprite, index, x, y);
                    }
                }
            });
        });
    }

    fn enumerate_copy(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&mut Sprite, usize, u32, u32),
    ) {
        let mut copy = sheet.clone();
        for index in 0..copy.len() {
            let Some((max_x, max_y)) = origin_bounds(copy.sprite(index), dims) else {
                continue;
            };
            for y in 0..=max_y {
                for x in 0..=max_x {
                    visit(copy.sprite_mut(index), index, x, y);
                }
            }
        }
    }
}

impl AreaEnumerator for ColumnMajorEnumerator {
    fn enumerate_through_sprite(
        &self,
        sheet: &SpriteSheet,
        sprite_index: usize,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    ) {
        let sprite = sheet.sprite(sprite_index);
        let Some((max_x, max_y)) = origin_bounds(sprite, dims) else {
            return;
        };
        for x in 0..=max_x {
            for y in 0..=max_y {
                visit(sprite, sprite_index, x, y);
            }
        }
    }

    fn enumerate_all(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&Sprite, usize, u32, u32),
    ) {
        for index in 0..sheet.len() {
            self.enumerate_through_sprite(sheet, index, dims, visit);
        }
    }

    fn enumerate_parallel(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        ct: &CancellationToken,
        visit: &(dyn Fn(&Sprite, usize, u32, u32) + Send + Sync),
    ) {
        let bands = num_cpus::get().max(1) as u32;
        (0..sheet.len()).into_par_iter().for_each(|index| {
            let sprite = sheet.sprite(index);
            let Some((max_x, max_y)) = origin_bounds(sprite, dims) else {
                return;
            };
            let columns = max_x + 1;
            let band_width = columns.div_ceil(bands).max(1);
            (0..bands).into_par_iter().for_each(|band| {
                if ct.is_cancelled() {
                    return;
                }
                let x_start = band * band_width;
                if x_start >= columns {
                    return;
                }
                let x_end = (x_start + band_width).min(columns);
                for x in x_start..x_end {
                    for y in 0..=max_y {
                        visit(sprite, index, x, y);
                    }
                }
            });
        });
    }

    fn enumerate_copy(
        &self,
        sheet: &SpriteSheet,
        dims: Dimensions,
        visit: &mut dyn FnMut(&mut Sprite, usize, u32, u32),
    ) {
        let mut copy = sheet.clone();
        for index in 0..copy.len() {
            let Some((max_x, max_y)) = origin_bounds(copy.sprite(index), dims) else {
                continue;
            };
            for x in 0..=max_x {
                for y in 0..=max_y {
                    visit(copy.sprite_mut(index), index, x, y);
                }
            }
        }
    }
}

/// Registered enumeration strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumeratorKind {
    #[default]
    Scanline,
    ColumnMajor,
}

/// Explicit factory for the configured strategy.
pub fn build_enumerator(kind: EnumeratorKind) -> Box<dyn AreaEnumerator> {
    match kind {
        EnumeratorKind::Scanline => Box::new(ScanlineEnumerator),
        EnumeratorKind::ColumnMajor => Box::new(ColumnMajorEnumerator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::area::Area;
    use crate::core_modules::pixel::pixel::Pixel;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn two_sprite_sheet() -> SpriteSheet {
        SpriteSheet::new(vec![Sprite::blank(4, 3), Sprite::blank(2, 2)])
    }

    fn collect_positions(
        enumerator: &dyn AreaEnumerator,
        sheet: &SpriteSheet,
        dims: Dimensions,
    ) -> Vec<(usize, u32, u32)> {
        let mut positions = Vec::new();
        enumerator.enumerate_all(sheet, dims, &mut |_, index, x, y| {
            positions.push((index, x, y));
        });
        positions
    }

    #[test]
    fn all_valid_positions_are_visited_inclusively() {
        let sheet = two_sprite_sheet();
        let dims = Dimensions::new(2, 2);
        let positions = collect_positions(&ScanlineEnumerator, &sheet, dims);
        // 4x3 sprite: 3x2 origins; 2x2 sprite: exactly one origin.
        assert_eq!(positions.len(), 6 + 1);
        assert!(positions.contains(&(0, 2, 1)));
        assert!(positions.contains(&(1, 0, 0)));
    }

    #[test]
    fn strategies_cover_the_same_position_set() {
        let sheet = two_sprite_sheet();
        let dims = Dimensions::new(2, 1);
        let scanline: HashSet<_> = collect_positions(&ScanlineEnumerator, &sheet, dims)
            .into_iter()
            .collect();
        let column: HashSet<_> = collect_positions(&ColumnMajorEnumerator, &sheet, dims)
            .into_iter()
            .collect();
        assert_eq!(scanline, column);
    }

    #[test]
    fn through_sprite_stays_within_one_sprite() {
        let sheet = two_sprite_sheet();
        let mut indices = HashSet::new();
        ScanlineEnumerator.enumerate_through_sprite(
            &sheet,
            1,
            Dimensions::unit(),
            &mut |_, index, _, _| {
                indices.insert(index);
            },
        );
        assert_eq!(indices, HashSet::from([1]));
    }

    #[test]
    fn oversized_window_visits_nothing() {
        let sheet = two_sprite_sheet();
        assert!(collect_positions(&ScanlineEnumerator, &sheet, Dimensions::new(5, 1)).is_empty());
        assert!(collect_positions(&ScanlineEnumerator, &sheet, Dimensions::new(9, 9)).is_empty());
    }

    #[test]
    fn window_exactly_filling_a_sprite_has_one_origin() {
        let sheet = two_sprite_sheet();
        let positions = collect_positions(&ScanlineEnumerator, &sheet, Dimensions::new(4, 3));
        assert_eq!(positions, vec![(0, 0, 0)]);
    }

    #[test]
    fn parallel_matches_sequential_coverage() {
        let sheet = two_sprite_sheet();
        let dims = Dimensions::new(2, 2);
        let sequential: HashSet<_> = collect_positions(&ScanlineEnumerator, &sheet, dims)
            .into_iter()
            .collect();
        let seen = Mutex::new(HashSet::new());
        ScanlineEnumerator.enumerate_parallel(
            &sheet,
            dims,
            &CancellationToken::new(),
            &|_, index, x, y| {
                seen.lock().unwrap().insert((index, x, y));
            },
        );
        assert_eq!(seen.into_inner().unwrap(), sequential);
    }

    #[test]
    fn cancelled_parallel_enumeration_schedules_nothing() {
        let sheet = two_sprite_sheet();
        let ct = CancellationToken::new();
        ct.cancel();
        let visits = AtomicUsize::new(0);
        ScanlineEnumerator.enumerate_parallel(&sheet, Dimensions::unit(), &ct, &|_, _, _, _| {
            visits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(visits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn copy_mode_never_mutates_the_live_sheet() {
        let mut sprite = Sprite::blank(3, 3);
        sprite.set_pixel(1, 1, Pixel::new(7, 7, 7, 255));
        let sheet = SpriteSheet::new(vec![sprite]);
        let dims = Dimensions::unit();

        let mut erased_in_copy = 0;
        ScanlineEnumerator.enumerate_copy(&sheet, dims, &mut |sprite, _, x, y| {
            if sprite.pixel(x, y).is_opaque() {
                Area::erase(sprite, x, y, dims);
                erased_in_copy += 1;
            }
        });

        assert_eq!(erased_in_copy, 1);
        assert!(sheet.sprite(0).pixel(1, 1).is_opaque());
    }

    #[test]
    fn copy_edits_persist_within_one_call() {
        let mut sprite = Sprite::blank(2, 1);
        sprite.set_pixel(0, 0, Pixel::new(5, 5, 5, 255));
        sprite.set_pixel(1, 0, Pixel::new(5, 5, 5, 255));
        let sheet = SpriteSheet::new(vec![sprite]);

        // Erase on first visit, observe the erasure on later visits.
        let mut opaque_seen = 0;
        ScanlineEnumerator.enumerate_copy(&sheet, Dimensions::unit(), &mut |sprite, _, x, y| {
            if sprite.pixel(x, y).is_opaque() {
                opaque_seen += 1;
                Area::erase(sprite, 0, 0, Dimensions::new(2, 1));
            }
        });
        assert_eq!(opaque_seen, 1);
    }

    #[test]
    fn factory_resolves_registered_kinds() {
        let sheet = two_sprite_sheet();
        for kind in [EnumeratorKind::Scanline, EnumeratorKind::ColumnMajor] {
            let enumerator = build_enumerator(kind);
            let mut visits = 0usize;
            enumerator.enumerate_all(&sheet, Dimensions::unit(), &mut |_, _, _, _| visits += 1);
            assert_eq!(visits, 12 + 4);
        }
    }
}
