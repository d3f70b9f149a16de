// THEORY:
// The scoring policy assigns each distinct area its base value, evaluated
// once per rebuild. The default policy runs a full what-if simulation: clone
// the sheet through copy enumeration, erase every occurrence of the
// candidate, and weight the candidate's opaque density by the opaque pixels
// the simulated removal actually recovered. Expensive, but it runs once per
// distinct area, never per correlation.

use crate::core_modules::area::Area;
use crate::core_modules::enumerator::AreaEnumerator;
use crate::core_modules::sprite::SpriteSheet;

/// Pure base-value function for a candidate area. May be arbitrarily
/// expensive; the index calls it once per distinct area per rebuild.
pub trait ScoringPolicy: Send + Sync {
    fn score(&self, candidate: &Area, sheet: &SpriteSheet, enumerator: &dyn AreaEnumerator)
    -> i64;
}

/// (opaque pixels² / window area) × opaque pixels erased under simulated
/// full removal of the candidate.
#[derive(Debug, Default)]
pub struct DefaultScoringPolicy;

impl ScoringPolicy for DefaultScoringPolicy {
    fn score(
        &self,
        candidate: &Area,
        sheet: &SpriteSheet,
        enumerator: &dyn AreaEnumerator,
    ) -> i64 {
        let dims = candidate.dimensions();
        let target_hash = candidate.content_hash();

        let mut erased_opaque: i64 = 0;
        enumerator.enumerate_copy(sheet, dims, &mut |sprite, _, x, y| {
            let compared = Area::read(sprite, x, y, dims);
            if compared.content_hash() == target_hash {
                Area::erase(sprite, x, y, dims);
                erased_opaque += compared.opaque_pixel_count() as i64;
            }
        });

        let density =
            (candidate.opaque_pixel_count() as i64).pow(2) / candidate.dimensions().square() as i64;
        density * erased_opaque
    }
}
