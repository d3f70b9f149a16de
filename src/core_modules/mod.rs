pub mod area;
pub mod correlation;
pub mod enumerator;
pub mod pixel;
pub mod scoring;
pub mod sizing;
pub mod sprite;
pub mod utils;
