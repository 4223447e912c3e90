//! Approximates operator inverses by probing the forward formula.
pub mod relaxation;

pub use relaxation::Relaxation;
