pub mod amp;
pub mod asr;
pub mod interpolate;
