use nalgebra::RealField;

pub use nalgebra;

pub mod comm;

/// Scalar type used for grid spacings and operator coefficients.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
