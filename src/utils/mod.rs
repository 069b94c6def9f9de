pub mod maths_utils;

pub use maths_utils::{LinearFit, ols_fit, trailing_average};
