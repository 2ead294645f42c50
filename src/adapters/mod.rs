pub mod emit;
pub mod fs;
pub mod python;
pub mod test_detector;
pub mod theme;
