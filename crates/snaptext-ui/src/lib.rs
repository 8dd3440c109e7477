slint::include_modules!();

pub mod selector;

pub use selector::{RegionSelector, to_desktop_rect};
