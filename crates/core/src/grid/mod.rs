//! Regular grids over a site extent

mod geotransform;
mod layout;
mod surface;

pub use geotransform::GeoTransform;
pub use layout::GridSpec;
pub use surface::Grid;
