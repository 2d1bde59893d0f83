pub mod element;
pub mod fragment;
pub mod ifc_model;
pub mod registry;

pub use element::Element;
pub use fragment::Fragment;
pub use ifc_model::{IfcModel, PropertySetView};
pub use registry::{ModelEntry, ModelRegistry};
