//! Property-set management and IFC serialization.

pub mod guid;
pub mod manager;

use crate::error::PropertyError;
use crate::model::IfcModel;

pub use guid::new_global_id;
pub use manager::IfcPropertiesManager;

/// Creates and links property records on a model, and writes models back
/// to IFC.
pub trait PropertyManager {
    /// Returns the element's property set called `name`, creating an empty
    /// one when the element has none. The new set is not yet attached.
    /// A set shared with other elements is never returned: the element is
    /// detached from it and gets its own copy.
    fn ensure_pset(
        &mut self,
        model: &mut IfcModel,
        element: u64,
        name: &str,
    ) -> Result<u64, PropertyError>;

    /// Creates an `IFCPROPERTYSINGLEVALUE` holding `value` typed as
    /// `value_type` (e.g. `IfcReal`).
    fn new_single_numeric_property(
        &mut self,
        model: &mut IfcModel,
        value_type: &str,
        name: &str,
        value: f64,
    ) -> Result<u64, PropertyError>;

    /// Adds a property to a set. A property with the same name already in
    /// the set is replaced.
    fn add_prop_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        property: u64,
    ) -> Result<(), PropertyError>;

    /// Relates a set to an element through `IFCRELDEFINESBYPROPERTIES`.
    fn add_element_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        element: u64,
    ) -> Result<(), PropertyError>;

    /// Serializes `raw` with the model's changes applied on top.
    fn save_to_ifc(&self, model: &IfcModel, raw: &[u8]) -> Result<Vec<u8>, PropertyError>;
}
