//! Device element hierarchy and product allocation propagation.
//!
//! Every descriptor of a time log references a device element; elements form
//! a tree under the device that owns them. The importer needs three things
//! from that tree: the owning device of an element, the depth of an element
//! below its device root, and the set of elements a product allocation
//! applies to.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

/// A device (implement or tractor) from the task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    /// Machine type byte of the device's ClientNAME.
    pub machine_type: Option<u8>,
}

/// A device element (boom, section, bin, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceElement {
    pub id: String,
    pub device_id: String,
    /// `None` for the device's root element.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Lookup of devices and their elements.
pub trait DeviceHierarchy {
    fn device_element(&self, id: &str) -> Option<&DeviceElement>;

    fn device(&self, id: &str) -> Option<&Device>;

    /// Number of ancestors between `id` and its device root.
    ///
    /// Root elements and unknown elements have depth 0. Cycles in malformed
    /// documents stop the walk at the first repeated element.
    fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut seen = HashSet::new();
        let mut current = self.device_element(id);
        while let Some(element) = current {
            if !seen.insert(element.id.as_str()) {
                break;
            }
            match element.parent.as_deref().and_then(|parent| self.device_element(parent)) {
                Some(parent) => {
                    depth += 1;
                    current = Some(parent);
                }
                None => break,
            }
        }
        depth
    }

    /// Device owning element `id`.
    fn device_of(&self, id: &str) -> Option<&Device> {
        self.device_element(id).and_then(|element| self.device(&element.device_id))
    }
}

/// In-memory device hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCatalog {
    devices: HashMap<String, Device>,
    elements: HashMap<String, DeviceElement>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, id: impl Into<String>, machine_type: Option<u8>) -> &mut Self {
        let id = id.into();
        self.devices.insert(id.clone(), Device { id, machine_type });
        self
    }

    /// Add an element, linking it into its parent's children.
    pub fn add_element(
        &mut self,
        id: impl Into<String>,
        device_id: impl Into<String>,
        parent: Option<&str>,
    ) -> &mut Self {
        let id = id.into();
        if let Some(parent) = parent
            && let Some(parent_element) = self.elements.get_mut(parent)
            && !parent_element.children.contains(&id)
        {
            parent_element.children.push(id.clone());
        }
        self.elements.insert(
            id.clone(),
            DeviceElement {
                id,
                device_id: device_id.into(),
                parent: parent.map(str::to_string),
                children: Vec::new(),
            },
        );
        self
    }
}

impl DeviceHierarchy for DeviceCatalog {
    fn device_element(&self, id: &str) -> Option<&DeviceElement> {
        self.elements.get(id)
    }

    fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }
}

/// A product assigned to a device element during a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAllocation {
    pub product_id_ref: String,
    #[serde(default)]
    pub device_element_ref: Option<String>,
}

impl ProductAllocation {
    pub fn new(product_id_ref: impl Into<String>, device_element_ref: impl Into<String>) -> Self {
        Self {
            product_id_ref: product_id_ref.into(),
            device_element_ref: Some(device_element_ref.into()),
        }
    }
}

/// Product allocations in force for each element of `device_id`.
///
/// An allocation applies to its element and every descendant, except that a
/// descendant with allocations of its own passes those down instead.
pub fn allocations_by_element<H: DeviceHierarchy + ?Sized>(
    hierarchy: &H,
    device_id: &str,
    allocations: &[ProductAllocation],
) -> BTreeMap<String, Vec<ProductAllocation>> {
    let mut direct: HashMap<&str, Vec<&ProductAllocation>> = HashMap::new();
    for allocation in allocations {
        let Some(element_id) = allocation.device_element_ref.as_deref() else {
            continue;
        };
        if element_id.is_empty() {
            continue;
        }
        match hierarchy.device_element(element_id) {
            Some(element) if element.device_id == device_id => {
                direct.entry(element.id.as_str()).or_default().push(allocation);
            }
            _ => {}
        }
    }

    let mut output: BTreeMap<String, Vec<ProductAllocation>> = BTreeMap::new();
    let mut visited = HashSet::new();

    for (&origin, origin_allocations) in &direct {
        // Only start from elements whose allocations are not inherited from
        // an allocated ancestor; those are reached by the ancestor's walk.
        if has_allocated_ancestor(hierarchy, origin, &direct) {
            continue;
        }

        let mut stack: Vec<(&str, &Vec<&ProductAllocation>)> = vec![(origin, origin_allocations)];
        while let Some((element_id, inherited)) = stack.pop() {
            if !visited.insert(element_id.to_string()) {
                continue;
            }
            let in_force = direct.get(element_id).unwrap_or(inherited);
            trace!(element = element_id, allocations = in_force.len(), "Allocations in force");
            output.insert(element_id.to_string(), in_force.iter().map(|a| (*a).clone()).collect());

            if let Some(element) = hierarchy.device_element(element_id) {
                for child in &element.children {
                    stack.push((child.as_str(), in_force));
                }
            }
        }
    }

    debug!(device = device_id, elements = output.len(), "Propagated product allocations");
    output
}

fn has_allocated_ancestor<H: DeviceHierarchy + ?Sized>(
    hierarchy: &H,
    id: &str,
    direct: &HashMap<&str, Vec<&ProductAllocation>>,
) -> bool {
    let mut seen = HashSet::from([id.to_string()]);
    let mut parent = hierarchy.device_element(id).and_then(|e| e.parent.clone());
    while let Some(parent_id) = parent {
        if !seen.insert(parent_id.clone()) {
            return false;
        }
        if direct.contains_key(parent_id.as_str()) {
            return true;
        }
        parent = hierarchy.device_element(&parent_id).and_then(|e| e.parent.clone());
    }
    false
}

/// Distinct product ids across all allocations, ordered by element id.
pub fn distinct_product_ids(allocations: &BTreeMap<String, Vec<ProductAllocation>>) -> Vec<String> {
    let mut seen = HashSet::new();
    allocations
        .values()
        .flatten()
        .filter(|allocation| seen.insert(allocation.product_id_ref.as_str()))
        .map(|allocation| allocation.product_id_ref.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// DVC-1: DET-1 -> { DET-2 -> { DET-4, DET-5 }, DET-3 }
    fn catalog() -> DeviceCatalog {
        let mut catalog = DeviceCatalog::new();
        catalog
            .add_device("DVC-1", Some(4))
            .add_device("DVC-2", None)
            .add_element("DET-1", "DVC-1", None)
            .add_element("DET-2", "DVC-1", Some("DET-1"))
            .add_element("DET-3", "DVC-1", Some("DET-1"))
            .add_element("DET-4", "DVC-1", Some("DET-2"))
            .add_element("DET-5", "DVC-1", Some("DET-2"))
            .add_element("DET-9", "DVC-2", None);
        catalog
    }

    fn products(allocations: &[ProductAllocation]) -> Vec<&str> {
        allocations.iter().map(|a| a.product_id_ref.as_str()).collect()
    }

    #[test]
    fn depth_counts_ancestors() {
        let catalog = catalog();
        assert_eq!(catalog.depth("DET-1"), 0);
        assert_eq!(catalog.depth("DET-3"), 1);
        assert_eq!(catalog.depth("DET-5"), 2);
        assert_eq!(catalog.depth("DET-404"), 0);
        assert_eq!(catalog.device_of("DET-5").map(|d| d.id.as_str()), Some("DVC-1"));
    }

    #[test]
    fn allocations_flow_to_descendants() {
        let catalog = catalog();
        let allocations = vec![ProductAllocation::new("PDT-1", "DET-1")];

        let by_element = allocations_by_element(&catalog, "DVC-1", &allocations);
        assert_eq!(by_element.len(), 5);
        assert_eq!(products(&by_element["DET-5"]), vec!["PDT-1"]);
    }

    #[test]
    fn own_allocations_override_inherited() {
        let catalog = catalog();
        let allocations = vec![
            ProductAllocation::new("PDT-1", "DET-1"),
            ProductAllocation::new("PDT-2", "DET-2"),
            ProductAllocation::new("PDT-3", "DET-9"),
        ];

        let by_element = allocations_by_element(&catalog, "DVC-1", &allocations);
        assert_eq!(products(&by_element["DET-1"]), vec!["PDT-1"]);
        assert_eq!(products(&by_element["DET-3"]), vec!["PDT-1"]);
        assert_eq!(products(&by_element["DET-2"]), vec!["PDT-2"]);
        assert_eq!(products(&by_element["DET-4"]), vec!["PDT-2"]);
        assert!(!by_element.contains_key("DET-9"));

        assert_eq!(distinct_product_ids(&by_element), vec!["PDT-1", "PDT-2"]);
    }

    #[test]
    fn allocations_without_element_are_ignored() {
        let catalog = catalog();
        let allocations = vec![ProductAllocation {
            product_id_ref: "PDT-1".to_string(),
            device_element_ref: None,
        }];
        assert!(allocations_by_element(&catalog, "DVC-1", &allocations).is_empty());
    }
}
