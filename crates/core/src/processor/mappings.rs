//! Reference data for the stage simulations: vendor approval registry,
//! product code standardization, and department/cost-center assignment.
//!
//! Ships with a built-in table covering the known vendors; deployments
//! can replace it wholesale with a JSON file via
//! `processors.code_mappings`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MappingsError {
    #[error("failed to read code mappings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse code mappings file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorMapping {
    pub vendor_code: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductMapping {
    pub standard_code: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_price_range: Option<PriceRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMapping {
    pub department_code: String,
    pub cost_center: String,
}

/// Vendor/product/department reference table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeMappings {
    vendors: HashMap<String, VendorMapping>,
    products: HashMap<String, ProductMapping>,
    /// Keyed by product category.
    departments: HashMap<String, DepartmentMapping>,
}

impl CodeMappings {
    /// The table shipped with the binary.
    pub fn builtin() -> Self {
        let vendors = HashMap::from([
            (
                "ABC Industrial Supplies".to_string(),
                VendorMapping {
                    vendor_code: "VND-ABC-001".to_string(),
                    approved: true,
                },
            ),
            (
                "Gulf Coast Chemical".to_string(),
                VendorMapping {
                    vendor_code: "VND-GCC-014".to_string(),
                    approved: true,
                },
            ),
            (
                "Northside Office Interiors".to_string(),
                VendorMapping {
                    vendor_code: "VND-NOI-205".to_string(),
                    approved: true,
                },
            ),
            (
                "Shady Imports LLC".to_string(),
                VendorMapping {
                    vendor_code: "VND-SHD-999".to_string(),
                    approved: false,
                },
            ),
        ]);

        let products = HashMap::from([
            (
                "VLV-4200-IND".to_string(),
                ProductMapping {
                    standard_code: "STD-VLV-4200".to_string(),
                    category: "Industrial Valves".to_string(),
                    expected_price_range: Some(PriceRange {
                        min: 120.0,
                        max: 180.0,
                    }),
                },
            ),
            (
                "SK-HP-4200".to_string(),
                ProductMapping {
                    standard_code: "STD-SK-4200".to_string(),
                    category: "Industrial Valves".to_string(),
                    expected_price_range: Some(PriceRange {
                        min: 90.0,
                        max: 160.0,
                    }),
                },
            ),
            (
                "CHM-SOLV-55".to_string(),
                ProductMapping {
                    standard_code: "STD-CHM-SOLV".to_string(),
                    category: "Industrial Chemicals".to_string(),
                    expected_price_range: Some(PriceRange {
                        min: 300.0,
                        max: 600.0,
                    }),
                },
            ),
        ]);

        let departments = HashMap::from([
            (
                "Industrial Valves".to_string(),
                DepartmentMapping {
                    department_code: "DEPT-MAINT-200".to_string(),
                    cost_center: "CC-2100".to_string(),
                },
            ),
            (
                "Industrial Chemicals".to_string(),
                DepartmentMapping {
                    department_code: "DEPT-OPS-310".to_string(),
                    cost_center: "CC-3150".to_string(),
                },
            ),
        ]);

        Self {
            vendors,
            products,
            departments,
        }
    }

    /// Load a replacement table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, MappingsError> {
        let raw = std::fs::read_to_string(path)?;
        let mappings: Self = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            vendors = mappings.vendors.len(),
            products = mappings.products.len(),
            "loaded code mappings"
        );
        Ok(mappings)
    }

    /// Resolve a vendor by invoice name. Exact match first, then
    /// case-insensitive, then a registry name contained in the invoice
    /// name (letterheads often append a suffix the registry lacks).
    /// Unknown vendors are unapproved.
    pub fn vendor(&self, name: &str) -> VendorMapping {
        let name = name.trim();
        if let Some(mapping) = self.vendors.get(name) {
            return mapping.clone();
        }

        let lower = name.to_lowercase();
        self.vendors
            .iter()
            .find(|(key, _)| {
                let key = key.to_lowercase();
                key == lower || (!key.is_empty() && lower.contains(&key))
            })
            .map(|(_, mapping)| mapping.clone())
            .unwrap_or_else(|| VendorMapping {
                vendor_code: "VND-UNKNOWN-000".to_string(),
                approved: false,
            })
    }

    /// Resolve a product code; unknown codes standardize mechanically
    /// with no price expectations.
    pub fn product(&self, code: &str) -> ProductMapping {
        self.products
            .get(code)
            .cloned()
            .unwrap_or_else(|| ProductMapping {
                standard_code: format!("STD-{code}"),
                category: "General".to_string(),
                expected_price_range: None,
            })
    }

    /// Department and cost center for a product category.
    pub fn department_for(&self, category: &str) -> DepartmentMapping {
        self.departments
            .get(category)
            .cloned()
            .unwrap_or_else(|| DepartmentMapping {
                department_code: "DEPT-PROC-000".to_string(),
                cost_center: "CC-0000".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_vendor_lookup() {
        let mappings = CodeMappings::builtin();

        let abc = mappings.vendor("ABC Industrial Supplies");
        assert_eq!(abc.vendor_code, "VND-ABC-001");
        assert!(abc.approved);

        assert!(!mappings.vendor("Shady Imports LLC").approved);
    }

    #[test]
    fn test_vendor_lookup_tolerates_case_and_suffixes() {
        let mappings = CodeMappings::builtin();

        assert_eq!(
            mappings.vendor("abc industrial supplies").vendor_code,
            "VND-ABC-001"
        );
        assert_eq!(
            mappings.vendor("ABC Industrial Supplies, Inc.").vendor_code,
            "VND-ABC-001"
        );
    }

    #[test]
    fn test_unknown_vendor_is_unapproved() {
        let unknown = CodeMappings::builtin().vendor("Totally New Vendor");
        assert_eq!(unknown.vendor_code, "VND-UNKNOWN-000");
        assert!(!unknown.approved);
    }

    #[test]
    fn test_product_lookup_and_fallback() {
        let mappings = CodeMappings::builtin();

        let valve = mappings.product("VLV-4200-IND");
        assert_eq!(valve.standard_code, "STD-VLV-4200");
        let range = valve.expected_price_range.unwrap();
        assert_eq!(range.min, 120.0);
        assert_eq!(range.max, 180.0);

        let unknown = mappings.product("XX-999");
        assert_eq!(unknown.standard_code, "STD-XX-999");
        assert_eq!(unknown.category, "General");
        assert!(unknown.expected_price_range.is_none());
    }

    #[test]
    fn test_department_assignment() {
        let mappings = CodeMappings::builtin();

        let valves = mappings.department_for("Industrial Valves");
        assert_eq!(valves.department_code, "DEPT-MAINT-200");
        assert_eq!(valves.cost_center, "CC-2100");

        let other = mappings.department_for("Stationery");
        assert_eq!(other.department_code, "DEPT-PROC-000");
    }

    #[test]
    fn test_from_json_file_replaces_builtin() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            serde_json::json!({
                "vendors": {
                    "Acme Corp": {"vendorCode": "VND-ACME-1", "approved": true}
                },
                "products": {},
                "departments": {}
            })
            .to_string(),
        )
        .unwrap();

        let mappings = CodeMappings::from_json_file(file.path()).unwrap();
        assert!(mappings.vendor("Acme Corp").approved);
        // The built-in table is gone; this is a replacement, not a merge.
        assert!(!mappings.vendor("ABC Industrial Supplies").approved);
    }

    #[test]
    fn test_from_json_file_bad_json_is_parse_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();

        let err = CodeMappings::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, MappingsError::Parse(_)));
    }
}
