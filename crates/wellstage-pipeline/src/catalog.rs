//! Staging table catalog
//!
//! Describes every staging table the pipeline can load: its foreign-key
//! references to other staging tables, the API collection it is fed from (if
//! any), whether its target carries a uniqueness constraint the duplicate-skip
//! insert can key on, and an optional batch-size override.
//!
//! The catalog is the single declaration the resolver computes the load order
//! from; there is no hand-maintained order list to drift out of sync.

/// Slice size for the note table, which carries large free-text fields that
/// can overflow network/SSL buffers at the default size.
pub const NOTE_BATCH_SIZE: usize = 500;

/// A foreign-key edge from one staging table to another
#[derive(Debug, Clone)]
pub struct Reference {
    /// Referencing column(s) on this table
    pub columns: Vec<String>,
    /// Referenced table name
    pub table: String,
    /// Key column(s) on the referenced table
    pub referenced_columns: Vec<String>,
}

impl Reference {
    pub fn new(column: &str, table: &str, referenced_column: &str) -> Self {
        Self {
            columns: vec![column.to_string()],
            table: table.to_string(),
            referenced_columns: vec![referenced_column.to_string()],
        }
    }

    /// Composite-key reference
    pub fn composite(columns: &[&str], table: &str, referenced_columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            table: table.to_string(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One staging table
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub references: Vec<Reference>,
    /// API collection this table is fed from; None for file-fed tables
    pub endpoint: Option<String>,
    /// Whether the target declares a uniqueness constraint. Without one the
    /// duplicate-skip insert cannot make retries idempotent and the loader
    /// warns before writing.
    pub has_natural_key: bool,
    /// Per-table slice size override
    pub batch_size: Option<usize>,
}

impl TableDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            references: Vec::new(),
            endpoint: None,
            has_natural_key: true,
            batch_size: None,
        }
    }

    pub fn references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn without_natural_key(mut self) -> Self {
        self.has_natural_key = false;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// The declared set of staging tables
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: Vec<TableDescriptor>,
}

impl Catalog {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables fed from the API source, with their collection names
    pub fn api_tables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables
            .iter()
            .filter_map(|t| t.endpoint.as_deref().map(|e| (t.name.as_str(), e)))
    }

    /// Effective slice size for a table, falling back to the configured default
    pub fn batch_size_for(&self, name: &str, default: usize) -> usize {
        self.get(name).and_then(|t| t.batch_size).unwrap_or(default)
    }

    /// The full production staging catalog
    ///
    /// Table and constraint shapes follow the staging schema owned by the
    /// external migration tool; this declaration must be kept in step with it.
    pub fn staging() -> Self {
        Self::new(vec![
            // ProCount / Aries dimension tables, fed from CSV exports
            TableDescriptor::new("stg_pro_count__areatb"),
            TableDescriptor::new("stg_pro_count__batterytb"),
            TableDescriptor::new("stg_pro_count__divisiontb"),
            TableDescriptor::new("stg_pro_count__fieldgrouptb"),
            TableDescriptor::new("stg_pro_count__producingmethodstb"),
            TableDescriptor::new("stg_pro_count__producingstatustb"),
            TableDescriptor::new("stg_pro_count__routetb"),
            TableDescriptor::new("stg_pro_count__statecountynamestb"),
            TableDescriptor::new("stg_aries__ac_property"),
            TableDescriptor::new("stg_pro_count__completiontb").references(vec![
                Reference::new(
                    "producingstatus",
                    "stg_pro_count__producingstatustb",
                    "producingstatusmerrickid",
                ),
                Reference::new(
                    "producingmethod",
                    "stg_pro_count__producingmethodstb",
                    "producingmethodsmerrickid",
                ),
                Reference::new("routeid", "stg_pro_count__routetb", "routemerrickid"),
                Reference::new("divisionid", "stg_pro_count__divisiontb", "divisionmerrickid"),
                Reference::new(
                    "fieldgroupid",
                    "stg_pro_count__fieldgrouptb",
                    "fieldgroupmerrickid",
                ),
                Reference::new("areaid", "stg_pro_count__areatb", "areamerrickid"),
                Reference::new("batteryid", "stg_pro_count__batterytb", "batterymerrickid"),
                Reference::new("ariesid", "stg_aries__ac_property", "propnum"),
                Reference::composite(
                    &["stateid", "countyid"],
                    "stg_pro_count__statecountynamestb",
                    &["statecode", "countycode"],
                ),
            ]),
            // WellView, fed from the API
            TableDescriptor::new("stg_wellview__wellheader").endpoint("wellview_wellheader"),
            TableDescriptor::new("stg_wellview__job")
                .endpoint("wellview_job")
                .references(vec![Reference::new(
                    "idwell",
                    "stg_wellview__wellheader",
                    "idwell",
                )]),
            TableDescriptor::new("stg_wellview__jobreport")
                .endpoint("wellview_jobreport")
                .references(vec![
                    Reference::new("idwell", "stg_wellview__wellheader", "idwell"),
                    Reference::new("idrecparent", "stg_wellview__job", "idrec"),
                ]),
            TableDescriptor::new("stg_wellview__surveypoint")
                .endpoint("wellview_surveypoint")
                .references(vec![Reference::new(
                    "well_id",
                    "stg_wellview__wellheader",
                    "idwell",
                )])
                .without_natural_key(),
            // WiseRock, fed from the API. The note->user edge is not declared
            // as a database FK but the load order depends on it.
            TableDescriptor::new("stg_wiserock__user").endpoint("wiserock_user"),
            TableDescriptor::new("stg_wiserock__note")
                .endpoint("wiserock_note")
                .references(vec![Reference::new(
                    "user_id",
                    "stg_wiserock__user",
                    "user_id",
                )])
                .batch_size(NOTE_BATCH_SIZE),
            // Standalone API tables
            TableDescriptor::new("stg_aries__daily_capacities").endpoint("aries_daily_capacities"),
            TableDescriptor::new("stg_pro_count__completiondailytb")
                .endpoint("procount_completiondailytb")
                .without_natural_key(),
            TableDescriptor::new("stg_eia__oil_price").endpoint("eia_oil_price"),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_catalog_references_declared_tables() {
        let catalog = Catalog::staging();
        for table in catalog.tables() {
            for reference in &table.references {
                assert!(
                    catalog.get(&reference.table).is_some(),
                    "{} references undeclared {}",
                    table.name,
                    reference.table
                );
                assert_eq!(reference.columns.len(), reference.referenced_columns.len());
            }
        }
    }

    #[test]
    fn test_batch_size_override() {
        let catalog = Catalog::staging();
        assert_eq!(
            catalog.batch_size_for("stg_wiserock__note", 5000),
            NOTE_BATCH_SIZE
        );
        assert_eq!(
            catalog.batch_size_for("stg_wellview__wellheader", 5000),
            5000
        );
    }

    #[test]
    fn test_api_tables_have_endpoints() {
        let catalog = Catalog::staging();
        let endpoints: Vec<_> = catalog.api_tables().collect();
        assert!(endpoints.contains(&("stg_wiserock__note", "wiserock_note")));
        assert!(!endpoints
            .iter()
            .any(|(table, _)| *table == "stg_pro_count__areatb"));
    }
}
