// src/dataset/mod.rs
pub mod layout;
pub mod test_id;

use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt};

pub use layout::{OutputLayout, Stage};
pub use test_id::TestIdPattern;

/// Column holding the network-function role of a dump record.
pub const DISCRIMINATOR_COLUMN: &str = "pm-Containers.type";

/// Administrative columns dropped when splitting by category.
pub static EXTRA_DROP: &[&str] = &[DISCRIMINATOR_COLUMN, "pm-Containers.nRCGI.pLMN-Identity"];

/// Name the exporter's positional index column gets once loaded.
pub const POSITIONAL_COLUMN: &str = "Unnamed: 0";
pub const ORIGINAL_INDEX_COLUMN: &str = "Original index";
pub const TEST_ID_COLUMN: &str = "Test ID";
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Raw field name → display name.
static RENAMING: &[(&str, &str)] = &[
    ("pm-Containers.pLMN-Identity", "PLMN ID"),
    ("list-of-matched-UEs.ueId", "UE ID"),
    ("cellObjectID", "Cell object ID"),
    ("timestamp", TIMESTAMP_COLUMN),
    ("list-of-matched-UEs.pmType", "UE Performance Measurement type"),
    ("pm-Containers.dl-PRBUsage", "DL PRB usage"),
    ("pm-Containers.ul-PRBUsage", "UL PRB usage"),
    ("pm-Containers.dl-TotalofAvailablePRBs", "DL total available PRBs"),
    ("pm-Containers.ul-TotalofAvailablePRBs", "UL total available PRBs"),
    ("pm-Containers.nRCGI.nRCellIdentity", "NRCI"),
    ("list-of-matched-UEs.pmVal", "UE Performance Measurement value"),
    ("pm-Containers.qci", "QCI"),
    ("pm-Containers.drbqci", "DRB QCI"),
    ("pm-Containers.pDCPBytesDL", "DL PCDP Bytes"),
    ("pm-Containers.pDCPBytesUL", "UL PDCP Bytes"),
    ("pm-Containers.interface-type", "Interface type"),
    ("pm-Containers.numberOfActive-UEs", "Number of active UEs"),
    ("list-of-matched-UEs.rrcEvent", "RRC Event"),
    (
        "list-of-matched-UEs.measResultNeighCells.resultsSSB-Cell.sinr",
        "Neighbor cells SINR",
    ),
    (
        "list-of-matched-UEs.measResultNeighCells.physCellId",
        "Neighbor cell physical cell ID",
    ),
];

static RENAME_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| RENAMING.iter().copied().collect());

/// Display name for a raw field, if it has one.
pub fn display_name(raw: &str) -> Option<&'static str> {
    RENAME_MAP.get(raw).copied()
}

/// The three network-function roles a dump record can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Du,
    CuUp,
    CuCp,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Du, Category::CuUp, Category::CuCp];

    /// Short label used in file names: `DU`, `CU-UP`, `CU-CP`.
    pub fn label(self) -> &'static str {
        match self {
            Category::Du => "DU",
            Category::CuUp => "CU-UP",
            Category::CuCp => "CU-CP",
        }
    }

    /// Value of [`DISCRIMINATOR_COLUMN`] selecting this category.
    pub fn discriminator(self) -> &'static str {
        match self {
            Category::Du => "oDU",
            Category::CuUp => "oCU-UP",
            Category::CuCp => "oCU-CP",
        }
    }

    /// File name stem prefix, e.g. `CU-UPData`.
    pub fn file_prefix(self) -> String {
        format!("{}Data", self.label())
    }

    /// Per-test file name, e.g. `CU-UPData_Test3.csv`.
    pub fn test_file_name(self, test_id: u32) -> String {
        format!("{}_Test{}.csv", self.file_prefix(), test_id)
    }

    /// Recover the category from a file name like `DUData_Test3.csv`.
    pub fn from_file_name(name: &str) -> Option<Category> {
        let prefix = name.split('_').next()?;
        Category::ALL.into_iter().find(|c| c.file_prefix() == prefix)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
