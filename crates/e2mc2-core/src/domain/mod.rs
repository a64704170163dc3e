pub mod errors;

pub use errors::{E2mc2Error, E2mc2ErrorCategory, E2mc2Result};

use std::fmt::{Display, Formatter};

/// Logical fields of a cluster expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionField {
    Lattice,
    Clusters,
    Eci,
    GroundState,
}

impl ExpansionField {
    /// Key used in the JSON document form.
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::Lattice => "lat",
            Self::Clusters => "clusters",
            Self::Eci => "eci",
            Self::GroundState => "gs",
        }
    }

    /// File name in the directory form, also the archive entry name.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Lattice => LATTICE_FILE,
            Self::Clusters => CLUSTERS_FILE,
            Self::Eci => ECI_FILE,
            Self::GroundState => GROUND_STATE_FILE,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        EXPANSION_FILES
            .iter()
            .find(|(file_name, _)| *file_name == name)
            .map(|(_, field)| *field)
    }
}

impl Display for ExpansionField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).document_key())
    }
}

pub const LATTICE_FILE: &str = "lat.in";
pub const CLUSTERS_FILE: &str = "clusters.out";
pub const ECI_FILE: &str = "eci.out";
pub const GROUND_STATE_FILE: &str = "gs_str.out";

/// Physical file name to logical field, in the order files are written.
pub const EXPANSION_FILES: [(&str, ExpansionField); 4] = [
    (LATTICE_FILE, ExpansionField::Lattice),
    (CLUSTERS_FILE, ExpansionField::Clusters),
    (ECI_FILE, ExpansionField::Eci),
    (GROUND_STATE_FILE, ExpansionField::GroundState),
];

pub const DEFAULT_ECI_PRECISION: usize = 6;
