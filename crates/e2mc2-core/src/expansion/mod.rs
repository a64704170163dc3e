//! Cluster-expansion container and its three storage layouts.
//!
//! A [`ClusterExpansion`] can be loaded from a directory holding `lat.in`,
//! `clusters.out`, `eci.out` and `gs_str.out`, from a tar archive carrying the
//! same four entries, or from a JSON document with the keys `lat`, `clusters`,
//! `eci` and `gs`. Each layout can be written back out; the directory and
//! archive layouts store ECI values at a fixed decimal precision.

mod archive;
mod parser;

pub use parser::{format_eci, join_clusters, parse_eci, split_clusters};

use crate::domain::{
    DEFAULT_ECI_PRECISION, E2mc2Error, E2mc2Result, EXPANSION_FILES, ExpansionField,
};
use crate::serialization::write_text_artifact;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Physical form of an expansion input, decided once by probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionSource {
    Directory(PathBuf),
    Archive(PathBuf),
    Document(PathBuf),
}

impl ExpansionSource {
    /// Classifies `path` by ordered probes: directory, then tar archive, then document.
    pub fn classify(path: impl AsRef<Path>) -> E2mc2Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(unrecognized_input(path, "path does not exist"));
        }
        if archive::is_tar_archive(path) {
            return Ok(Self::Archive(path.to_path_buf()));
        }
        Ok(Self::Document(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Archive(path) | Self::Document(path) => path,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Directory(_) => "directory",
            Self::Archive(_) => "archive",
            Self::Document(_) => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterExpansion {
    lattice: String,
    clusters: Vec<String>,
    eci: Vec<f64>,
    ground_state: String,
}

/// JSON document layout. Field order is the sorted key order.
#[derive(Debug, Serialize)]
struct ExpansionDocument<'a> {
    clusters: &'a [String],
    eci: &'a [f64],
    gs: &'a str,
    lat: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExpansionDocumentOwned {
    lat: String,
    clusters: ClustersField,
    eci: EciField,
    gs: String,
}

/// Older documents stored `clusters` and `eci` as the flat file text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClustersField {
    Blocks(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EciField {
    Values(Vec<f64>),
    Text(String),
}

impl ClusterExpansion {
    /// Builds an expansion from its fields, checking that every cluster has one finite ECI.
    pub fn new(
        lattice: impl Into<String>,
        clusters: Vec<String>,
        eci: Vec<f64>,
        ground_state: impl Into<String>,
    ) -> E2mc2Result<Self> {
        if eci.len() != clusters.len() {
            return Err(E2mc2Error::input_validation(
                "INPUT.ECI_CLUSTER_COUNT",
                format!(
                    "expansion has {} ECI values but {} cluster blocks",
                    eci.len(),
                    clusters.len()
                ),
            ));
        }
        if let Some((index, value)) = eci.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(E2mc2Error::input_validation(
                "INPUT.ECI_NON_FINITE",
                format!("ECI value {} for cluster {} is not finite", value, index + 1),
            ));
        }

        Ok(Self {
            lattice: lattice.into(),
            clusters,
            eci,
            ground_state: ground_state.into(),
        })
    }

    /// Loads an expansion from a directory, tar archive or JSON document.
    pub fn load(path: impl AsRef<Path>) -> E2mc2Result<Self> {
        let source = ExpansionSource::classify(path)?;
        Self::load_source(&source)
    }

    pub fn load_source(source: &ExpansionSource) -> E2mc2Result<Self> {
        debug!(
            "loading cluster expansion from {} '{}'",
            source.kind(),
            source.path().display()
        );
        match source {
            ExpansionSource::Directory(path) => Self::from_dir(path),
            ExpansionSource::Archive(path) => Self::from_tar(path),
            ExpansionSource::Document(path) => Self::from_json_file(path),
        }
    }

    pub fn from_dir(dir: &Path) -> E2mc2Result<Self> {
        let mut contents = HashMap::with_capacity(EXPANSION_FILES.len());
        for (file_name, field) in EXPANSION_FILES {
            let path = dir.join(file_name);
            if !path.is_file() {
                return Err(missing_field(field, &dir.display().to_string()));
            }
            let text = fs::read_to_string(&path).map_err(|source| {
                E2mc2Error::io_system(
                    "IO.EXPANSION_READ",
                    format!("failed to read '{}': {}", path.display(), source),
                )
            })?;
            contents.insert(field, text);
        }
        Self::from_file_contents(contents, &dir.display().to_string())
    }

    pub fn from_tar(path: &Path) -> E2mc2Result<Self> {
        let contents = archive::read_archive_entries(path)?;
        Self::from_file_contents(contents, &path.display().to_string())
    }

    pub fn from_json_file(path: &Path) -> E2mc2Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| {
            unrecognized_input(path, &format!("unreadable as text: {}", source))
        })?;
        let value = serde_json::from_str::<serde_json::Value>(&content).map_err(|source| {
            unrecognized_input(path, &format!("not a JSON document: {}", source))
        })?;
        if !value.is_object() {
            return Err(unrecognized_input(path, "JSON document is not an object"));
        }
        Self::from_document_value(value, &path.display().to_string())
    }

    pub fn from_json_str(content: &str) -> E2mc2Result<Self> {
        let value = serde_json::from_str::<serde_json::Value>(content).map_err(|source| {
            E2mc2Error::format(
                "FORMAT.DOCUMENT",
                format!("expansion document is not valid JSON: {}", source),
            )
        })?;
        Self::from_document_value(value, "expansion document")
    }

    fn from_document_value(value: serde_json::Value, origin: &str) -> E2mc2Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(E2mc2Error::format(
                "FORMAT.DOCUMENT",
                format!("'{}' is not a JSON object", origin),
            ));
        };
        for (_, field) in EXPANSION_FILES {
            if !object.contains_key(field.document_key()) {
                return Err(missing_field(field, origin));
            }
        }

        let document = serde_json::from_value::<ExpansionDocumentOwned>(value).map_err(|source| {
            E2mc2Error::format(
                "FORMAT.DOCUMENT",
                format!("'{}' has malformed expansion fields: {}", origin, source),
            )
        })?;
        Self::from_document(document)
    }

    fn from_document(document: ExpansionDocumentOwned) -> E2mc2Result<Self> {
        let clusters = match document.clusters {
            ClustersField::Blocks(blocks) => blocks,
            ClustersField::Text(text) => split_clusters(&text),
        };
        let eci = match document.eci {
            EciField::Values(values) => values,
            EciField::Text(text) => parse_eci(&text, ExpansionField::Eci.document_key())?,
        };
        Self::new(document.lat, clusters, eci, document.gs)
    }

    fn from_file_contents(
        mut contents: HashMap<ExpansionField, String>,
        origin: &str,
    ) -> E2mc2Result<Self> {
        let mut take = |field: ExpansionField| {
            contents
                .remove(&field)
                .ok_or_else(|| missing_field(field, origin))
        };

        let lattice = take(ExpansionField::Lattice)?;
        let clusters = split_clusters(&take(ExpansionField::Clusters)?);
        let eci = parse_eci(&take(ExpansionField::Eci)?, ExpansionField::Eci.file_name())?;
        let ground_state = take(ExpansionField::GroundState)?;
        Self::new(lattice, clusters, eci, ground_state)
    }

    pub fn lattice(&self) -> &str {
        &self.lattice
    }

    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    pub fn eci(&self) -> &[f64] {
        &self.eci
    }

    pub fn ground_state(&self) -> &str {
        &self.ground_state
    }

    /// Number of cluster terms; the ECI list is authoritative.
    pub fn cluster_count(&self) -> usize {
        self.eci.len()
    }

    pub fn to_json_string(&self) -> E2mc2Result<String> {
        serde_json::to_string(&self.document()).map_err(|source| {
            E2mc2Error::io_system(
                "IO.SERIALIZE_JSON",
                format!("failed to serialize expansion document: {}", source),
            )
        })
    }

    pub fn to_json_value(&self) -> E2mc2Result<serde_json::Value> {
        serde_json::to_value(self.document()).map_err(|source| {
            E2mc2Error::io_system(
                "IO.SERIALIZE_JSON",
                format!("failed to serialize expansion document: {}", source),
            )
        })
    }

    pub fn write_json(&self, path: &Path) -> E2mc2Result<()> {
        write_text_artifact(path, &self.to_json_string()?)
    }

    pub fn write_dir(&self, dir: &Path) -> E2mc2Result<()> {
        self.write_dir_with_precision(dir, DEFAULT_ECI_PRECISION)
    }

    pub fn write_dir_with_precision(&self, dir: &Path, precision: usize) -> E2mc2Result<()> {
        fs::create_dir_all(dir).map_err(|source| {
            E2mc2Error::io_system(
                "IO.EXPANSION_DIRECTORY",
                format!("failed to create directory '{}': {}", dir.display(), source),
            )
        })?;

        for (file_name, content) in self.file_contents(precision) {
            write_text_artifact(&dir.join(file_name), &content)?;
        }
        Ok(())
    }

    pub fn write_tar(&self, path: &Path) -> E2mc2Result<()> {
        self.write_tar_with_precision(path, DEFAULT_ECI_PRECISION)
    }

    pub fn write_tar_with_precision(&self, path: &Path, precision: usize) -> E2mc2Result<()> {
        archive::write_archive(path, &self.file_contents(precision))
    }

    /// Flat file text for each entry of the directory and archive layouts.
    pub fn file_contents(&self, precision: usize) -> Vec<(&'static str, String)> {
        EXPANSION_FILES
            .iter()
            .map(|(file_name, field)| {
                let content = match field {
                    ExpansionField::Lattice => self.lattice.clone(),
                    ExpansionField::Clusters => join_clusters(&self.clusters),
                    ExpansionField::Eci => format_eci(&self.eci, precision),
                    ExpansionField::GroundState => self.ground_state.clone(),
                };
                (*file_name, content)
            })
            .collect()
    }

    fn document(&self) -> ExpansionDocument<'_> {
        ExpansionDocument {
            clusters: &self.clusters,
            eci: &self.eci,
            gs: &self.ground_state,
            lat: &self.lattice,
        }
    }
}

fn missing_field(field: ExpansionField, origin: &str) -> E2mc2Error {
    E2mc2Error::missing_data(
        "DATA.MISSING_FIELD",
        format!(
            "'{}' has no '{}' entry for field '{}'",
            origin,
            field.file_name(),
            field.document_key()
        ),
    )
}

fn unrecognized_input(path: &Path, detail: &str) -> E2mc2Error {
    E2mc2Error::format(
        "FORMAT.UNRECOGNIZED_INPUT",
        format!(
            "'{}' is not a directory, a tar archive or a JSON expansion document ({})",
            path.display(),
            detail
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::{ClusterExpansion, ExpansionSource};
    use crate::domain::{E2mc2ErrorCategory, EXPANSION_FILES};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn fixture_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/MgAl2O4.json")
    }

    fn spinel() -> ClusterExpansion {
        ClusterExpansion::load(fixture_path()).expect("fixture document should load")
    }

    fn assert_same_fields(actual: &ClusterExpansion, expected: &ClusterExpansion) {
        assert_eq!(actual.lattice(), expected.lattice());
        assert_eq!(actual.ground_state(), expected.ground_state());
        assert_eq!(actual.clusters(), expected.clusters());
        assert_eq!(actual.eci().len(), expected.eci().len());
        for (a, e) in actual.eci().iter().zip(expected.eci()) {
            assert!((a - e).abs() <= 5.0e-7, "ECI {a} differs from {e}");
        }
    }

    #[test]
    fn fixture_document_loads_all_fields() {
        let ce = spinel();
        assert_eq!(ce.cluster_count(), 9);
        assert_eq!(ce.clusters().len(), 9);
        assert!(ce.lattice().ends_with('\n'));
        assert!((ce.eci()[0] + 1.62371).abs() < 1.0e-12);
        assert_eq!(ce.eci()[2], 0.0);
    }

    #[test]
    fn document_to_directory_round_trip_is_lossless_at_precision() {
        let temp = TempDir::new().expect("tempdir should be created");
        let dir = temp.path().join("ce");
        let ce = spinel();

        ce.write_dir(&dir).expect("directory should be written");
        for (file_name, _) in EXPANSION_FILES {
            assert!(dir.join(file_name).is_file(), "{file_name} should exist");
        }
        assert_eq!(
            fs::read_to_string(dir.join("eci.out")).expect("eci.out"),
            "-1.623710\n0.243466\n0.000000\n0.164667\n0.110744\n-0.030886\n\
             -0.063562\n-0.030195\n-0.060852\n"
        );

        let reloaded = ClusterExpansion::load(&dir).expect("directory should load");
        assert_same_fields(&reloaded, &ce);
    }

    #[test]
    fn archive_round_trip_reproduces_fields() {
        let temp = TempDir::new().expect("tempdir should be created");
        let tar_path = temp.path().join("ce.tar");
        let ce = spinel();

        ce.write_tar(&tar_path).expect("archive should be written");
        assert_eq!(
            ExpansionSource::classify(&tar_path).expect("classify"),
            ExpansionSource::Archive(tar_path.clone())
        );

        let reloaded = ClusterExpansion::load(&tar_path).expect("archive should load");
        assert_same_fields(&reloaded, &ce);

        let again = temp.path().join("again.tar");
        reloaded.write_tar(&again).expect("second archive should be written");
        assert_eq!(
            fs::read(&tar_path).expect("first archive"),
            fs::read(&again).expect("second archive")
        );
    }

    #[test]
    fn json_output_is_byte_stable_with_sorted_keys() {
        let temp = TempDir::new().expect("tempdir should be created");
        let first = temp.path().join("first.json");
        let second = temp.path().join("second.json");
        let ce = spinel();

        ce.write_json(&first).expect("first document should be written");
        ClusterExpansion::load(&first)
            .expect("document should reload")
            .write_json(&second)
            .expect("second document should be written");

        let text = fs::read_to_string(&first).expect("document should be readable");
        assert_eq!(text, fs::read_to_string(&second).expect("second document"));

        let positions = ["\"clusters\"", "\"eci\"", "\"gs\"", "\"lat\""]
            .map(|key| text.find(key).expect("key should be present"));
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        let value = ce.to_json_value().expect("value should build");
        assert!(value["eci"].as_array().expect("eci array")[0].is_number());
        assert!(value["clusters"].as_array().expect("clusters array")[0].is_string());
    }

    #[test]
    fn legacy_text_fields_are_parsed() {
        let ce = ClusterExpansion::from_json_str(
            r#"{"lat": "lattice\n", "gs": "gs\n",
                "clusters": "1\n0\n1\n0 0 0\n\n2\n1.5\n2\n0 0 0\n1 0 0\n\n",
                "eci": "-1.000000\n0.250000\n"}"#,
        )
        .expect("legacy document should load");

        assert_eq!(ce.clusters().len(), 2);
        assert_eq!(ce.eci(), &[-1.0, 0.25]);
    }

    #[test]
    fn mismatched_eci_and_cluster_counts_are_rejected() {
        let error = ClusterExpansion::new("lat", vec!["a".to_string()], vec![1.0, 2.0], "gs")
            .expect_err("count mismatch should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::InputValidation);
        assert_eq!(error.placeholder(), "INPUT.ECI_CLUSTER_COUNT");
    }

    #[test]
    fn missing_directory_file_names_the_field() {
        let temp = TempDir::new().expect("tempdir should be created");
        let dir = temp.path().join("ce");
        spinel().write_dir(&dir).expect("directory should be written");
        fs::remove_file(dir.join("gs_str.out")).expect("gs_str.out should be removed");

        let error = ClusterExpansion::load(&dir).expect_err("missing file should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::MissingData);
        assert!(error.message().contains("gs_str.out"));
        assert!(error.message().contains("'gs'"));
    }

    #[test]
    fn missing_archive_entry_names_the_field() {
        let temp = TempDir::new().expect("tempdir should be created");
        let tar_path = temp.path().join("partial.tar");
        {
            let file = fs::File::create(&tar_path).expect("archive should be created");
            let mut builder = tar::Builder::new(file);
            let body = b"lattice\n";
            let mut header = tar::Header::new_ustar();
            header.set_path("lat.in").expect("path should be set");
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &body[..]).expect("entry should append");
            builder.finish().expect("archive should finish");
        }

        let error = ClusterExpansion::load(&tar_path).expect_err("missing entry should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::MissingData);
        assert!(error.message().contains("clusters.out"));
    }

    #[test]
    fn malformed_eci_file_is_a_parse_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let dir = temp.path().join("ce");
        spinel().write_dir(&dir).expect("directory should be written");
        fs::write(dir.join("eci.out"), "0.1\nbogus\n").expect("eci.out should be replaced");

        let error = ClusterExpansion::load(&dir).expect_err("bad ECI should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::Parse);
        assert!(error.message().contains("bogus"));
    }

    #[test]
    fn carriage_returns_in_clusters_survive_every_layout() {
        let temp = TempDir::new().expect("tempdir should be created");
        let ce = ClusterExpansion::new(
            "lattice\r\n",
            vec!["1\r\n0\r\n0".to_string(), "2\r\n1.5\r\n1\r\n0 0 0".to_string()],
            vec![-1.0, 0.5],
            "gs\r\n",
        )
        .expect("expansion should build");

        let dir = temp.path().join("ce");
        ce.write_dir(&dir).expect("directory should be written");
        let from_dir = ClusterExpansion::load(&dir).expect("directory should load");
        assert_eq!(from_dir, ce);

        let tar_path = temp.path().join("ce.tar");
        from_dir.write_tar(&tar_path).expect("archive should be written");
        let from_tar = ClusterExpansion::load(&tar_path).expect("archive should load");
        assert_eq!(from_tar, ce);
    }

    #[test]
    fn document_without_a_field_is_missing_data() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("partial.json");
        fs::write(&path, r#"{"lat": "l", "clusters": ["a"], "eci": [1.0]}"#)
            .expect("document should be written");

        let error = ClusterExpansion::load(&path).expect_err("missing gs should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::MissingData);
        assert_eq!(error.placeholder(), "DATA.MISSING_FIELD");
        assert!(error.message().contains("'gs'"));

        let error = ClusterExpansion::from_json_str(r#"{"gs": "g", "clusters": [], "eci": []}"#)
            .expect_err("missing lat should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::MissingData);
        assert!(error.message().contains("'lat'"));
    }

    #[test]
    fn mistyped_document_field_is_a_format_error() {
        let error =
            ClusterExpansion::from_json_str(r#"{"lat": 1, "gs": "g", "clusters": [], "eci": []}"#)
                .expect_err("numeric lat should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::Format);
        assert_eq!(error.placeholder(), "FORMAT.DOCUMENT");
    }

    #[test]
    fn non_finite_eci_cannot_reach_the_document_layout() {
        let error = ClusterExpansion::new("lat", vec!["a".to_string()], vec![f64::NAN], "gs")
            .expect_err("NaN ECI should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::InputValidation);
        assert_eq!(error.placeholder(), "INPUT.ECI_NON_FINITE");

        let temp = TempDir::new().expect("tempdir should be created");
        let dir = temp.path().join("ce");
        spinel().write_dir(&dir).expect("directory should be written");
        let eci: String = std::iter::once("nan\n")
            .chain(std::iter::repeat_n("0.1\n", 8))
            .collect();
        fs::write(dir.join("eci.out"), eci).expect("eci.out should be replaced");

        let error = ClusterExpansion::load(&dir).expect_err("nan in eci.out should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::Parse);
        assert_eq!(error.placeholder(), "PARSE.ECI_VALUE");
    }

    #[test]
    fn empty_archive_is_missing_data() {
        let temp = TempDir::new().expect("tempdir should be created");
        let tar_path = temp.path().join("empty.tar");
        tar::Builder::new(fs::File::create(&tar_path).expect("archive should be created"))
            .finish()
            .expect("archive should finish");

        assert_eq!(
            ExpansionSource::classify(&tar_path).expect("classify"),
            ExpansionSource::Archive(tar_path.clone())
        );
        let error = ClusterExpansion::load(&tar_path).expect_err("empty archive should fail");
        assert_eq!(error.category(), E2mc2ErrorCategory::MissingData);
        assert!(error.message().contains("lat.in"));
    }

    #[test]
    fn unrecognized_inputs_are_format_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let text = temp.path().join("notes.txt");
        fs::write(&text, "neither tar nor json\n").expect("file should be written");

        for path in [text, temp.path().join("absent")] {
            let error = ClusterExpansion::load(&path).expect_err("load should fail");
            assert_eq!(error.category(), E2mc2ErrorCategory::Format);
            assert_eq!(error.placeholder(), "FORMAT.UNRECOGNIZED_INPUT");
        }
    }
}
