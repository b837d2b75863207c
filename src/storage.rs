use std::path::{Path, PathBuf};

pub const PAYMENT_INFO_FILE: &str = "db.parquet";
pub const NDC_NAMES_FILE: &str = "ndc_names.parquet";
pub const HCPCS_DESC_FILE: &str = "hcpcs_desc.parquet";
pub const HOSPITALS_FILE: &str = "hospital.parquet";
pub const HOSPITAL_340B_FILE: &str = "hospital340b.parquet";
pub const PRICES_FILE: &str = "prices.parquet";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub payments: PathBuf,
    pub ndc_names: PathBuf,
    pub hcpcs_desc: PathBuf,
    pub hospitals: PathBuf,
    pub hospital_340b: PathBuf,
    pub prices: PathBuf,
}

impl SourceFiles {
    /// (raw view name, parquet path) pairs in load order.
    pub fn views(&self) -> [(&'static str, &Path); 6] {
        [
            ("payment_raw", self.payments.as_path()),
            ("ndc_names_raw", self.ndc_names.as_path()),
            ("hcpcs_desc_raw", self.hcpcs_desc.as_path()),
            ("hospital_raw", self.hospitals.as_path()),
            ("hospital340b_raw", self.hospital_340b.as_path()),
            ("prices_raw", self.prices.as_path()),
        ]
    }

    pub fn missing(&self) -> Vec<&Path> {
        self.views()
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| !file_present_nonempty(p))
            .collect()
    }
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn source_files(&self) -> SourceFiles {
        SourceFiles {
            payments: self.data_dir.join(PAYMENT_INFO_FILE),
            ndc_names: self.data_dir.join(NDC_NAMES_FILE),
            hcpcs_desc: self.data_dir.join(HCPCS_DESC_FILE),
            hospitals: self.data_dir.join(HOSPITALS_FILE),
            hospital_340b: self.data_dir.join(HOSPITAL_340B_FILE),
            prices: self.data_dir.join(PRICES_FILE),
        }
    }
}

pub fn file_present_nonempty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) => m.is_file() && m.len() > 0,
        Err(_) => false,
    }
}
