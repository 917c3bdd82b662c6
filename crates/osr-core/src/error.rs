use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the OSR analytics pipeline.
#[derive(Error, Debug)]
pub enum OsrError {
    /// A file exists but could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A yearly source file exists but could not be parsed into a table.
    #[error("Error reading {path}: {reason}. Please ensure the file has a valid format.")]
    MalformedSource { path: PathBuf, reason: String },

    /// Not a single yearly source file could be loaded.
    #[error("No data found in {data_dir}. Please ensure the yearly CSV files are present.")]
    NoDataAvailable { data_dir: PathBuf },

    /// Quantile segmentation would produce empty or duplicate bins.
    #[error(
        "Cannot segment into {bins} equal-frequency bins: bin edges are not unique ({distinct} distinct amounts)"
    )]
    DegenerateSegmentation { bins: usize, distinct: usize },

    /// A user-tunable parameter is outside its accepted range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The selected year has no records in the combined dataset.
    #[error("Year {0} is not present in the loaded data")]
    YearNotPresent(i32),

    /// A computation was requested over zero records.
    #[error("No records to analyse")]
    EmptySelection,

    /// Failure inside a numeric library, such as feature scaling.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the OSR crates.
pub type Result<T> = std::result::Result<T, OsrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = OsrError::FileRead {
            path: PathBuf::from("/data/2022.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/2022.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_malformed_source_names_file() {
        let err = OsrError::MalformedSource {
            path: PathBuf::from("2023.csv"),
            reason: "missing required column `Amount`".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Error reading 2023.csv"));
        assert!(msg.contains("missing required column `Amount`"));
    }

    #[test]
    fn test_error_display_no_data() {
        let err = OsrError::NoDataAvailable {
            data_dir: PathBuf::from("/empty"),
        };
        assert!(err.to_string().starts_with("No data found in /empty"));
    }

    #[test]
    fn test_error_display_degenerate_segmentation() {
        let err = OsrError::DegenerateSegmentation {
            bins: 3,
            distinct: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 equal-frequency bins"));
        assert!(msg.contains("2 distinct amounts"));
    }

    #[test]
    fn test_error_display_year_not_present() {
        let err = OsrError::YearNotPresent(2019);
        assert_eq!(err.to_string(), "Year 2019 is not present in the loaded data");
    }

    #[test]
    fn test_error_display_invalid_parameter() {
        let err = OsrError::InvalidParameter("k must be between 1 and 10".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: k must be between 1 and 10");
    }

    #[test]
    fn test_error_from_anyhow_is_transparent() {
        let err: OsrError = anyhow::anyhow!("standardizing features: no samples").into();
        assert!(matches!(err, OsrError::Other(_)));
        assert_eq!(err.to_string(), "standardizing features: no samples");
    }
}
