use crate::dataset::Dataset;
use crate::sample::Sample;
use anyhow::{bail, ensure, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tch::Tensor;
use tracing::info;

/// A numeric table where column 0 holds the label and every remaining
/// column is a feature (the UCI wine layout).
///
/// The whole file is parsed once at construction. `get(i)` returns
/// `{"features": [F] f32, "label": [1] f32}`.
///
/// # Example
/// ```ignore
/// let dataset = LabeledCsvDataset::from_path("data/wine.csv")?;
/// let sample = dataset.get(0)?;
/// assert_eq!(sample.get("features")?.size(), vec![13]);
/// ```
#[derive(Debug, Clone)]
pub struct LabeledCsvDataset {
    features: Arc<[Vec<f32>]>,
    labels: Arc<[f32]>,
    num_features: usize,
}

impl LabeledCsvDataset {
    /// Reads a comma-delimited file whose first row is a header.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let dataset = Self::from_reader(file, b',')
            .with_context(|| format!("Failed to parse CSV file: {}", path.display()))?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            features = dataset.num_features,
            "loaded labeled CSV dataset"
        );
        Ok(dataset)
    }

    /// Parses any reader with a header row and the given delimiter.
    ///
    /// Rows must all have the same number of columns (at least 2) and every
    /// field must parse as `f32`.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut num_features = None;

        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV row {}", row))?;

            let values = record
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    field.trim().parse::<f32>().with_context(|| {
                        format!("Row {} column {}: cannot parse '{}' as f32", row, col, field)
                    })
                })
                .collect::<Result<Vec<f32>>>()?;

            let Some((&label, row_features)) = values.split_first() else {
                bail!("Row {} is empty", row);
            };
            ensure!(
                !row_features.is_empty(),
                "Row {} has a label but no feature columns",
                row
            );

            match num_features {
                None => num_features = Some(row_features.len()),
                Some(n) => ensure!(
                    n == row_features.len(),
                    "Row {} has {} feature columns, expected {}",
                    row,
                    row_features.len(),
                    n
                ),
            }

            labels.push(label);
            features.push(row_features.to_vec());
        }

        Ok(Self {
            features: features.into(),
            labels: labels.into(),
            num_features: num_features.unwrap_or(0),
        })
    }

    /// Number of feature columns (0 for an empty table).
    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

impl Dataset for LabeledCsvDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        ensure!(
            index < self.len(),
            "Index {} out of range for dataset of length {}",
            index,
            self.len()
        );
        Ok(
            Sample::from_single("features", Tensor::from_slice(&self.features[index]))
                .with_feature("label", Tensor::from_slice(&[self.labels[index]])),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WINE_HEAD: &str = "Wine,Alcohol,Malic.acid,Ash\n\
                             1,14.23,1.71,2.43\n\
                             2,12.37,.94,1.36\n\
                             3,13.17,2.59,2.37\n";

    #[test]
    fn test_parse_rows() -> Result<()> {
        let dataset = LabeledCsvDataset::from_reader(WINE_HEAD.as_bytes(), b',')?;
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.num_features(), 3);

        let sample = dataset.get(1)?;
        assert_eq!(sample.get("label")?.size(), vec![1]);
        assert_eq!(sample.get("label")?.double_value(&[0]), 2.0);
        assert_eq!(sample.get("features")?.size(), vec![3]);
        let features: Vec<f32> = sample.get("features")?.try_into()?;
        assert_eq!(features, vec![12.37, 0.94, 1.36]);

        assert!(dataset.get(3).is_err());
        Ok(())
    }

    #[test]
    fn test_header_only_is_empty() -> Result<()> {
        let dataset = LabeledCsvDataset::from_reader("a,b,c\n".as_bytes(), b',')?;
        assert!(dataset.is_empty());
        assert_eq!(dataset.num_features(), 0);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_rows() {
        let ragged = "l,a,b\n1,2,3\n1,2\n";
        assert!(LabeledCsvDataset::from_reader(ragged.as_bytes(), b',').is_err());

        let unparsable = "l,a\n1,abc\n";
        let err = LabeledCsvDataset::from_reader(unparsable.as_bytes(), b',').unwrap_err();
        assert!(format!("{:#}", err).contains("abc"));

        let label_only = "l\n1\n";
        assert!(LabeledCsvDataset::from_reader(label_only.as_bytes(), b',').is_err());
    }

    #[test]
    fn test_from_path() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(WINE_HEAD.as_bytes())?;
        let dataset = LabeledCsvDataset::from_path(file.path())?;
        assert_eq!(dataset.len(), 3);

        assert!(LabeledCsvDataset::from_path("/nonexistent/wine.csv").is_err());
        Ok(())
    }
}
