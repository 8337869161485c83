//! Analytics service: Aggregate statistics over the training dataset.
//!
//! Produces the figures behind the exploratory dashboard (disease counts by
//! age group and gender, feature correlations, smoker proportions) as plain
//! data. Rendering them is left to whatever front end consumes the summary.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::adapters::dataset::{is_na, DatasetError, DatasetTable};
use crate::config::AppConfig;

pub const AGE_GROUP_COLUMN: &str = "AGE_GROUP";
pub const GENDER_COLUMN: &str = "GENDER";
pub const TARGET_COLUMN: &str = "PULMONARY_DISEASE";
pub const SMOKING_COLUMN: &str = "SMOKING";

/// Pearson correlation of one numeric column with the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCorrelation {
    pub column: String,
    /// `None` when either series has zero variance.
    pub coefficient: Option<f64>,
}

/// Dashboard figures for the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    /// AGE_GROUP -> PULMONARY_DISEASE -> count
    pub age_group_vs_disease: BTreeMap<String, BTreeMap<String, usize>>,
    /// PULMONARY_DISEASE -> GENDER -> count
    pub disease_by_gender: BTreeMap<String, BTreeMap<String, usize>>,
    /// PULMONARY_DISEASE -> count
    pub disease_distribution: BTreeMap<String, usize>,
    /// Sorted by coefficient, descending; undefined coefficients last.
    pub correlations: Vec<FeatureCorrelation>,
    /// SMOKING -> PULMONARY_DISEASE -> percentage within the smoking group
    pub smoking_disease_proportions: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Service computing dataset statistics.
#[derive(Debug)]
pub struct AnalyticsService {
    table: DatasetTable,
}

impl AnalyticsService {
    /// Create a service over an already loaded table.
    #[must_use]
    pub fn new(table: DatasetTable) -> Self {
        Self { table }
    }

    /// Load the dataset CSV and create a service over it.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        Ok(Self::new(DatasetTable::load(path)?))
    }

    /// Load the configured dataset.
    ///
    /// # Errors
    /// Returns [`crate::LungRiskError::Dataset`] if the file cannot be read or parsed.
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        Ok(Self::load(&config.dataset_path)?)
    }

    #[must_use]
    pub fn table(&self) -> &DatasetTable {
        &self.table
    }

    /// Compute all dashboard figures.
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingColumn`] if a required column is absent.
    pub fn summary(&self) -> Result<DatasetSummary, DatasetError> {
        let target = self.table.column(TARGET_COLUMN)?;
        let age_group = self.table.column(AGE_GROUP_COLUMN)?;
        let gender = self.table.column(GENDER_COLUMN)?;
        let smoking = self.table.column(SMOKING_COLUMN)?;

        let summary = DatasetSummary {
            row_count: self.table.len(),
            age_group_vs_disease: crosstab(&age_group, &target),
            disease_by_gender: crosstab(&target, &gender),
            disease_distribution: value_counts(&target),
            correlations: self.correlations()?,
            smoking_disease_proportions: row_percentages(&crosstab(&smoking, &target)),
        };

        tracing::info!(
            rows = summary.row_count,
            numeric_columns = summary.correlations.len(),
            "Computed dataset summary"
        );
        Ok(summary)
    }

    /// Correlation of every numeric column with the target, sorted descending.
    ///
    /// # Errors
    /// Returns [`DatasetError::MissingColumn`] if the target column is absent.
    pub fn correlations(&self) -> Result<Vec<FeatureCorrelation>, DatasetError> {
        let Some(target) = self.target_series()? else {
            tracing::warn!(column = TARGET_COLUMN, "Target column is not numeric, skipping correlations");
            return Ok(Vec::new());
        };

        let mut out: Vec<FeatureCorrelation> = self
            .table
            .headers()
            .iter()
            .filter_map(|name| {
                let series = if name == TARGET_COLUMN {
                    target.clone()
                } else {
                    self.table.numeric_column(name)?
                };
                Some(FeatureCorrelation {
                    column: name.clone(),
                    coefficient: pearson(&series, &target),
                })
            })
            .collect();

        // Stable sort keeps file order among ties.
        out.sort_by(|a, b| match (a.coefficient, b.coefficient) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(out)
    }

    /// Target as numbers; "YES"/"NO" labels are read as 1/0 and missing
    /// cells as `None`.
    fn target_series(&self) -> Result<Option<Vec<Option<f64>>>, DatasetError> {
        let cells = self.table.column(TARGET_COLUMN)?;
        if let Some(series) = self.table.numeric_column(TARGET_COLUMN) {
            return Ok(Some(series));
        }

        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            if is_na(cell) {
                out.push(None);
                continue;
            }
            let value = match cell.to_ascii_uppercase().as_str() {
                "YES" => Some(1.0),
                "NO" => Some(0.0),
                _ => return Ok(None),
            };
            out.push(value);
        }
        Ok(Some(out))
    }
}

/// Counts per value; missing cells are not counted.
fn value_counts(values: &[&str]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for v in values.iter().filter(|v| !is_na(v)) {
        *counts.entry((*v).to_string()).or_insert(0) += 1;
    }
    counts
}

fn crosstab(rows: &[&str], cols: &[&str]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut table: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for (r, c) in rows.iter().zip(cols) {
        if is_na(r) || is_na(c) {
            continue;
        }
        *table
            .entry((*r).to_string())
            .or_default()
            .entry((*c).to_string())
            .or_insert(0) += 1;
    }
    table
}

fn row_percentages(
    table: &BTreeMap<String, BTreeMap<String, usize>>,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    table
        .iter()
        .map(|(row, cols)| {
            let total: usize = cols.values().sum();
            let pct = cols
                .iter()
                .map(|(col, n)| (col.clone(), *n as f64 * 100.0 / total as f64))
                .collect();
            (row.clone(), pct)
        })
        .collect()
}

/// Pearson correlation over rows where both values are present.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
AGE,GENDER,SMOKING,AGE_GROUP,ENERGY_LEVEL,CONSTANT,PULMONARY_DISEASE
30,0,0,30-39,60,1,0
35,1,0,30-39,58,1,0
62,1,1,60-69,40,1,1
68,0,1,60-69,42,1,1
64,1,1,60-69,55,1,0
";

    fn service() -> AnalyticsService {
        AnalyticsService::new(DatasetTable::from_reader(SAMPLE.as_bytes()).expect("parse"))
    }

    #[test]
    fn test_counts() {
        let summary = service().summary().expect("summary");
        assert_eq!(summary.row_count, 5);
        assert_eq!(summary.disease_distribution["0"], 3);
        assert_eq!(summary.disease_distribution["1"], 2);
        assert_eq!(summary.age_group_vs_disease["30-39"]["0"], 2);
        assert!(!summary.age_group_vs_disease["30-39"].contains_key("1"));
        assert_eq!(summary.age_group_vs_disease["60-69"]["1"], 2);
        assert_eq!(summary.disease_by_gender["0"]["1"], 2);
        assert_eq!(summary.disease_by_gender["1"]["0"], 1);
    }

    #[test]
    fn test_smoking_proportions() {
        let summary = service().summary().expect("summary");
        let smokers = &summary.smoking_disease_proportions["1"];
        assert!((smokers["1"] - 200.0 / 3.0).abs() < 1e-9);
        assert!((smokers["0"] - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.smoking_disease_proportions["0"]["0"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlations_sorted() {
        let corr = service().correlations().expect("correlations");
        let names: Vec<_> = corr.iter().map(|c| c.column.as_str()).collect();

        // AGE_GROUP is not numeric, CONSTANT has no variance.
        assert!(!names.contains(&"AGE_GROUP"));
        assert_eq!(corr[0].column, "PULMONARY_DISEASE");
        assert!((corr[0].coefficient.expect("defined") - 1.0).abs() < 1e-12);
        assert_eq!(corr.last().map(|c| c.column.as_str()), Some("CONSTANT"));
        assert_eq!(corr.last().and_then(|c| c.coefficient), None);

        let defined: Vec<f64> = corr.iter().filter_map(|c| c.coefficient).collect();
        assert!(defined.windows(2).all(|w| w[0] >= w[1]));

        let energy = corr.iter().find(|c| c.column == "ENERGY_LEVEL").expect("energy");
        assert!(energy.coefficient.expect("defined") < 0.0);
    }

    #[test]
    fn test_pearson() {
        let xs = [Some(1.0), Some(2.0), Some(3.0), None];
        let ys = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!((pearson(&xs, &ys).expect("defined") - 1.0).abs() < 1e-12);

        let flat = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&flat, &ys), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }

    #[test]
    fn test_yes_no_target() {
        let csv = "SMOKING,GENDER,AGE_GROUP,PULMONARY_DISEASE\n1,0,40-49,YES\n0,1,40-49,NO\n1,1,50-59,YES\n";
        let svc = AnalyticsService::new(DatasetTable::from_reader(csv.as_bytes()).expect("parse"));
        let corr = svc.correlations().expect("correlations");
        let smoking = corr.iter().find(|c| c.column == "SMOKING").expect("smoking");
        assert!((smoking.coefficient.expect("defined") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_cells_do_not_lead_the_ranking() {
        let csv = "\
AGE,GENDER,SMOKING,AGE_GROUP,CONSTANT,PULMONARY_DISEASE
30,0,0,30-39,1,0
NaN,1,0,30-39,1,0
62,1,1,60-69,1,1
68,0,1,60-69,1,1
inf,1,1,60-69,1,1
";
        let svc = AnalyticsService::new(DatasetTable::from_reader(csv.as_bytes()).expect("parse"));
        let corr = svc.correlations().expect("correlations");

        assert!(corr.iter().all(|c| c.coefficient.map_or(true, f64::is_finite)));
        assert!(corr[0].coefficient.is_some());
        let undefined: Vec<_> = corr
            .iter()
            .skip_while(|c| c.coefficient.is_some())
            .map(|c| c.column.as_str())
            .collect();
        assert!(undefined.contains(&"AGE"));
        assert!(undefined.contains(&"CONSTANT"));
        assert!(corr[..corr.len() - undefined.len()]
            .iter()
            .all(|c| c.coefficient.is_some()));
    }

    #[test]
    fn test_na_target_rows_are_skipped() {
        let csv = "\
AGE,GENDER,SMOKING,AGE_GROUP,PULMONARY_DISEASE
30,0,0,30-39,0
50,1,1,50-59,NA
70,1,1,70-79,1
40,0,0,40-49,0
";
        let svc = AnalyticsService::new(DatasetTable::from_reader(csv.as_bytes()).expect("parse"));
        let corr = svc.correlations().expect("correlations");

        let smoking = corr.iter().find(|c| c.column == "SMOKING").expect("smoking");
        assert!((smoking.coefficient.expect("defined") - 1.0).abs() < 1e-12);
        let age = corr.iter().find(|c| c.column == "AGE").expect("age");
        assert!(age.coefficient.expect("defined") > 0.8);

        let summary = svc.summary().expect("summary");
        assert_eq!(summary.disease_distribution.len(), 2);
        assert_eq!(summary.disease_distribution.values().sum::<usize>(), 3);
        assert!(!summary.age_group_vs_disease.contains_key("50-59"));
    }

    #[test]
    fn test_na_in_yes_no_target() {
        let csv = "SMOKING,GENDER,AGE_GROUP,PULMONARY_DISEASE\n1,0,40-49,YES\n0,1,40-49,NO\n1,1,50-59,N/A\n1,0,50-59,YES\n";
        let svc = AnalyticsService::new(DatasetTable::from_reader(csv.as_bytes()).expect("parse"));
        let corr = svc.correlations().expect("correlations");
        let smoking = corr.iter().find(|c| c.column == "SMOKING").expect("smoking");
        assert!((smoking.coefficient.expect("defined") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_non_finite_is_undefined() {
        let xs = [Some(1.0), Some(f64::INFINITY), Some(3.0)];
        let ys = [Some(0.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&xs, &ys), None);
    }

    #[test]
    fn test_from_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig {
            dataset_path: temp.path().join("lung.csv"),
            ..AppConfig::default()
        };

        let err = AnalyticsService::from_config(&config).expect_err("must fail");
        assert!(matches!(err, crate::LungRiskError::Dataset(DatasetError::Csv(_))));

        std::fs::write(&config.dataset_path, SAMPLE).expect("write");
        let svc = AnalyticsService::from_config(&config).expect("load");
        assert_eq!(svc.table().len(), 5);

        config.dataset_path = temp.path().join("other.csv");
        assert!(AnalyticsService::from_config(&config).is_err());
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "AGE,PULMONARY_DISEASE\n40,1\n";
        let svc = AnalyticsService::new(DatasetTable::from_reader(csv.as_bytes()).expect("parse"));
        let err = svc.summary().expect_err("must fail");
        assert!(matches!(err, DatasetError::MissingColumn(name) if name == "AGE_GROUP"));
    }
}
