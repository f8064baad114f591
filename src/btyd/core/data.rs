//! Customer summary data containers for buy-till-you-die models.
//!
//! Purpose
//! -------
//! Provide small, validated containers for the per-subject summary
//! statistics every model is fitted on, and a [`FitData`] trait the fitter
//! uses to weight, rescale and count subjects without knowing which
//! container it holds.
//!
//! Key behaviors
//! -------------
//! - [`SummaryData`]: frequency, recency, age (`T`, or `periods` for
//!   discrete-time models), weights and optional labels.
//! - [`MonetaryData`]: frequency and average transaction value for the
//!   Gamma-Gamma spend model.
//! - [`CovariateData`]: a [`SummaryData`] plus transaction- and
//!   dropout-process covariate matrices.
//! - [`FitData::rescaled`] divides the time columns by the fitter's scale
//!   factor; spend data has no time columns and rescales to itself.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every column has one finite entry per subject and at least one subject
//!   is present.
//! - `frequency ≥ 0`, `0 ≤ recency ≤ age`, `weights > 0`,
//!   `monetary_value ≥ 0`.
//! - Omitted weights are stored as an explicit vector of ones, so the two
//!   spellings are indistinguishable downstream.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based by subject row; labels in `index` are carried along
//!   untouched for callers that need to join predictions back.
//! - Model-specific requirements (whole-number counts for BG/BB, positive
//!   frequency for Gamma-Gamma) are enforced by each model's `check_data`,
//!   not here.
//!
//! Downstream usage
//! ----------------
//! - Construct a container at the boundary where summary statistics enter
//!   the crate, then pass it to `btyd::fitter::fit` or to batch prediction
//!   helpers.
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction failures (length mismatch, recency above
//!   age, bad weights, covariate rows), default weights and rescaling.
use crate::btyd::{
    core::validation::{
        time_scale, validate_integral, validate_length, validate_monetary,
        validate_non_negative, validate_recency_age, validate_weights,
    },
    errors::{BtydError, BtydResult},
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

/// Shared view of a fitting data set.
///
/// Implemented by every container a model can be fitted on. The fitter
/// needs the subject count, the weights, the time scale and a rescaled copy;
/// everything else is model-specific.
pub trait FitData: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    fn n_subjects(&self) -> usize;
    fn weights(&self) -> &Array1<f64>;

    /// Positive divisor for the time columns; `1` for data without them.
    fn time_scale(&self) -> f64;

    /// Copy with every time-denominated column divided by `scale`.
    fn rescaled(&self, scale: f64) -> Self;

    fn total_weight(&self) -> f64 {
        self.weights().sum()
    }
}

/// SummaryData — validated frequency/recency/age columns plus weights.
///
/// Fields
/// ------
/// - `frequency`: repeat-purchase counts `x`.
/// - `recency`: time of the last repeat purchase `t_x`.
/// - `age`: observation length `T` (number of periods for BG/BB).
/// - `weights`: subject multiplicities, all ones when omitted.
/// - `index`: optional subject labels, same length as the columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub frequency: Array1<f64>,
    pub recency: Array1<f64>,
    pub age: Array1<f64>,
    pub weights: Array1<f64>,
    pub index: Option<Vec<String>>,
}

impl SummaryData {
    /// Construct validated summary data.
    ///
    /// Parameters
    /// ----------
    /// - `frequency`, `recency`, `age`: `Array1<f64>`
    ///   Equal-length, finite, non-negative columns with `recency ≤ age`;
    ///   frequencies are whole numbers.
    /// - `weights`: `Option<Array1<f64>>`
    ///   Positive multiplicities; `None` means one per subject.
    ///
    /// Returns
    /// -------
    /// `BtydResult<SummaryData>`
    ///
    /// Errors
    /// ------
    /// - `BtydError::EmptyData` for zero subjects.
    /// - `BtydError::LengthMismatch` when a column length differs from
    ///   `frequency.len()`.
    /// - `BtydError::InvalidObservation` for NaN/±∞ or negative entries and
    ///   for a fractional frequency.
    /// - `BtydError::RecencyExceedsAge` when `recency[i] > age[i]`.
    /// - `BtydError::InvalidWeight` for non-positive or non-finite weights.
    pub fn new(
        frequency: Array1<f64>, recency: Array1<f64>, age: Array1<f64>,
        weights: Option<Array1<f64>>,
    ) -> BtydResult<Self> {
        let n = frequency.len();
        if n == 0 {
            return Err(BtydError::EmptyData);
        }
        validate_length("recency", n, recency.len())?;
        validate_length("age", n, age.len())?;
        validate_non_negative("frequency", &frequency)?;
        validate_integral("frequency", &frequency)?;
        validate_non_negative("recency", &recency)?;
        validate_non_negative("age", &age)?;
        validate_recency_age(&recency, &age)?;
        let weights = match weights {
            Some(w) => {
                validate_length("weights", n, w.len())?;
                validate_weights(&w)?;
                w
            }
            None => Array1::ones(n),
        };
        Ok(Self { frequency, recency, age, weights, index: None })
    }

    /// Attach subject labels.
    ///
    /// # Errors
    /// - `BtydError::LengthMismatch` if `index.len()` differs from the
    ///   number of subjects.
    pub fn with_index(mut self, index: Vec<String>) -> BtydResult<Self> {
        validate_length("index", self.frequency.len(), index.len())?;
        self.index = Some(index);
        Ok(self)
    }

    /// Largest observed frequency and age, floored to whole numbers.
    ///
    /// These are the default bounds of the probability-alive matrix.
    pub fn max_frequency_and_age(&self) -> (usize, usize) {
        let max_f = self.frequency.iter().copied().fold(0.0_f64, f64::max);
        let max_t = self.age.iter().copied().fold(0.0_f64, f64::max);
        (max_f.floor() as usize, max_t.floor() as usize)
    }

    /// Iterate `(frequency, recency, age)` triples in row order.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.frequency
            .iter()
            .zip(self.recency.iter())
            .zip(self.age.iter())
            .map(|((&x, &t_x), &t)| (x, t_x, t))
    }
}

impl FitData for SummaryData {
    fn n_subjects(&self) -> usize {
        self.frequency.len()
    }

    fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    fn time_scale(&self) -> f64 {
        time_scale(&self.age)
    }

    fn rescaled(&self, scale: f64) -> Self {
        Self {
            frequency: self.frequency.clone(),
            recency: &self.recency / scale,
            age: &self.age / scale,
            weights: self.weights.clone(),
            index: self.index.clone(),
        }
    }
}

/// MonetaryData — frequency and average transaction value per subject.
///
/// Fields
/// ------
/// - `frequency`: repeat-purchase counts used as the number of spend
///   observations.
/// - `monetary_value`: average value of those transactions.
/// - `weights`: subject multiplicities, all ones when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryData {
    pub frequency: Array1<f64>,
    pub monetary_value: Array1<f64>,
    pub weights: Array1<f64>,
}

impl MonetaryData {
    /// Construct validated spend data.
    ///
    /// # Errors
    /// - `BtydError::EmptyData`, `BtydError::LengthMismatch`.
    /// - `BtydError::InvalidObservation` for a negative, non-finite or
    ///   fractional frequency.
    /// - `BtydError::InvalidMonetaryValue` for a NaN/±∞ or negative value.
    /// - `BtydError::InvalidWeight` for a bad weight.
    pub fn new(
        frequency: Array1<f64>, monetary_value: Array1<f64>, weights: Option<Array1<f64>>,
    ) -> BtydResult<Self> {
        let n = frequency.len();
        if n == 0 {
            return Err(BtydError::EmptyData);
        }
        validate_length("monetary_value", n, monetary_value.len())?;
        validate_non_negative("frequency", &frequency)?;
        validate_integral("frequency", &frequency)?;
        validate_monetary(&monetary_value)?;
        let weights = match weights {
            Some(w) => {
                validate_length("weights", n, w.len())?;
                validate_weights(&w)?;
                w
            }
            None => Array1::ones(n),
        };
        Ok(Self { frequency, monetary_value, weights })
    }
}

impl FitData for MonetaryData {
    fn n_subjects(&self) -> usize {
        self.frequency.len()
    }

    fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    fn time_scale(&self) -> f64 {
        1.0
    }

    fn rescaled(&self, _scale: f64) -> Self {
        self.clone()
    }
}

/// CovariateData — summary data with per-subject covariate rows.
///
/// Fields
/// ------
/// - `summary`: the underlying [`SummaryData`].
/// - `transaction_covariates`: `n × k_tr` rows entering the purchase rate.
/// - `dropout_covariates`: `n × k_do` rows entering the dropout Beta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateData {
    pub summary: SummaryData,
    pub transaction_covariates: Array2<f64>,
    pub dropout_covariates: Array2<f64>,
}

impl CovariateData {
    /// Attach covariate matrices to validated summary data.
    ///
    /// # Errors
    /// - `BtydError::CovariateShape` when a matrix has the wrong row count.
    /// - `BtydError::InvalidObservation` for a non-finite covariate; the
    ///   reported index is the subject row.
    pub fn new(
        summary: SummaryData, transaction_covariates: Array2<f64>,
        dropout_covariates: Array2<f64>,
    ) -> BtydResult<Self> {
        let n = summary.n_subjects();
        for (matrix, values) in [
            ("transaction_covariates", &transaction_covariates),
            ("dropout_covariates", &dropout_covariates),
        ] {
            if values.nrows() != n {
                return Err(BtydError::CovariateShape { matrix, expected: n, found: values.nrows() });
            }
            if let Some(((row, _), &value)) =
                values.indexed_iter().find(|(_, v)| !v.is_finite())
            {
                return Err(BtydError::InvalidObservation {
                    column: matrix,
                    index: row,
                    value,
                    reason: "covariates must be finite",
                });
            }
        }
        Ok(Self { summary, transaction_covariates, dropout_covariates })
    }

    pub fn n_transaction_covariates(&self) -> usize {
        self.transaction_covariates.ncols()
    }

    pub fn n_dropout_covariates(&self) -> usize {
        self.dropout_covariates.ncols()
    }
}

impl FitData for CovariateData {
    fn n_subjects(&self) -> usize {
        self.summary.n_subjects()
    }

    fn weights(&self) -> &Array1<f64> {
        &self.summary.weights
    }

    fn time_scale(&self) -> f64 {
        self.summary.time_scale()
    }

    fn rescaled(&self, scale: f64) -> Self {
        Self {
            summary: self.summary.rescaled(scale),
            transaction_covariates: self.transaction_covariates.clone(),
            dropout_covariates: self.dropout_covariates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Construction failures of each container.
    // - Default weights, labels and rescaling.
    // -------------------------------------------------------------------------

    fn small_summary() -> SummaryData {
        SummaryData::new(array![0.0, 2.0, 5.0], array![0.0, 4.0, 9.0], array![10.0, 6.0, 12.0], None)
            .expect("valid data")
    }

    #[test]
    // Purpose
    // -------
    // Omitted weights are stored as explicit ones.
    //
    // Given
    // -----
    // - Three valid subjects and `weights = None`.
    //
    // Expect
    // ------
    // - Weights equal `[1, 1, 1]` and the total weight is 3.
    fn omitted_weights_are_ones() {
        // Arrange + Act
        let data = small_summary();

        // Assert
        assert_eq!(data.weights, array![1.0, 1.0, 1.0]);
        assert_eq!(data.total_weight(), 3.0);
        assert_eq!(data.n_subjects(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Malformed columns fail before any modeling.
    //
    // Given
    // -----
    // - A short recency column, recency above age, a zero weight, an empty
    //   frequency column, a fractional frequency.
    //
    // Expect
    // ------
    // - `LengthMismatch`, `RecencyExceedsAge`, `InvalidWeight`, `EmptyData`,
    //   `InvalidObservation` for the frequency (also for spend data).
    fn malformed_columns_are_rejected() {
        let err = SummaryData::new(array![1.0, 2.0], array![1.0], array![3.0, 3.0], None);
        assert_eq!(
            err,
            Err(BtydError::LengthMismatch { column: "recency", expected: 2, found: 1 })
        );

        let err = SummaryData::new(array![1.0], array![4.0], array![3.0], None);
        assert_eq!(err, Err(BtydError::RecencyExceedsAge { index: 0, recency: 4.0, age: 3.0 }));

        let err = SummaryData::new(array![1.0], array![1.0], array![3.0], Some(array![0.0]));
        assert_eq!(err, Err(BtydError::InvalidWeight { index: 0, value: 0.0 }));

        let empty = Array1::<f64>::zeros(0);
        let err = SummaryData::new(empty.clone(), empty.clone(), empty, None);
        assert_eq!(err, Err(BtydError::EmptyData));

        let err = SummaryData::new(array![1.5], array![2.0], array![5.0], None);
        assert!(matches!(
            err,
            Err(BtydError::InvalidObservation { column: "frequency", index: 0, .. })
        ));
        let err = MonetaryData::new(array![2.0, 0.5], array![10.0, 20.0], None);
        assert!(matches!(
            err,
            Err(BtydError::InvalidObservation { column: "frequency", index: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Rescaling divides only the time columns, and the time scale is the
    // median age.
    //
    // Given
    // -----
    // - Ages [10, 6, 12] (median 10).
    //
    // Expect
    // ------
    // - Scale 10; recency/age divided by 10; frequency and weights intact.
    fn rescaling_divides_time_columns() {
        // Arrange
        let data = small_summary();

        // Act
        let scale = data.time_scale();
        let scaled = data.rescaled(scale);

        // Assert
        assert_eq!(scale, 10.0);
        assert_eq!(scaled.recency, array![0.0, 0.4, 0.9]);
        assert_eq!(scaled.age, array![1.0, 0.6, 1.2]);
        assert_eq!(scaled.frequency, data.frequency);
        assert_eq!(scaled.weights, data.weights);
    }

    #[test]
    // Purpose
    // -------
    // Labels must match the subject count; bounds are floored maxima.
    //
    // Given
    // -----
    // - Two labels for three subjects, then three labels.
    //
    // Expect
    // ------
    // - `LengthMismatch` first, success second; bounds (5, 12).
    fn index_labels_and_bounds() {
        let err = small_summary().with_index(vec!["a".into(), "b".into()]);
        assert!(matches!(err, Err(BtydError::LengthMismatch { column: "index", .. })));

        let data = small_summary()
            .with_index(vec!["a".into(), "b".into(), "c".into()])
            .expect("matching labels");
        assert_eq!(data.index.as_deref().map(<[String]>::len), Some(3));
        assert_eq!(data.max_frequency_and_age(), (5, 12));
    }

    #[test]
    // Purpose
    // -------
    // Covariate matrices must have one finite row per subject.
    //
    // Given
    // -----
    // - A 2-row transaction matrix for 3 subjects; a NaN dropout covariate.
    //
    // Expect
    // ------
    // - `CovariateShape` and `InvalidObservation` at the NaN's row.
    fn covariate_shapes_are_checked() {
        let err = CovariateData::new(small_summary(), Array2::zeros((2, 1)), Array2::zeros((3, 1)));
        assert_eq!(
            err,
            Err(BtydError::CovariateShape {
                matrix: "transaction_covariates",
                expected: 3,
                found: 2,
            })
        );

        let mut dropout = Array2::zeros((3, 2));
        dropout[[2, 1]] = f64::NAN;
        let err = CovariateData::new(small_summary(), Array2::zeros((3, 1)), dropout);
        assert!(matches!(err, Err(BtydError::InvalidObservation { index: 2, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Spend data rejects negative values and keeps a unit time scale.
    //
    // Given
    // -----
    // - monetary values [10, -1]; then a valid pair.
    //
    // Expect
    // ------
    // - `InvalidMonetaryValue` at index 1; scale 1 and identity rescale.
    fn monetary_data_validation() {
        let err = MonetaryData::new(array![1.0, 2.0], array![10.0, -1.0], None);
        assert!(matches!(err, Err(BtydError::InvalidMonetaryValue { index: 1, .. })));

        let data = MonetaryData::new(array![1.0, 2.0], array![10.0, 20.0], None).expect("valid");
        assert_eq!(data.time_scale(), 1.0);
        assert_eq!(data.rescaled(7.0), data);
    }
}
