use ndarray::{Array1, Array2};

use crate::defaults::{MIN_DONORS, MIN_PRE_YEARS};
use crate::types::ScmError;

/// Check that a pre-period design is large enough to be solved.
///
/// # Arguments
/// * `pre_years` - Number of panel years strictly before the cutoff
/// * `donors` - Number of surviving donor columns
///
/// # Errors
/// Returns `ScmError::InsufficientDonors` when fewer than two donors remain,
/// and `ScmError::InsufficientHistory` when fewer than five pre-period years exist.
/// The donor check runs first.
pub fn validate_solvable(pre_years: usize, donors: usize) -> Result<(), ScmError> {
    if donors < MIN_DONORS {
        return Err(ScmError::InsufficientDonors {
            found: donors,
            required: MIN_DONORS,
        });
    }
    if pre_years < MIN_PRE_YEARS {
        return Err(ScmError::InsufficientHistory {
            found: pre_years,
            required: MIN_PRE_YEARS,
        });
    }
    Ok(())
}

/// Validate that donor matrix and treated vector are aligned row-for-row.
///
/// Returns (rows, donors).
///
/// # Errors
/// Returns `ScmError::EmptyInput` if there are no rows or no donor columns.
/// Returns `ScmError::LengthMismatch` if the treated vector length differs from the row count.
pub fn validate_aligned(
    donors: &Array2<f64>,
    treated: &Array1<f64>,
) -> Result<(usize, usize), ScmError> {
    let (rows, cols) = donors.dim();
    if rows == 0 || cols == 0 {
        return Err(ScmError::EmptyInput);
    }
    if treated.len() != rows {
        return Err(ScmError::LengthMismatch);
    }
    Ok((rows, cols))
}
