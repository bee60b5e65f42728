use ndarray::{Array1, Array2};

use crate::types::{ScmError, WeightVector};

/// Apply donor weights to every year of the full-horizon donor matrix.
///
/// Returns one synthetic value per row: the dot product of that year's donor
/// values with the weights. Post-cutoff rows never seen by the solver are
/// projected exactly like the pre-cutoff ones.
///
/// # Arguments
/// * `donors_full` - Donor matrix over the whole window (years x donors)
/// * `weights` - Simplex weights, one per donor column
///
/// # Errors
/// Returns `ScmError::EmptyInput` if there are no donors, and
/// `ScmError::LengthMismatch` if the column count differs from the weight count.
pub fn project_counterfactual(
    donors_full: &Array2<f64>,
    weights: &WeightVector,
) -> Result<Array1<f64>, ScmError> {
    if weights.is_empty() {
        return Err(ScmError::EmptyInput);
    }
    if donors_full.ncols() != weights.len() {
        return Err(ScmError::LengthMismatch);
    }

    let w = Array1::from(weights.as_slice().to_vec());
    Ok(donors_full.dot(&w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_project_simple() {
        let donors = array![[10.0, 20.0], [30.0, 40.0], [50.0, 60.0]];
        let w = WeightVector::from_projected(vec![0.25, 0.75]);

        let synth = project_counterfactual(&donors, &w).unwrap();

        // 0.25*10 + 0.75*20 = 17.5
        // 0.25*30 + 0.75*40 = 37.5
        // 0.25*50 + 0.75*60 = 57.5
        assert_eq!(synth.len(), 3);
        assert!((synth[0] - 17.5).abs() < 1e-10);
        assert!((synth[1] - 37.5).abs() < 1e-10);
        assert!((synth[2] - 57.5).abs() < 1e-10);
    }

    #[test]
    fn test_project_length_mismatch() {
        let donors = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let w = WeightVector::uniform(2);
        let result = project_counterfactual(&donors, &w);
        assert!(matches!(result, Err(ScmError::LengthMismatch)));
    }

    #[test]
    fn test_project_empty_weights() {
        let donors = Array2::<f64>::zeros((3, 0));
        let result = project_counterfactual(&donors, &WeightVector::uniform(0));
        assert!(matches!(result, Err(ScmError::EmptyInput)));
    }

    #[test]
    fn test_project_stays_in_convex_hull() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let rows = rng.gen_range(3..20);
            let cols = rng.gen_range(2..10);
            let donors = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-500.0..500.0));
            let mut raw: Vec<f64> = (0..cols).map(|_| rng.gen_range(0.0..1.0)).collect();
            let total: f64 = raw.iter().sum();
            raw.iter_mut().for_each(|v| *v /= total);
            let w = WeightVector::from_projected(raw);

            let synth = project_counterfactual(&donors, &w).unwrap();
            for (r, &value) in synth.iter().enumerate() {
                let row = donors.row(r);
                let lo = row.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                assert!(value >= lo - 1e-9 && value <= hi + 1e-9);
            }
        }
    }
}
