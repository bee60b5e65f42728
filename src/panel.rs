//! Rectangular year × unit indicator panels.
//!
//! A [`Panel`] is built from loose `(unit, year, value)` observations by
//! pivoting onto an ordered year axis and an ordered unit axis. Units with any
//! missing year are dropped whole; nothing is imputed.

use std::collections::{BTreeSet, HashMap, HashSet};

use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info};

use crate::defaults::MIN_DONORS;
use crate::types::{Observation, ScmError, Year};

/// Complete year × unit matrix. Rows are years (ascending), columns are units.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    years: Vec<Year>,
    units: Vec<String>,
    values: Array2<f64>,
}

impl Panel {
    /// Pivot observations into a panel, keeping only complete units.
    ///
    /// The year axis is every year in `[start, end]` observed for at least one
    /// requested unit. Observations for other units, outside the window, or with
    /// a non-finite value are ignored; a duplicated `(unit, year)` keeps the
    /// last value seen. Unit order follows `units` (duplicates collapse).
    ///
    /// # Errors
    /// Returns `ScmError::InvalidConfig` if `start > end`.
    pub fn from_observations(
        observations: &[Observation],
        units: &[String],
        start: Year,
        end: Year,
    ) -> Result<Self, ScmError> {
        if start > end {
            return Err(ScmError::InvalidConfig(format!(
                "start year {} is after end year {}",
                start, end
            )));
        }

        let requested: HashSet<&str> = units.iter().map(String::as_str).collect();
        let mut cells: HashMap<(&str, Year), f64> = HashMap::new();
        let mut year_axis = BTreeSet::new();

        for obs in observations {
            if !requested.contains(obs.unit.as_str())
                || obs.year < start
                || obs.year > end
                || !obs.value.is_finite()
            {
                continue;
            }
            year_axis.insert(obs.year);
            cells.insert((obs.unit.as_str(), obs.year), obs.value);
        }

        let years: Vec<Year> = year_axis.into_iter().collect();
        let mut seen = HashSet::new();
        let mut kept_units = Vec::new();
        let mut columns: Vec<f64> = Vec::new();

        for unit in units {
            if !seen.insert(unit.as_str()) {
                continue;
            }
            let column: Option<Vec<f64>> = years
                .iter()
                .map(|&y| cells.get(&(unit.as_str(), y)).copied())
                .collect();
            match column {
                Some(col) if !years.is_empty() => {
                    columns.extend(col);
                    kept_units.push(unit.clone());
                }
                _ => debug!(unit = %unit, "dropping unit with incomplete series"),
            }
        }

        // columns were pushed unit-major; transpose into year rows
        let values = Array2::from_shape_vec((kept_units.len(), years.len()), columns)
            .map_err(|_| ScmError::LengthMismatch)?
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        Ok(Self {
            years,
            units: kept_units,
            values,
        })
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_years(&self) -> usize {
        self.years.len()
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.units.iter().any(|u| u == unit)
    }

    fn unit_index(&self, unit: &str) -> Option<usize> {
        self.units.iter().position(|u| u == unit)
    }

    /// Full-horizon series for one unit.
    pub fn series(&self, unit: &str) -> Option<Array1<f64>> {
        self.unit_index(unit)
            .map(|idx| self.values.column(idx).to_owned())
    }

    /// Matrix of the given units' columns, in the given order.
    ///
    /// # Errors
    /// Returns `ScmError::LengthMismatch` if any unit is not in the panel.
    pub fn columns(&self, units: &[String]) -> Result<Array2<f64>, ScmError> {
        let idx: Vec<usize> = units
            .iter()
            .map(|u| self.unit_index(u).ok_or(ScmError::LengthMismatch))
            .collect::<Result<_, _>>()?;
        Ok(self.values.select(Axis(1), &idx))
    }

    /// All units except `treated`, in panel order.
    pub fn donors_for(&self, treated: &str) -> Vec<String> {
        self.units
            .iter()
            .filter(|u| u.as_str() != treated)
            .cloned()
            .collect()
    }

    /// Number of leading rows strictly before `cutoff`.
    pub fn pre_period_len(&self, cutoff: Year) -> usize {
        self.years.iter().take_while(|&&y| y < cutoff).count()
    }
}

/// Build the estimation panel for one treated unit and its donor pool.
///
/// Pivots `observations`, prunes incomplete units and checks that the treated
/// unit and at least two donors survive.
///
/// # Errors
/// * `ScmError::TreatedUnavailable` if the treated unit has no complete series
/// * `ScmError::InsufficientDonors` if fewer than two donors remain
pub fn build_panel(
    observations: &[Observation],
    treated: &str,
    donor_pool: &[String],
    start: Year,
    end: Year,
    indicator: &str,
) -> Result<Panel, ScmError> {
    let mut units = Vec::with_capacity(donor_pool.len() + 1);
    units.push(treated.to_string());
    units.extend(donor_pool.iter().filter(|d| d.as_str() != treated).cloned());

    let panel = Panel::from_observations(observations, &units, start, end)?;

    if !panel.contains(treated) {
        return Err(ScmError::TreatedUnavailable {
            unit: treated.to_string(),
            indicator: indicator.to_string(),
        });
    }

    let donors = panel.donors_for(treated);
    if donors.len() < MIN_DONORS {
        return Err(ScmError::InsufficientDonors {
            found: donors.len(),
            required: MIN_DONORS,
        });
    }

    let dropped = units.len() - panel.units().len();
    info!(
        indicator,
        years = panel.n_years(),
        donors = donors.len(),
        dropped,
        "panel built"
    );
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn full_series(unit: &str, start: Year, end: Year, base: f64) -> Vec<Observation> {
        (start..=end)
            .map(|y| Observation::new(unit, y, base + (y - start) as f64))
            .collect()
    }

    #[test]
    fn test_pivot_layout() {
        let mut obs = full_series("AAA", 2010, 2012, 1.0);
        obs.extend(full_series("BBB", 2010, 2012, 10.0));
        let panel =
            Panel::from_observations(&obs, &codes(&["BBB", "AAA"]), 2010, 2012).unwrap();

        assert_eq!(panel.years(), &[2010, 2011, 2012]);
        assert_eq!(panel.units(), &codes(&["BBB", "AAA"])[..]);
        assert_eq!(panel.values().shape(), &[3, 2]);
        assert_eq!(panel.values()[[0, 0]], 10.0);
        assert_eq!(panel.values()[[2, 0]], 12.0);
        assert_eq!(panel.values()[[1, 1]], 2.0);
    }

    #[test]
    fn test_unordered_input_sorted_by_year() {
        let obs = vec![
            Observation::new("AAA", 2012, 3.0),
            Observation::new("AAA", 2010, 1.0),
            Observation::new("AAA", 2011, 2.0),
        ];
        let panel = Panel::from_observations(&obs, &codes(&["AAA"]), 2010, 2012).unwrap();
        assert_eq!(panel.series("AAA").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_drops_unit_missing_one_year() {
        let mut obs = full_series("AAA", 2010, 2015, 1.0);
        obs.extend(full_series("BBB", 2010, 2015, 5.0));
        let mut gappy = full_series("CCC", 2010, 2015, 9.0);
        gappy.remove(3);
        obs.extend(gappy);

        let panel =
            Panel::from_observations(&obs, &codes(&["AAA", "BBB", "CCC"]), 2010, 2015).unwrap();
        assert_eq!(panel.units(), &codes(&["AAA", "BBB"])[..]);
        assert!(!panel.contains("CCC"));
    }

    #[test]
    fn test_ignores_foreign_units_and_out_of_window_years() {
        let mut obs = full_series("AAA", 2008, 2015, 1.0);
        obs.extend(full_series("ZZZ", 2010, 2012, 0.0));
        obs.push(Observation::new("AAA", 2011, f64::NAN));
        let panel = Panel::from_observations(&obs, &codes(&["AAA"]), 2010, 2012).unwrap();
        assert_eq!(panel.years(), &[2010, 2011, 2012]);
        assert_eq!(panel.units(), &codes(&["AAA"])[..]);
        assert_eq!(panel.series("AAA").unwrap().to_vec(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_duplicate_observation_last_wins() {
        let obs = vec![
            Observation::new("AAA", 2010, 1.0),
            Observation::new("AAA", 2010, 7.0),
        ];
        let panel = Panel::from_observations(&obs, &codes(&["AAA"]), 2010, 2010).unwrap();
        assert_eq!(panel.values()[[0, 0]], 7.0);
    }

    #[test]
    fn test_empty_observations_give_empty_panel() {
        let panel = Panel::from_observations(&[], &codes(&["AAA"]), 2010, 2012).unwrap();
        assert_eq!(panel.n_years(), 0);
        assert!(panel.units().is_empty());
    }

    #[test]
    fn test_invalid_window() {
        let result = Panel::from_observations(&[], &codes(&["AAA"]), 2015, 2010);
        assert!(matches!(result, Err(ScmError::InvalidConfig(_))));
    }

    #[test]
    fn test_columns_and_pre_period() {
        let mut obs = full_series("AAA", 2010, 2014, 1.0);
        obs.extend(full_series("BBB", 2010, 2014, 100.0));
        obs.extend(full_series("CCC", 2010, 2014, 50.0));
        let panel =
            Panel::from_observations(&obs, &codes(&["AAA", "BBB", "CCC"]), 2010, 2014).unwrap();

        let m = panel.columns(&codes(&["CCC", "AAA"])).unwrap();
        assert_eq!(m.shape(), &[5, 2]);
        assert_eq!(m[[0, 0]], 50.0);
        assert_eq!(m[[4, 1]], 5.0);
        assert!(matches!(
            panel.columns(&codes(&["XXX"])),
            Err(ScmError::LengthMismatch)
        ));

        assert_eq!(panel.pre_period_len(2013), 3);
        assert_eq!(panel.pre_period_len(2000), 0);
        assert_eq!(panel.donors_for("BBB"), codes(&["AAA", "CCC"]));
    }

    #[test]
    fn test_build_panel_treated_missing() {
        let mut obs = full_series("AAA", 2010, 2015, 1.0);
        obs.extend(full_series("BBB", 2010, 2015, 5.0));
        obs.extend(full_series("TTT", 2010, 2013, 3.0));
        let result = build_panel(&obs, "TTT", &codes(&["AAA", "BBB"]), 2010, 2015, "X");
        assert!(matches!(result, Err(ScmError::TreatedUnavailable { .. })));
    }

    #[test]
    fn test_build_panel_one_donor_survives() {
        let mut obs = full_series("TTT", 2010, 2015, 1.0);
        obs.extend(full_series("AAA", 2010, 2015, 5.0));
        let mut gappy = full_series("BBB", 2010, 2015, 9.0);
        gappy.pop();
        obs.extend(gappy);

        let result = build_panel(&obs, "TTT", &codes(&["AAA", "BBB"]), 2010, 2015, "X");
        assert!(matches!(
            result,
            Err(ScmError::InsufficientDonors {
                found: 1,
                required: 2
            })
        ));
    }

    #[test]
    fn test_build_panel_ignores_treated_in_pool() {
        let mut obs = full_series("TTT", 2010, 2015, 1.0);
        obs.extend(full_series("AAA", 2010, 2015, 5.0));
        obs.extend(full_series("BBB", 2010, 2015, 9.0));
        let panel =
            build_panel(&obs, "TTT", &codes(&["AAA", "TTT", "BBB"]), 2010, 2015, "X").unwrap();
        assert_eq!(panel.units(), &codes(&["TTT", "AAA", "BBB"])[..]);
        assert_eq!(panel.donors_for("TTT"), codes(&["AAA", "BBB"]));
    }
}
