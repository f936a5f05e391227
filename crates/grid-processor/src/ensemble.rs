//! Ensemble mean across simulation runs.

use climate_common::GriddedField;
use ndarray::{Array3, Zip};
use tracing::debug;

use crate::config::MissingPolicy;
use crate::error::{GridProcessorError, Result};

/// Cell-wise mean across members sharing one grid.
pub fn ensemble_mean(members: &[&GriddedField], policy: MissingPolicy) -> Result<GriddedField> {
    let first = members.first().ok_or(GridProcessorError::EmptyEnsemble)?;
    for member in &members[1..] {
        first.ensure_same_grid(member)?;
    }

    let dim = first.data.raw_dim();
    let mut sum = Array3::<f64>::zeros(dim.clone());
    let mut count = Array3::<u32>::zeros(dim.clone());
    let mut any_missing = Array3::from_elem(dim, false);

    for member in members {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&mut any_missing)
            .and(&member.data)
            .for_each(|s, c, missing, &v| {
                if v.is_nan() {
                    *missing = true;
                } else {
                    *s += v;
                    *c += 1;
                }
            });
    }

    let data = Zip::from(&sum)
        .and(&count)
        .and(&any_missing)
        .map_collect(|&s, &c, &missing| {
            if c == 0 || (missing && policy == MissingPolicy::Propagate) {
                f64::NAN
            } else {
                s / c as f64
            }
        });

    debug!(members = members.len(), policy = ?policy, "Computed ensemble mean");
    Ok(first.with_data(format!("{}_ensmean", first.name), data)?)
}
