//! Step-boundary detection for parametrically stepped simulations
//!
//! A stepped raw file concatenates every sweep point into one flat payload
//! with no explicit step table. The boundary convention varies between
//! simulator versions, so the rule is selectable rather than hard-coded.

use crate::types::{RawError, Result};
use std::collections::HashMap;
use std::ops::Range;

/// How the flat payload of a stepped file is split into per-step blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBoundaryRule {
    /// Scan the sweep axis: a new step begins wherever the axis moves against
    /// the direction established by the first two samples. Adaptive-timestep
    /// transient runs restart the time axis at each step, so step lengths may
    /// differ; that is legal, not an error.
    AxisRestart,
    /// Fixed stride. The total point count must be an exact multiple.
    Uniform { points_per_step: usize },
}

impl Default for StepBoundaryRule {
    fn default() -> Self {
        StepBoundaryRule::AxisRestart
    }
}

/// Options for a single parse call
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub boundary_rule: StepBoundaryRule,
    /// Per-step swept-parameter values, usually recovered from the companion
    /// simulator log by an external reader. When present, its length must
    /// equal the detected step count.
    pub step_table: Option<Vec<HashMap<String, f64>>>,
}

/// Split `axis` into per-step row ranges according to `rule`.
///
/// Always returns at least one range; an empty axis yields one empty step.
pub(crate) fn partition_steps(axis: &[f64], rule: StepBoundaryRule) -> Result<Vec<Range<usize>>> {
    match rule {
        StepBoundaryRule::Uniform { points_per_step } => {
            if points_per_step == 0 || axis.len() % points_per_step != 0 {
                return Err(RawError::Format(format!(
                    "point count {} is not a multiple of the declared stride {}",
                    axis.len(),
                    points_per_step
                )));
            }
            Ok((0..axis.len() / points_per_step)
                .map(|i| i * points_per_step..(i + 1) * points_per_step)
                .collect())
        }
        StepBoundaryRule::AxisRestart => {
            if axis.len() < 2 {
                return Ok(vec![0..axis.len()]);
            }
            // Repeated axis values (e.g. time points duplicated around a
            // discontinuity) are not restarts, only a reversal is.
            let direction = if axis[1] >= axis[0] { 1.0 } else { -1.0 };
            let mut bounds = vec![0usize];
            for i in 1..axis.len() {
                if (axis[i] - axis[i - 1]) * direction < 0.0 {
                    bounds.push(i);
                }
            }
            bounds.push(axis.len());
            Ok(bounds.windows(2).map(|w| w[0]..w[1]).collect())
        }
    }
}
