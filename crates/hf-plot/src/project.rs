//! Projection of trajectories and flow tubes onto a pair of axes.

use hf_core::Real;
use hf_evolve::Orbit;
use hf_sim::HybridTrajectory;
use serde::{Deserialize, Serialize};

use crate::axes::Axes2d;
use crate::{PlotError, PlotResult};

/// Axis-aligned rectangle `x[0]..x[1]` by `y[0]..y[1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotBox {
    pub x: [Real; 2],
    pub y: [Real; 2],
}

/// One point per trajectory sample, in trajectory order.
pub fn project_trajectory(
    trajectory: &HybridTrajectory,
    axes: &Axes2d,
) -> PlotResult<Vec<[Real; 2]>> {
    trajectory
        .iter()
        .map(|point| -> PlotResult<[Real; 2]> {
            let coordinate = |bound: &crate::AxisBound| {
                bound
                    .coordinate
                    .value(point.time, &point.state)
                    .ok_or_else(|| PlotError::MissingCoordinate {
                        coordinate: bound.coordinate.to_string(),
                        time: point.time,
                    })
            };
            Ok([coordinate(&axes.x)?, coordinate(&axes.y)?])
        })
        .collect()
}

/// One rectangle per reach enclosure of the flow tube.
pub fn project_orbit(orbit: &Orbit, axes: &Axes2d) -> PlotResult<Vec<PlotBox>> {
    orbit
        .reach
        .iter()
        .chain(&orbit.final_enclosures)
        .map(|enclosure| -> PlotResult<PlotBox> {
            let range = |bound: &crate::AxisBound| {
                bound
                    .coordinate
                    .range(enclosure.time, &enclosure.state)
                    .ok_or_else(|| PlotError::MissingCoordinate {
                        coordinate: bound.coordinate.to_string(),
                        time: enclosure.time.lower(),
                    })
            };
            let (x, y) = (range(&axes.x)?, range(&axes.y)?);
            Ok(PlotBox {
                x: [x.lower(), x.upper()],
                y: [y.lower(), y.upper()],
            })
        })
        .collect()
}
