//! Named plot artifacts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use hf_evolve::Orbit;
use hf_sim::HybridTrajectory;
use serde::{Deserialize, Serialize};

use crate::axes::{Axes2d, AxisBound};
use crate::project::{PlotBox, project_orbit, project_trajectory};
use crate::{PlotError, PlotResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotData {
    /// Simulated trajectory.
    Polyline { points: Vec<[f64; 2]> },
    /// Flow tube.
    Boxes { boxes: Vec<PlotBox> },
}

impl PlotData {
    pub fn len(&self) -> usize {
        match self {
            PlotData::Polyline { points } => points.len(),
            PlotData::Boxes { boxes } => boxes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotArtifact {
    pub name: String,
    pub x_axis: AxisBound,
    pub y_axis: AxisBound,
    pub data: PlotData,
    pub generated_at: String,
}

/// Writes artifacts as `<output_dir>/<name>.json`.
#[derive(Clone, Debug)]
pub struct Plotter {
    output_dir: PathBuf,
}

impl Plotter {
    pub fn new(output_dir: impl Into<PathBuf>) -> PlotResult<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.json"))
    }

    pub fn plot_trajectory(
        &self,
        name: &str,
        axes: &Axes2d,
        trajectory: &HybridTrajectory,
    ) -> PlotResult<PathBuf> {
        let points = project_trajectory(trajectory, axes)?;
        self.write(name, axes, PlotData::Polyline { points })
    }

    pub fn plot_orbit(&self, name: &str, axes: &Axes2d, orbit: &Orbit) -> PlotResult<PathBuf> {
        let boxes = project_orbit(orbit, axes)?;
        self.write(name, axes, PlotData::Boxes { boxes })
    }

    pub fn load(&self, name: &str) -> PlotResult<PlotArtifact> {
        let content = fs::read_to_string(self.artifact_path(name))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, name: &str, axes: &Axes2d, data: PlotData) -> PlotResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(PlotError::InvalidName {
                name: name.to_string(),
            });
        }
        let artifact = PlotArtifact {
            name: name.to_string(),
            x_axis: axes.x.clone(),
            y_axis: axes.y.clone(),
            data,
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        let path = self.artifact_path(name);
        fs::write(&path, serde_json::to_string_pretty(&artifact)?)?;
        tracing::debug!(path = %path.display(), items = artifact.data.len(), "plot written");
        Ok(path)
    }
}
