//! Run configuration: parameters, initial condition and driver settings,
//! loadable from YAML. Every field has a default, so an empty file runs the
//! reference converter.

use std::fmt;
use std::path::{Path, PathBuf};

use hf_automaton::{HybridTime, VariableBound};
use hf_core::{Real, RealVariable};
use hf_sim::IntegratorType;
use serde::{Deserialize, Serialize};

use crate::error::{BuckError, BuckResult};
use crate::model::{EVOLUTION_FINAL_TIME, MAXIMUM_EVENTS, SIMULATION_FINAL_TIME};
use crate::parameters::BuckParameters;

/// Initial constraint on one state variable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialBound {
    Equal(Real),
    Between { lower: Real, upper: Real },
}

impl InitialBound {
    pub fn bound(&self, variable: &RealVariable) -> (RealVariable, VariableBound) {
        let bound = match *self {
            InitialBound::Equal(value) => VariableBound::Equal(value),
            InitialBound::Between { lower, upper } => VariableBound::Between(lower, upper),
        };
        (variable.clone(), bound)
    }

    fn validate(&self, name: &str) -> BuckResult<()> {
        let ok = match *self {
            InitialBound::Equal(value) => value.is_finite(),
            InitialBound::Between { lower, upper } => {
                lower.is_finite() && upper.is_finite() && lower <= upper
            }
        };
        if ok {
            Ok(())
        } else {
            Err(BuckError::Config {
                what: format!("initial bound on {name} is not a finite interval: {self:?}"),
            })
        }
    }
}

impl Default for InitialBound {
    fn default() -> Self {
        InitialBound::Equal(0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialCondition {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub i_l: InitialBound,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub v_c: InitialBound,
}

/// Fixed-step scheme of the simulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationIntegrator {
    #[default]
    Rk4,
    ForwardEuler,
}

impl From<SimulationIntegrator> for IntegratorType {
    fn from(integrator: SimulationIntegrator) -> Self {
        match integrator {
            SimulationIntegrator::Rk4 => IntegratorType::RK4,
            SimulationIntegrator::ForwardEuler => IntegratorType::ForwardEuler,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub step_size: Real,
    pub integrator: SimulationIntegrator,
    pub final_time: Real,
    pub max_events: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_size: 1e-6,
            integrator: SimulationIntegrator::default(),
            final_time: SIMULATION_FINAL_TIME,
            max_events: MAXIMUM_EVENTS,
        }
    }
}

impl SimulationSettings {
    pub fn horizon(&self) -> BuckResult<HybridTime> {
        Ok(HybridTime::new(self.final_time, self.max_events)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSettings {
    pub maximum_enclosure_radius: Real,
    pub maximum_step_size: Real,
    pub final_time: Real,
    pub max_events: usize,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            maximum_enclosure_radius: 300.0,
            maximum_step_size: 1e-6,
            final_time: EVOLUTION_FINAL_TIME,
            max_events: MAXIMUM_EVENTS,
        }
    }
}

impl EvolutionSettings {
    pub fn horizon(&self) -> BuckResult<HybridTime> {
        Ok(HybridTime::new(self.final_time, self.max_events)?)
    }
}

/// Which drivers a run executes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Simulate,
    Evolve,
    #[default]
    Both,
}

impl RunMode {
    pub fn simulates(self) -> bool {
        matches!(self, RunMode::Simulate | RunMode::Both)
    }

    pub fn evolves(self) -> bool {
        matches!(self, RunMode::Evolve | RunMode::Both)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Simulate => "simulate",
            RunMode::Evolve => "evolve",
            RunMode::Both => "both",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub parameters: BuckParameters,
    pub initial: InitialCondition,
    pub simulation: SimulationSettings,
    pub evolution: EvolutionSettings,
    /// Directory receiving the plot artifacts.
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parameters: BuckParameters::default(),
            initial: InitialCondition::default(),
            simulation: SimulationSettings::default(),
            evolution: EvolutionSettings::default(),
            output_dir: PathBuf::from("plots"),
        }
    }
}

impl RunConfig {
    pub fn load_yaml(path: &Path) -> BuckResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> BuckResult<Self> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_yaml(&self, path: &Path) -> BuckResult<()> {
        self.validate()?;
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> BuckResult<()> {
        self.parameters.validate()?;
        self.initial.i_l.validate("i_L")?;
        self.initial.v_c.validate("v_C")?;
        let positive = [
            ("simulation.step_size", self.simulation.step_size),
            ("evolution.maximum_step_size", self.evolution.maximum_step_size),
            (
                "evolution.maximum_enclosure_radius",
                self.evolution.maximum_enclosure_radius,
            ),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(BuckError::Config {
                    what: format!("{name} must be positive, got {value}"),
                });
            }
        }
        self.simulation.horizon()?;
        self.evolution.horizon()?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(BuckError::Config {
                what: "output_dir is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_reference_run() {
        let config = RunConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.simulation.step_size, 1e-6);
        assert_eq!(config.simulation.integrator, SimulationIntegrator::Rk4);
        assert_eq!(config.evolution.maximum_enclosure_radius, 300.0);
        assert_eq!(config.evolution.final_time, 3.27e-3);
    }

    #[test]
    fn demo_file_is_the_reference_run() {
        let config =
            RunConfig::from_yaml_str(include_str!("../../../demos/buck_converter.yaml")).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let yaml = "
parameters:
  load_resistance: 4.0
initial:
  v_c:
    between:
      lower: 0.0
      upper: 1.0
simulation:
  integrator: forward_euler
evolution:
  final_time: 1.0e-4
output_dir: out
";
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.parameters.circuit_constants().r.value(), 4.0);
        assert_eq!(config.parameters.circuit_constants().e.value(), 48.0);
        assert_eq!(
            config.initial.v_c,
            InitialBound::Between {
                lower: 0.0,
                upper: 1.0
            }
        );
        assert_eq!(config.initial.i_l, InitialBound::Equal(0.0));
        assert_eq!(
            IntegratorType::from(config.simulation.integrator),
            IntegratorType::ForwardEuler
        );
        assert_eq!(config.simulation.step_size, 1e-6);
        assert_eq!(config.evolution.final_time, 1.0e-4);
        assert_eq!(config.evolution.max_events, 15000);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn rejects_inverted_initial_interval() {
        let yaml = "
initial:
  i_l:
    between:
      lower: 2.0
      upper: 1.0
";
        assert!(matches!(
            RunConfig::from_yaml_str(yaml),
            Err(BuckError::Config { .. })
        ));
    }

    #[test]
    fn initial_bounds_round_trip_as_maps() {
        let config = RunConfig {
            initial: InitialCondition {
                i_l: InitialBound::Between {
                    lower: -0.5,
                    upper: 0.5,
                },
                v_c: InitialBound::Equal(12.0),
            },
            ..RunConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("equal: 12.0"), "{yaml}");
        assert!(!yaml.contains('!'), "{yaml}");
        assert_eq!(RunConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn rejects_unknown_integrator() {
        let yaml = "
simulation:
  integrator: leapfrog
";
        assert!(matches!(
            RunConfig::from_yaml_str(yaml),
            Err(BuckError::Yaml(_))
        ));
    }

    #[test]
    fn rejects_negative_horizon() {
        let config = RunConfig {
            simulation: SimulationSettings {
                final_time: -1.0,
                ..SimulationSettings::default()
            },
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(BuckError::Model(_))));
    }

    #[test]
    fn run_mode_selects_drivers() {
        assert!(RunMode::Both.simulates() && RunMode::Both.evolves());
        assert!(RunMode::Simulate.simulates() && !RunMode::Simulate.evolves());
        assert!(!RunMode::Evolve.simulates() && RunMode::Evolve.evolves());
        assert_eq!(RunMode::default().to_string(), "both");
    }
}
