//! Circuit and controller parameters, and the symbols shared by both automata.

use std::f64::consts::FRAC_PI_4;

use hf_core::units::{Capacitance, Inductance, Resistance, Voltage, farads, henries, ohms, volts};
use hf_core::{DiscreteEvent, RealConstant, RealVariable, StringVariable, truncate_to_digits};
use serde::{Deserialize, Serialize};
use uom::si::capacitance::farad;
use uom::si::electric_potential::volt;
use uom::si::electrical_resistance::ohm;
use uom::si::inductance::henry;

use crate::error::{BuckError, BuckResult};

/// Physical parameters of the converter and its controller.
///
/// Quantities are stored in SI base units, so a YAML file lists plain
/// numbers (`input_voltage: 48.0`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuckParameters {
    /// Source voltage `E`.
    pub input_voltage: Voltage,
    /// Load resistance `R`.
    pub load_resistance: Resistance,
    /// Inductance `L`.
    pub inductance: Inductance,
    /// Output capacitance `C`.
    pub capacitance: Capacitance,
    /// Half-width `epsilon` of the hysteresis band around the sliding surface.
    pub hysteresis: f64,
    /// Surface phase `phi` (radians).
    pub phase: f64,
    /// Output voltage setpoint `v_C_s`.
    pub reference_voltage: Voltage,
}

impl Default for BuckParameters {
    fn default() -> Self {
        Self {
            input_voltage: volts(48.0),
            load_resistance: ohms(8.0),
            inductance: henries(1.7e-3),
            capacitance: farads(0.6e-3),
            hysteresis: truncate_to_digits(0.1f64.sqrt(), 5),
            phase: FRAC_PI_4,
            reference_voltage: volts(36.0),
        }
    }
}

impl BuckParameters {
    pub fn validate(&self) -> BuckResult<()> {
        let positive = [
            ("input_voltage", self.input_voltage.get::<volt>()),
            ("load_resistance", self.load_resistance.get::<ohm>()),
            ("inductance", self.inductance.get::<henry>()),
            ("capacitance", self.capacitance.get::<farad>()),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(BuckError::Config {
                    what: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        if !(self.hysteresis >= 0.0) || !self.hysteresis.is_finite() {
            return Err(BuckError::Config {
                what: format!("hysteresis must be non-negative, got {}", self.hysteresis),
            });
        }
        if !self.phase.is_finite() || !self.reference_voltage.get::<volt>().is_finite() {
            return Err(BuckError::Config {
                what: "phase and reference_voltage must be finite".to_string(),
            });
        }
        Ok(())
    }

    pub fn circuit_constants(&self) -> CircuitConstants {
        CircuitConstants {
            e: RealConstant::new("E", self.input_voltage.get::<volt>()),
            r: RealConstant::new("R", self.load_resistance.get::<ohm>()),
            l: RealConstant::new("L", self.inductance.get::<henry>()),
            c: RealConstant::new("C", self.capacitance.get::<farad>()),
        }
    }

    pub fn control_constants(&self) -> ControlConstants {
        ControlConstants {
            epsilon: RealConstant::new("epsilon", self.hysteresis),
            phi: RealConstant::new("phi", self.phase),
            v_c_s: RealConstant::new("v_C_s", self.reference_voltage.get::<volt>()),
        }
    }
}

/// `E`, `R`, `L`, `C` as named constants.
#[derive(Clone, Debug, PartialEq)]
pub struct CircuitConstants {
    pub e: RealConstant,
    pub r: RealConstant,
    pub l: RealConstant,
    pub c: RealConstant,
}

/// `epsilon`, `phi`, `v_C_s` as named constants.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlConstants {
    pub epsilon: RealConstant,
    pub phi: RealConstant,
    pub v_c_s: RealConstant,
}

/// Tags of the two bridge positions, shared by both automata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTags {
    pub on: String,
    pub off: String,
}

impl Default for LocationTags {
    fn default() -> Self {
        Self {
            on: "on".to_string(),
            off: "off".to_string(),
        }
    }
}

/// Variables, events and scoping variables shared by the converter and the
/// controller. Both builders must receive the same instance for the
/// composition to synchronise.
#[derive(Clone, Debug, PartialEq)]
pub struct BuckSymbols {
    pub i_l: RealVariable,
    pub v_c: RealVariable,
    pub turn_on: DiscreteEvent,
    pub turn_off: DiscreteEvent,
    pub circuit: StringVariable,
    pub bridge_switch: StringVariable,
    pub tags: LocationTags,
}

impl BuckSymbols {
    pub fn with_tags(tags: LocationTags) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }
}

impl Default for BuckSymbols {
    fn default() -> Self {
        Self {
            i_l: RealVariable::new("i_L"),
            v_c: RealVariable::new("v_C"),
            turn_on: DiscreteEvent::new("turn_on"),
            turn_off: DiscreteEvent::new("turn_off"),
            circuit: StringVariable::new("circuit"),
            bridge_switch: StringVariable::new("bridge_switch"),
            tags: LocationTags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants() {
        let p = BuckParameters::default();
        let circuit = p.circuit_constants();
        assert_eq!(circuit.e.value(), 48.0);
        assert_eq!(circuit.r.value(), 8.0);
        assert_eq!(circuit.l.value(), 1.7e-3);
        assert_eq!(circuit.c.value(), 0.6e-3);
        let control = p.control_constants();
        assert_eq!(control.epsilon.value(), 0.31622);
        assert_eq!(control.phi.value(), FRAC_PI_4);
        assert_eq!(control.v_c_s.value(), 36.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_nonphysical_circuit() {
        let p = BuckParameters {
            inductance: henries(0.0),
            ..BuckParameters::default()
        };
        assert!(matches!(p.validate(), Err(BuckError::Config { .. })));

        let p = BuckParameters {
            hysteresis: -0.1,
            ..BuckParameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn custom_tags_keep_other_symbols() {
        let symbols = BuckSymbols::with_tags(LocationTags {
            on: "closed".into(),
            off: "open".into(),
        });
        assert_eq!(symbols.tags.on, "closed");
        assert_eq!(symbols.i_l.name(), "i_L");
        assert_eq!(symbols.turn_on.name(), "turn_on");
    }
}
