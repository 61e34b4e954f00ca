//! Converter and controller automata, their composition, initial set and
//! horizons.

use hf_automaton::{
    CompositeHybridAutomaton, EventKind, HybridAutomaton, HybridBoundedConstraintSet, HybridTime,
    check_urgent_nonblocking,
};
use hf_core::expr::{cos, dot, lit, next};
use hf_core::{Expr, Interval, RealConstant, Valuation};

use crate::config::InitialCondition;
use crate::error::BuckResult;
use crate::parameters::{BuckParameters, BuckSymbols, CircuitConstants, ControlConstants};

/// Continuous horizon of the simulation driver (seconds).
pub const SIMULATION_FINAL_TIME: f64 = 2e-2;
/// Continuous horizon of the verified-evolution driver (seconds).
pub const EVOLUTION_FINAL_TIME: f64 = 3.27e-3;
/// Event bound shared by both drivers.
pub const MAXIMUM_EVENTS: usize = 15000;

/// Box resolution of the urgent-guard overlap check.
const OVERLAP_RESOLUTION: f64 = 1e-3;

/// The `circuit` automaton: inductor current and capacitor voltage, with
/// one set of ODEs per bridge position. Switching is left to the controller
/// through the shared events, so no guard is attached here.
pub fn get_converter(
    circuit: &CircuitConstants,
    symbols: &BuckSymbols,
) -> BuckResult<HybridAutomaton> {
    let CircuitConstants { e, r, l, c } = circuit;
    let (i_l, v_c) = (&symbols.i_l, &symbols.v_c);
    let on = symbols.circuit.at(&symbols.tags.on);
    let off = symbols.circuit.at(&symbols.tags.off);

    let capacitor = lit(1.0) / c * (Expr::from(i_l) - Expr::from(v_c) / r);

    let mut converter = HybridAutomaton::new(symbols.circuit.name());
    converter.new_mode(
        on.clone(),
        vec![
            dot(i_l, lit(1.0) / l * (-Expr::from(v_c) + e)),
            dot(v_c, capacitor.clone()),
        ],
    )?;
    converter.new_mode(
        off.clone(),
        vec![
            dot(i_l, lit(1.0) / l * -Expr::from(v_c)),
            dot(v_c, capacitor),
        ],
    )?;

    let identity = || vec![next(i_l, i_l), next(v_c, v_c)];
    converter.new_transition(
        &off,
        &symbols.turn_on,
        &on,
        None,
        identity(),
        EventKind::Permissive,
    )?;
    converter.new_transition(
        &on,
        &symbols.turn_off,
        &off,
        None,
        identity(),
        EventKind::Permissive,
    )?;
    Ok(converter)
}

/// `s = (1 - alpha/(R*C))*v_C + (alpha/C)*i_L - v_C_s` with `alpha = C*cos(phi)`.
pub fn sliding_surface(
    circuit: &CircuitConstants,
    control: &ControlConstants,
    symbols: &BuckSymbols,
) -> BuckResult<Expr> {
    let CircuitConstants { r, c, .. } = circuit;
    let alpha = RealConstant::defined("alpha", Expr::from(c) * cos(&control.phi))?;
    Ok(
        (lit(1.0) - Expr::from(&alpha) / (Expr::from(r) * c)) * &symbols.v_c
            + Expr::from(&alpha) / c * &symbols.i_l
            - &control.v_c_s,
    )
}

/// The `bridge_switch` automaton: two modes without dynamics, switched by
/// urgent transitions when the sliding surface leaves the hysteresis band.
pub fn get_controller(
    circuit: &CircuitConstants,
    control: &ControlConstants,
    symbols: &BuckSymbols,
) -> BuckResult<HybridAutomaton> {
    let on = symbols.bridge_switch.at(&symbols.tags.on);
    let off = symbols.bridge_switch.at(&symbols.tags.off);
    let surface = sliding_surface(circuit, control, symbols)?;

    let mut controller = HybridAutomaton::new(symbols.bridge_switch.name());
    controller.new_mode(on.clone(), vec![])?;
    controller.new_mode(off.clone(), vec![])?;
    controller.new_transition(
        &off,
        &symbols.turn_on,
        &on,
        Some(surface.clone().le(-Expr::from(&control.epsilon))),
        vec![],
        EventKind::Urgent,
    )?;
    controller.new_transition(
        &on,
        &symbols.turn_off,
        &off,
        Some(surface.ge(&control.epsilon)),
        vec![],
        EventKind::Urgent,
    )?;
    Ok(controller)
}

/// State region covered by the plots; also the domain of the urgent-guard
/// overlap check.
pub fn plot_domain(symbols: &BuckSymbols) -> Valuation<Interval> {
    let mut domain = Valuation::new();
    domain.insert(symbols.i_l.name(), Interval::new(-1.0, 25.0));
    domain.insert(symbols.v_c.name(), Interval::new(-5.0, 60.0));
    domain
}

/// Compose converter and controller into `buck_converter` and check that
/// no two urgent transitions can be forced at once.
pub fn get_system(
    parameters: &BuckParameters,
    symbols: &BuckSymbols,
) -> BuckResult<CompositeHybridAutomaton> {
    parameters.validate()?;
    let circuit = parameters.circuit_constants();
    let control = parameters.control_constants();

    let converter = get_converter(&circuit, symbols)?;
    let controller = get_controller(&circuit, &control, symbols)?;
    let system = CompositeHybridAutomaton::new("buck_converter", vec![converter, controller])?;
    check_urgent_nonblocking(&system, &plot_domain(symbols), OVERLAP_RESOLUTION)?;

    tracing::info!("System: {}", system.name());
    tracing::debug!("{system}");
    Ok(system)
}

/// Both automata at their `on` location, each state variable constrained
/// as `initial` says.
pub fn get_initial_set(
    symbols: &BuckSymbols,
    initial: &InitialCondition,
) -> BuckResult<HybridBoundedConstraintSet> {
    let circuit = symbols.circuit.at(&symbols.tags.on);
    let bridge = symbols.bridge_switch.at(&symbols.tags.on);
    let set = HybridBoundedConstraintSet::new(
        [&circuit, &bridge],
        vec![
            initial.i_l.bound(&symbols.i_l),
            initial.v_c.bound(&symbols.v_c),
        ],
    )?;
    tracing::info!("Initial set: {set}");
    Ok(set)
}

pub fn get_final_time() -> BuckResult<HybridTime> {
    Ok(HybridTime::new(SIMULATION_FINAL_TIME, MAXIMUM_EVENTS)?)
}

pub fn get_evolution_final_time() -> BuckResult<HybridTime> {
    Ok(HybridTime::new(EVOLUTION_FINAL_TIME, MAXIMUM_EVENTS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::Real;

    fn surface_at(i_l: Real, v_c: Real) -> Real {
        let p = BuckParameters::default();
        let symbols = BuckSymbols::default();
        let s = sliding_surface(&p.circuit_constants(), &p.control_constants(), &symbols).unwrap();
        let mut point = Valuation::new();
        point.insert("i_L", i_l);
        point.insert("v_C", v_c);
        s.evaluate::<Real>(&point.lookup()).unwrap()
    }

    #[test]
    fn surface_matches_closed_form() {
        let (r, c, phi, v_c_s): (Real, Real, Real, Real) =
            (8.0, 0.6e-3, std::f64::consts::FRAC_PI_4, 36.0);
        let alpha = c * phi.cos();
        let expected = |i: Real, v: Real| (1.0 - alpha / (r * c)) * v + (alpha / c) * i - v_c_s;
        for (i, v) in [(0.0, 0.0), (4.5, 36.0), (20.0, 10.0)] {
            assert!((surface_at(i, v) - expected(i, v)).abs() < 1e-9);
        }
    }

    #[test]
    fn converter_has_two_modes_and_no_guards() {
        let p = BuckParameters::default();
        let symbols = BuckSymbols::default();
        let converter = get_converter(&p.circuit_constants(), &symbols).unwrap();
        assert_eq!(converter.name(), "circuit");
        assert_eq!(converter.modes().len(), 2);
        assert!(converter.transitions().iter().all(|t| t.guard.is_none()));
        assert!(converter.transitions().iter().all(|t| t.resets.len() == 2));
    }

    #[test]
    fn controller_guards_are_urgent() {
        let p = BuckParameters::default();
        let symbols = BuckSymbols::default();
        let controller =
            get_controller(&p.circuit_constants(), &p.control_constants(), &symbols).unwrap();
        assert_eq!(controller.name(), "bridge_switch");
        assert!(controller.modes().iter().all(|m| m.dynamics.is_empty()));
        assert!(
            controller
                .transitions()
                .iter()
                .all(|t| t.kind == EventKind::Urgent && t.guard.is_some())
        );
    }

    #[test]
    fn horizons() {
        let sim = get_final_time().unwrap();
        assert_eq!(sim.continuous_time(), 2e-2);
        assert_eq!(sim.discrete_time(), 15000);
        let evolution = get_evolution_final_time().unwrap();
        assert_eq!(evolution.continuous_time(), 3.27e-3);
        assert_eq!(evolution.discrete_time(), 15000);
    }
}
