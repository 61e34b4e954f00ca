//! Single hybrid automaton: modes and transitions.

use core::fmt;
use std::collections::BTreeSet;

use hf_core::expr::{DottedAssignment, PrimedAssignment};
use hf_core::{DiscreteEvent, DiscreteLocation, Predicate};

use crate::error::{AutomatonError, AutomatonResult};

/// Whether a transition must fire as soon as it is enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fires the instant its guard becomes true.
    Urgent,
    /// May fire at any time while its guard holds.
    #[default]
    Permissive,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Urgent => f.write_str("urgent"),
            EventKind::Permissive => f.write_str("permissive"),
        }
    }
}

/// A location with its flow equations. Empty dynamics are allowed.
#[derive(Clone, Debug, PartialEq)]
pub struct Mode {
    pub location: DiscreteLocation,
    pub dynamics: Vec<DottedAssignment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub source: DiscreteLocation,
    pub event: DiscreteEvent,
    pub target: DiscreteLocation,
    pub guard: Option<Predicate>,
    pub resets: Vec<PrimedAssignment>,
    pub kind: EventKind,
}

/// Named collection of modes and transitions.
///
/// The automaton name doubles as its location-scoping variable: every
/// location must assign a tag to exactly that variable.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridAutomaton {
    name: String,
    modes: Vec<Mode>,
    transitions: Vec<Transition>,
}

impl HybridAutomaton {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modes: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn mode(&self, location: &DiscreteLocation) -> Option<&Mode> {
        self.modes.iter().find(|m| &m.location == location)
    }

    pub fn has_mode(&self, location: &DiscreteLocation) -> bool {
        self.mode(location).is_some()
    }

    /// Events labelling at least one transition.
    pub fn events(&self) -> BTreeSet<DiscreteEvent> {
        self.transitions.iter().map(|t| t.event.clone()).collect()
    }

    /// Transition taken on `event` from `source`, if declared.
    pub fn transition(
        &self,
        source: &DiscreteLocation,
        event: &DiscreteEvent,
    ) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| &t.source == source && &t.event == event)
    }

    fn check_scope(&self, location: &DiscreteLocation) -> AutomatonResult<()> {
        if location.len() != 1 || location.get(&self.name).is_none() {
            return Err(AutomatonError::ForeignLocation {
                automaton: self.name.clone(),
                location: location.to_string(),
            });
        }
        Ok(())
    }

    /// Declare a mode with its flow equations.
    pub fn new_mode(
        &mut self,
        location: DiscreteLocation,
        dynamics: Vec<DottedAssignment>,
    ) -> AutomatonResult<()> {
        self.check_scope(&location)?;
        if self.has_mode(&location) {
            return Err(AutomatonError::DuplicateMode {
                automaton: self.name.clone(),
                location: location.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for eq in &dynamics {
            if !seen.insert(eq.variable.name()) {
                return Err(AutomatonError::DuplicateDynamics {
                    automaton: self.name.clone(),
                    location: location.to_string(),
                    variable: eq.variable.name().to_string(),
                });
            }
        }
        self.modes.push(Mode { location, dynamics });
        Ok(())
    }

    /// Declare a transition. Source and target modes must already exist.
    pub fn new_transition(
        &mut self,
        source: &DiscreteLocation,
        event: &DiscreteEvent,
        target: &DiscreteLocation,
        guard: Option<Predicate>,
        resets: Vec<PrimedAssignment>,
        kind: EventKind,
    ) -> AutomatonResult<()> {
        for (location, role) in [(source, "source"), (target, "target")] {
            if !self.has_mode(location) {
                return Err(AutomatonError::UndeclaredLocation {
                    automaton: self.name.clone(),
                    location: location.to_string(),
                    event: event.name().to_string(),
                    role,
                });
            }
        }
        if self.transition(source, event).is_some() {
            return Err(AutomatonError::DuplicateTransition {
                automaton: self.name.clone(),
                location: source.to_string(),
                event: event.name().to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for reset in &resets {
            if !seen.insert(reset.variable.name()) {
                return Err(AutomatonError::DuplicateReset {
                    automaton: self.name.clone(),
                    event: event.name().to_string(),
                    variable: reset.variable.name().to_string(),
                });
            }
        }
        self.transitions.push(Transition {
            source: source.clone(),
            event: event.clone(),
            target: target.clone(),
            guard,
            resets,
            kind,
        });
        Ok(())
    }
}

impl fmt::Display for HybridAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HybridAutomaton({})", self.name)?;
        for mode in &self.modes {
            let eqs: Vec<String> = mode.dynamics.iter().map(ToString::to_string).collect();
            writeln!(f, "  mode {}: [{}]", mode.location, eqs.join(", "))?;
        }
        for t in &self.transitions {
            let resets: Vec<String> = t.resets.iter().map(ToString::to_string).collect();
            let guard = t
                .guard
                .as_ref()
                .map_or_else(|| "true".to_string(), ToString::to_string);
            writeln!(
                f,
                "  {} -{}-> {} guard {} reset [{}] ({})",
                t.source,
                t.event,
                t.target,
                guard,
                resets.join(", "),
                t.kind
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::expr::{dot, next};
    use hf_core::{Expr, RealVariable, StringVariable};

    fn two_mode_automaton() -> (HybridAutomaton, DiscreteLocation, DiscreteLocation) {
        let valve = StringVariable::new("valve");
        let x = RealVariable::new("x");
        let open = valve.at("open");
        let closed = valve.at("closed");
        let mut a = HybridAutomaton::new(valve.name());
        a.new_mode(open.clone(), vec![dot(&x, 1.0)]).unwrap();
        a.new_mode(closed.clone(), vec![dot(&x, -1.0)]).unwrap();
        (a, open, closed)
    }

    #[test]
    fn declares_modes_and_transitions() {
        let (mut a, open, closed) = two_mode_automaton();
        let x = RealVariable::new("x");
        let close = DiscreteEvent::new("close");
        a.new_transition(
            &open,
            &close,
            &closed,
            Some(Expr::from(&x).ge(1.0)),
            vec![next(&x, &x)],
            EventKind::Urgent,
        )
        .unwrap();
        assert_eq!(a.modes().len(), 2);
        assert_eq!(a.events().len(), 1);
        let t = a.transition(&open, &close).unwrap();
        assert_eq!(t.target, closed);
        assert_eq!(t.kind, EventKind::Urgent);
        assert!(a.to_string().contains("valve|open -close-> valve|closed"));
    }

    #[test]
    fn rejects_undeclared_target() {
        let (mut a, open, _closed) = two_mode_automaton();
        let stuck = StringVariable::new("valve").at("stuck");
        let err = a
            .new_transition(
                &open,
                &DiscreteEvent::new("jam"),
                &stuck,
                None,
                vec![],
                EventKind::Permissive,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AutomatonError::UndeclaredLocation { role: "target", .. }
        ));
        assert!(err.to_string().contains("valve|stuck"));
    }

    #[test]
    fn rejects_foreign_and_duplicate_modes() {
        let (mut a, open, _) = two_mode_automaton();
        let other = StringVariable::new("pump").at("on");
        assert!(matches!(
            a.new_mode(other, vec![]),
            Err(AutomatonError::ForeignLocation { .. })
        ));
        assert!(matches!(
            a.new_mode(open, vec![]),
            Err(AutomatonError::DuplicateMode { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_event_from_same_source() {
        let (mut a, open, closed) = two_mode_automaton();
        let e = DiscreteEvent::new("close");
        a.new_transition(&open, &e, &closed, None, vec![], EventKind::Permissive)
            .unwrap();
        assert!(matches!(
            a.new_transition(&open, &e, &closed, None, vec![], EventKind::Permissive),
            Err(AutomatonError::DuplicateTransition { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_dynamics_and_resets() {
        let valve = StringVariable::new("valve");
        let x = RealVariable::new("x");
        let mut a = HybridAutomaton::new("valve");
        assert!(matches!(
            a.new_mode(valve.at("open"), vec![dot(&x, 1.0), dot(&x, 2.0)]),
            Err(AutomatonError::DuplicateDynamics { .. })
        ));
        a.new_mode(valve.at("open"), vec![dot(&x, 1.0)]).unwrap();
        assert!(matches!(
            a.new_transition(
                &valve.at("open"),
                &DiscreteEvent::new("e"),
                &valve.at("open"),
                None,
                vec![next(&x, 0.0), next(&x, 1.0)],
                EventKind::Permissive,
            ),
            Err(AutomatonError::DuplicateReset { .. })
        ));
    }
}
