//! Parallel composition of hybrid automata synchronised on shared events.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use hf_core::expr::{DottedAssignment, PrimedAssignment};
use hf_core::{DiscreteEvent, DiscreteLocation, Predicate, RealVariable};

use crate::automaton::{EventKind, HybridAutomaton};
use crate::error::{AutomatonError, AutomatonResult};

/// Synchronised transition of the composite system.
///
/// Its guard is the conjunction of the participants' guards, its resets the
/// union of their resets. It is urgent if any participant is urgent.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeTransition {
    pub event: DiscreteEvent,
    pub source: DiscreteLocation,
    pub target: DiscreteLocation,
    pub guard: Option<Predicate>,
    pub resets: Vec<PrimedAssignment>,
    pub kind: EventKind,
    /// Names of the components taking part.
    pub participants: Vec<String>,
}

impl CompositeTransition {
    pub fn is_urgent(&self) -> bool {
        self.kind == EventKind::Urgent
    }
}

/// Components composed in parallel, each keyed by its own scoping variable.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeHybridAutomaton {
    name: String,
    components: Vec<HybridAutomaton>,
}

impl CompositeHybridAutomaton {
    /// Compose `components` and check every product location for
    /// conflicting dynamics, conflicting resets and undefined variables.
    pub fn new(name: impl Into<String>, components: Vec<HybridAutomaton>) -> AutomatonResult<Self> {
        let name = name.into();
        let mut seen = BTreeSet::new();
        for component in &components {
            if !seen.insert(component.name()) {
                return Err(AutomatonError::DuplicateComponent {
                    composite: name.clone(),
                    component: component.name().to_string(),
                });
            }
        }
        let system = Self { name, components };
        for location in system.locations()? {
            system.check_location(&location)?;
        }
        tracing::debug!(
            composite = %system.name,
            components = system.components.len(),
            "composed hybrid automaton"
        );
        Ok(system)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[HybridAutomaton] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&HybridAutomaton> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Union of the components' alphabets.
    pub fn events(&self) -> BTreeSet<DiscreteEvent> {
        self.components.iter().flat_map(|c| c.events()).collect()
    }

    /// Every product of component locations, in a stable order.
    pub fn locations(&self) -> AutomatonResult<Vec<DiscreteLocation>> {
        let mut products = vec![DiscreteLocation::default()];
        for component in &self.components {
            let mut next = Vec::with_capacity(products.len() * component.modes().len());
            for partial in &products {
                for mode in component.modes() {
                    next.push(DiscreteLocation::product([partial, &mode.location])?);
                }
            }
            products = next;
        }
        Ok(products)
    }

    fn component_location(
        &self,
        component: &HybridAutomaton,
        location: &DiscreteLocation,
    ) -> AutomatonResult<DiscreteLocation> {
        location
            .restrict(component.name())
            .filter(|l| component.has_mode(l))
            .ok_or_else(|| AutomatonError::UnknownLocation {
                composite: self.name.clone(),
                location: location.to_string(),
            })
    }

    /// Check that `location` names one mode of every component.
    pub fn check_location_exists(&self, location: &DiscreteLocation) -> AutomatonResult<()> {
        if location.len() != self.components.len() {
            return Err(AutomatonError::UnknownLocation {
                composite: self.name.clone(),
                location: location.to_string(),
            });
        }
        for component in &self.components {
            self.component_location(component, location)?;
        }
        Ok(())
    }

    /// Merged flow equations of all components at `location`.
    pub fn dynamics(&self, location: &DiscreteLocation) -> AutomatonResult<Vec<DottedAssignment>> {
        self.check_location_exists(location)?;
        let mut owners: BTreeMap<String, (String, DottedAssignment)> = BTreeMap::new();
        for component in &self.components {
            let local = self.component_location(component, location)?;
            let Some(mode) = component.mode(&local) else {
                continue;
            };
            for eq in &mode.dynamics {
                let key = eq.variable.name().to_string();
                if let Some((first, _)) = owners.get(&key) {
                    return Err(AutomatonError::ConflictingDynamics {
                        composite: self.name.clone(),
                        location: location.to_string(),
                        variable: key,
                        first: first.clone(),
                        second: component.name().to_string(),
                    });
                }
                owners.insert(key, (component.name().to_string(), eq.clone()));
            }
        }
        Ok(owners.into_values().map(|(_, eq)| eq).collect())
    }

    /// Continuous state variables at `location`, sorted by name.
    pub fn state_variables(&self, location: &DiscreteLocation) -> AutomatonResult<Vec<RealVariable>> {
        Ok(self
            .dynamics(location)?
            .into_iter()
            .map(|eq| eq.variable)
            .collect())
    }

    /// Synchronised transitions available from `location`.
    ///
    /// An event is available only if every component whose alphabet
    /// contains it declares a transition on it from its current location.
    pub fn transitions(&self, location: &DiscreteLocation) -> AutomatonResult<Vec<CompositeTransition>> {
        self.check_location_exists(location)?;
        let mut result = Vec::new();
        'events: for event in self.events() {
            let mut target = location.clone();
            let mut guard: Option<Predicate> = None;
            let mut resets: Vec<PrimedAssignment> = Vec::new();
            let mut reset_owner: BTreeMap<String, String> = BTreeMap::new();
            let mut kind = EventKind::Permissive;
            let mut participants = Vec::new();

            for component in &self.components {
                if !component.events().contains(&event) {
                    continue;
                }
                let local = self.component_location(component, location)?;
                let Some(t) = component.transition(&local, &event) else {
                    continue 'events;
                };
                target = target.updated(&t.target);
                if let Some(g) = &t.guard {
                    guard = Some(match guard {
                        Some(existing) => existing.and(g.clone()),
                        None => g.clone(),
                    });
                }
                for reset in &t.resets {
                    let key = reset.variable.name().to_string();
                    if let Some(first) = reset_owner.get(&key) {
                        return Err(AutomatonError::ConflictingResets {
                            composite: self.name.clone(),
                            event: event.name().to_string(),
                            variable: key,
                            first: first.clone(),
                            second: component.name().to_string(),
                        });
                    }
                    reset_owner.insert(key, component.name().to_string());
                    resets.push(reset.clone());
                }
                if t.kind == EventKind::Urgent {
                    kind = EventKind::Urgent;
                }
                participants.push(component.name().to_string());
            }

            result.push(CompositeTransition {
                event,
                source: location.clone(),
                target,
                guard,
                resets,
                kind,
                participants,
            });
        }
        Ok(result)
    }

    fn check_location(&self, location: &DiscreteLocation) -> AutomatonResult<()> {
        let defined: BTreeSet<String> = self
            .state_variables(location)?
            .into_iter()
            .map(|v| v.name().to_string())
            .collect();
        let unknown = |component: &str, names: BTreeSet<String>| {
            names
                .into_iter()
                .find(|n| !defined.contains(n))
                .map(|variable| AutomatonError::UnknownVariable {
                    composite: self.name.clone(),
                    component: component.to_string(),
                    location: location.to_string(),
                    variable,
                })
        };

        for component in &self.components {
            let local = self.component_location(component, location)?;
            if let Some(mode) = component.mode(&local) {
                for eq in &mode.dynamics {
                    if let Some(err) = unknown(component.name(), eq.expr.variables()) {
                        return Err(err);
                    }
                }
            }
        }
        for t in self.transitions(location)? {
            let mut names = BTreeSet::new();
            if let Some(g) = &t.guard {
                names.extend(g.variables());
            }
            for reset in &t.resets {
                names.insert(reset.variable.name().to_string());
                names.extend(reset.expr.variables());
            }
            if let Some(err) = unknown(&t.participants.join("+"), names) {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl fmt::Display for CompositeHybridAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CompositeHybridAutomaton({})", self.name)?;
        for component in &self.components {
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::expr::{dot, next};
    use hf_core::{Expr, StringVariable};

    struct Fixture {
        tank: StringVariable,
        pump: StringVariable,
        fill: DiscreteEvent,
        drain: DiscreteEvent,
        h: RealVariable,
    }

    fn fixture() -> Fixture {
        Fixture {
            tank: StringVariable::new("tank"),
            pump: StringVariable::new("pump"),
            fill: DiscreteEvent::new("fill"),
            drain: DiscreteEvent::new("drain"),
            h: RealVariable::new("h"),
        }
    }

    fn plant(f: &Fixture) -> HybridAutomaton {
        let mut a = HybridAutomaton::new(f.tank.name());
        a.new_mode(f.tank.at("filling"), vec![dot(&f.h, 1.0)]).unwrap();
        a.new_mode(f.tank.at("draining"), vec![dot(&f.h, -1.0)]).unwrap();
        a.new_transition(
            &f.tank.at("draining"),
            &f.fill,
            &f.tank.at("filling"),
            None,
            vec![next(&f.h, &f.h)],
            EventKind::Permissive,
        )
        .unwrap();
        a.new_transition(
            &f.tank.at("filling"),
            &f.drain,
            &f.tank.at("draining"),
            None,
            vec![next(&f.h, &f.h)],
            EventKind::Permissive,
        )
        .unwrap();
        a
    }

    fn controller(f: &Fixture) -> HybridAutomaton {
        let mut a = HybridAutomaton::new(f.pump.name());
        a.new_mode(f.pump.at("on"), vec![]).unwrap();
        a.new_mode(f.pump.at("off"), vec![]).unwrap();
        a.new_transition(
            &f.pump.at("on"),
            &f.drain,
            &f.pump.at("off"),
            Some(Expr::from(&f.h).ge(2.0)),
            vec![],
            EventKind::Urgent,
        )
        .unwrap();
        a.new_transition(
            &f.pump.at("off"),
            &f.fill,
            &f.pump.at("on"),
            Some(Expr::from(&f.h).le(1.0)),
            vec![],
            EventKind::Urgent,
        )
        .unwrap();
        a
    }

    #[test]
    fn synchronises_shared_events() {
        let f = fixture();
        let system = CompositeHybridAutomaton::new("tank_system", vec![plant(&f), controller(&f)]).unwrap();
        assert_eq!(system.locations().unwrap().len(), 4);

        let loc = DiscreteLocation::product([&f.tank.at("filling"), &f.pump.at("on")]).unwrap();
        let ts = system.transitions(&loc).unwrap();
        assert_eq!(ts.len(), 1);
        let t = &ts[0];
        assert_eq!(t.event, f.drain);
        assert!(t.is_urgent());
        assert_eq!(t.participants, vec!["tank".to_string(), "pump".to_string()]);
        assert_eq!(
            t.target,
            DiscreteLocation::product([&f.tank.at("draining"), &f.pump.at("off")]).unwrap()
        );
        assert_eq!(t.resets.len(), 1);
    }

    #[test]
    fn event_blocked_when_a_participant_cannot_take_it() {
        let f = fixture();
        let system = CompositeHybridAutomaton::new("tank_system", vec![plant(&f), controller(&f)]).unwrap();
        // pump is off but tank is filling: neither event is jointly enabled
        let loc = DiscreteLocation::product([&f.tank.at("filling"), &f.pump.at("off")]).unwrap();
        let ts = system.transitions(&loc).unwrap();
        assert!(ts.is_empty());
    }

    #[test]
    fn merges_dynamics_and_reports_state_variables() {
        let f = fixture();
        let system = CompositeHybridAutomaton::new("tank_system", vec![plant(&f), controller(&f)]).unwrap();
        let loc = DiscreteLocation::product([&f.tank.at("draining"), &f.pump.at("off")]).unwrap();
        assert_eq!(system.state_variables(&loc).unwrap(), vec![f.h.clone()]);
        assert!(system.dynamics(&f.tank.at("draining")).is_err());
    }

    #[test]
    fn rejects_duplicate_components() {
        let f = fixture();
        let err = CompositeHybridAutomaton::new("dup", vec![plant(&f), plant(&f)]).unwrap_err();
        assert!(matches!(err, AutomatonError::DuplicateComponent { .. }));
    }

    #[test]
    fn rejects_guard_over_undefined_variable() {
        let f = fixture();
        let mut ctrl = HybridAutomaton::new(f.pump.name());
        ctrl.new_mode(f.pump.at("on"), vec![]).unwrap();
        ctrl.new_transition(
            &f.pump.at("on"),
            &DiscreteEvent::new("trip"),
            &f.pump.at("on"),
            Some(Expr::from(&RealVariable::new("pressure")).ge(1.0)),
            vec![],
            EventKind::Urgent,
        )
        .unwrap();
        let err = CompositeHybridAutomaton::new("bad", vec![plant(&f), ctrl]).unwrap_err();
        match err {
            AutomatonError::UnknownVariable { variable, .. } => assert_eq!(variable, "pressure"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_conflicting_dynamics() {
        let f = fixture();
        let mut other = HybridAutomaton::new("heater");
        other
            .new_mode(StringVariable::new("heater").at("on"), vec![dot(&f.h, 0.5)])
            .unwrap();
        let err = CompositeHybridAutomaton::new("bad", vec![plant(&f), other]).unwrap_err();
        assert!(matches!(err, AutomatonError::ConflictingDynamics { .. }));
    }
}
