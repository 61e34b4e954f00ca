//! Time-stamped state enclosures and the flow tube built from them.

use core::fmt;

use hf_core::{DiscreteLocation, Interval, Real, Valuation};

/// A box of continuous states in one composite location, valid over a time
/// interval, together with the range of event counts that can lead to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Enclosure {
    pub time: Interval,
    pub location: DiscreteLocation,
    /// Smallest and largest number of events taken.
    pub events: (usize, usize),
    pub state: Valuation<Interval>,
}

impl Enclosure {
    pub fn new(
        time: Interval,
        location: DiscreteLocation,
        events: (usize, usize),
        state: Valuation<Interval>,
    ) -> Self {
        Self {
            time,
            location,
            events,
            state,
        }
    }

    pub fn radius(&self) -> Real {
        self.state.radius()
    }

    /// Widen `self` to cover `other`. Both must share a location.
    pub fn merge(&mut self, other: &Enclosure) {
        debug_assert_eq!(self.location, other.location);
        self.time = self.time.hull(&other.time);
        self.events = (
            self.events.0.min(other.events.0),
            self.events.1.max(other.events.1),
        );
        self.state = self.state.hull(&other.state);
    }

    /// Whether the point `(time, location, state)` lies in this enclosure.
    pub fn contains(&self, time: Real, location: &DiscreteLocation, state: &Valuation<Real>) -> bool {
        &self.location == location && self.time.contains(time) && self.state.contains_point(state)
    }
}

impl fmt::Display for Enclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} {} events={}..{} {}",
            self.time, self.location, self.events.0, self.events.1, self.state
        )
    }
}

/// Result of a verified evolution.
///
/// `reach` covers every time of the horizon (one enclosure per location and
/// time step); `evolve` holds the sets at the grid times; `final_enclosures`
/// are the sets at the end of the horizon or where the event bound stopped
/// evolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orbit {
    pub reach: Vec<Enclosure>,
    pub evolve: Vec<Enclosure>,
    pub final_enclosures: Vec<Enclosure>,
}

impl Orbit {
    /// Latest time covered by the flow tube.
    pub fn final_time(&self) -> Real {
        self.reach
            .iter()
            .chain(&self.final_enclosures)
            .map(|e| e.time.upper())
            .fold(0.0, Real::max)
    }

    /// Largest event count reached by any enclosure.
    pub fn max_events(&self) -> usize {
        self.reach
            .iter()
            .chain(&self.evolve)
            .chain(&self.final_enclosures)
            .map(|e| e.events.1)
            .max()
            .unwrap_or(0)
    }

    /// Reach enclosures that cover the point.
    pub fn covering<'a>(
        &'a self,
        time: Real,
        location: &'a DiscreteLocation,
        state: &'a Valuation<Real>,
    ) -> impl Iterator<Item = &'a Enclosure> + 'a {
        self.reach
            .iter()
            .chain(&self.final_enclosures)
            .filter(move |e| e.contains(time, location, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::StringVariable;

    fn enclosure(t: (Real, Real), x: (Real, Real), events: (usize, usize)) -> Enclosure {
        let mut state = Valuation::new();
        state.insert("x", Interval::new(x.0, x.1));
        Enclosure::new(
            Interval::new(t.0, t.1),
            StringVariable::new("m").at("a"),
            events,
            state,
        )
    }

    #[test]
    fn merge_takes_hulls() {
        let mut a = enclosure((0.0, 1.0), (0.0, 1.0), (2, 2));
        a.merge(&enclosure((0.5, 2.0), (3.0, 4.0), (1, 3)));
        assert_eq!(a.time, Interval::new(0.0, 2.0));
        assert_eq!(a.events, (1, 3));
        assert_eq!(a.state.get("x"), Some(&Interval::new(0.0, 4.0)));
        assert_eq!(a.radius(), 2.0);
    }

    #[test]
    fn covering_matches_time_location_and_state() {
        let orbit = Orbit {
            reach: vec![
                enclosure((0.0, 1.0), (0.0, 1.0), (0, 0)),
                enclosure((1.0, 2.0), (1.0, 2.0), (0, 0)),
            ],
            ..Orbit::default()
        };
        let loc = StringVariable::new("m").at("a");
        let mut point = Valuation::new();
        point.insert("x", 1.0);
        assert_eq!(orbit.covering(1.0, &loc, &point).count(), 2);
        point.insert("x", 1.5);
        assert_eq!(orbit.covering(0.5, &loc, &point).count(), 0);
        let other = StringVariable::new("m").at("b");
        assert_eq!(orbit.covering(1.5, &other, &point).count(), 0);
        assert_eq!(orbit.final_time(), 2.0);
    }
}
