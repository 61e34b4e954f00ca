//! Ordered maps from variable names to values.

use core::fmt;
use std::collections::BTreeMap;

use crate::Real;
use crate::interval::Interval;

/// Value of each continuous variable, keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Valuation<T> {
    values: BTreeMap<String, T>,
}

impl<T: Clone> Valuation<T> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lookup closure suitable for expression evaluation.
    pub fn lookup(&self) -> impl Fn(&str) -> Option<T> + '_ {
        move |name: &str| self.values.get(name).cloned()
    }

    /// Apply `f` to every value.
    pub fn map<U: Clone>(&self, mut f: impl FnMut(&T) -> U) -> Valuation<U> {
        Valuation {
            values: self.values.iter().map(|(k, v)| (k.clone(), f(v))).collect(),
        }
    }
}

impl Valuation<Interval> {
    /// Largest interval radius over all variables.
    pub fn radius(&self) -> Real {
        self.values
            .values()
            .map(Interval::radius)
            .fold(0.0, Real::max)
    }

    /// Component-wise hull; variables missing on one side are kept as-is.
    pub fn hull(&self, other: &Valuation<Interval>) -> Valuation<Interval> {
        let mut values = self.values.clone();
        for (k, v) in &other.values {
            values
                .entry(k.clone())
                .and_modify(|mine| *mine = mine.hull(v))
                .or_insert(*v);
        }
        Valuation { values }
    }

    pub fn contains_point(&self, point: &Valuation<Real>) -> bool {
        self.values.iter().all(|(k, iv)| {
            point
                .get(k)
                .map(|x| iv.contains(*x))
                .unwrap_or(false)
        })
    }

    pub fn is_subset_of(&self, other: &Valuation<Interval>) -> bool {
        self.values.iter().all(|(k, iv)| {
            other
                .get(k)
                .map(|outer| iv.is_subset_of(outer))
                .unwrap_or(false)
        })
    }

    pub fn midpoint(&self) -> Valuation<Real> {
        self.map(Interval::midpoint)
    }
}

impl<T: Clone> FromIterator<(String, T)> for Valuation<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Valuation {
            values: iter.into_iter().collect(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Valuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
