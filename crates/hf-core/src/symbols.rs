//! Named symbols used to write hybrid models.
//!
//! Identity of every symbol is its name: two `RealVariable`s created
//! separately with the same name denote the same quantity.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{HfError, HfResult};
use crate::expr::Expr;
use crate::numeric::{Real, ensure_finite};

/// Named continuous quantity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RealVariable(String);

impl RealVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RealVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The distinguished time variable used by projections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimeVariable;

impl TimeVariable {
    pub const NAME: &'static str = "t";

    pub fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl fmt::Display for TimeVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}

/// Named constant, either a literal or a closed-form expression of other
/// constants. The numeric value is computed once, on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct RealConstant {
    name: String,
    definition: Arc<Expr>,
    value: Real,
}

impl RealConstant {
    /// Constant bound to a literal value.
    pub fn new(name: impl Into<String>, value: Real) -> Self {
        Self {
            name: name.into(),
            definition: Arc::new(Expr::Literal(value)),
            value,
        }
    }

    /// Constant bound to an expression over other constants.
    ///
    /// Fails if the expression references a variable or evaluates to a
    /// non-finite number.
    pub fn defined(name: impl Into<String>, definition: Expr) -> HfResult<Self> {
        let name = name.into();
        if let Some(var) = definition.variables().into_iter().next() {
            return Err(HfError::Invariant {
                what: format!("constant '{name}' depends on variable '{var}'"),
            });
        }
        let value = definition.evaluate::<Real>(&|_| None)?;
        let value = ensure_finite(value, "constant definition")?;
        Ok(Self {
            name,
            definition: Arc::new(definition),
            value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn definition(&self) -> &Expr {
        &self.definition
    }
}

impl fmt::Display for RealConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:={}", self.name, self.value)
    }
}

/// Label synchronising transitions across automata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteEvent(String);

impl DiscreteEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiscreteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location-scoping variable of an automaton (`circuit`, `bridge_switch`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringVariable(String);

impl StringVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Location where this variable takes the value `tag`.
    pub fn at(&self, tag: impl Into<String>) -> DiscreteLocation {
        DiscreteLocation::new(self, tag)
    }
}

impl fmt::Display for StringVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assignment of tags to scoping variables.
///
/// A single-automaton location has one entry (`circuit|on`); a location of
/// a composite automaton has one entry per component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteLocation(BTreeMap<String, String>);

impl DiscreteLocation {
    pub fn new(variable: &StringVariable, tag: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(variable.name().to_string(), tag.into());
        Self(map)
    }

    /// Location built from several component locations.
    ///
    /// Fails if two components assign different tags to the same variable.
    pub fn product<'a>(parts: impl IntoIterator<Item = &'a DiscreteLocation>) -> HfResult<Self> {
        let mut map = BTreeMap::new();
        for part in parts {
            for (var, tag) in &part.0 {
                if let Some(existing) = map.insert(var.clone(), tag.clone()) {
                    if &existing != tag {
                        return Err(HfError::Invariant {
                            what: format!("variable '{var}' assigned both '{existing}' and '{tag}'"),
                        });
                    }
                }
            }
        }
        Ok(Self(map))
    }

    /// Tag assigned to `variable`, if any.
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.0.get(variable).map(String::as_str)
    }

    /// Sub-location for a single scoping variable.
    pub fn restrict(&self, variable: &str) -> Option<DiscreteLocation> {
        self.0.get_key_value(variable).map(|(k, v)| {
            let mut map = BTreeMap::new();
            map.insert(k.clone(), v.clone());
            DiscreteLocation(map)
        })
    }

    /// Replace the tags of the variables present in `update`.
    pub fn updated(&self, update: &DiscreteLocation) -> DiscreteLocation {
        let mut map = self.0.clone();
        for (k, v) in &update.0 {
            map.insert(k.clone(), v.clone());
        }
        DiscreteLocation(map)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiscreteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}|{v}")).collect();
        if parts.len() == 1 {
            f.write_str(&parts[0])
        } else {
            write!(f, "{{{}}}", parts.join(","))
        }
    }
}
