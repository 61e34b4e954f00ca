//! Urgent-transition non-blocking validation.
//!
//! Two urgent transitions leaving the same location must never be forced at
//! the same state. Guard overlap is decided by interval branch-and-bound over
//! a bounding box of the state space: a sub-box is discarded as soon as one
//! of the guards is definitely false on it.

use hf_core::{Interval, Predicate, Real, Tribool, Valuation};

use crate::composite::CompositeHybridAutomaton;
use crate::error::{AutomatonError, AutomatonResult};

/// Upper bound on the number of boxes examined by one overlap query.
const MAX_BOXES: usize = 1 << 20;

/// Outcome of a guard overlap query.
#[derive(Clone, Debug, PartialEq)]
pub enum GuardOverlap {
    /// No state in the domain satisfies both guards.
    Disjoint,
    /// A box on which both guards could hold at once.
    Possible { witness: Valuation<Interval> },
}

impl GuardOverlap {
    pub fn is_disjoint(&self) -> bool {
        matches!(self, GuardOverlap::Disjoint)
    }
}

fn decide(guard: &Predicate, region: &Valuation<Interval>) -> AutomatonResult<Tribool> {
    Ok(guard.decide::<Interval>(&region.lookup())?)
}

fn widest(region: &Valuation<Interval>) -> Option<(String, Real)> {
    region
        .iter()
        .map(|(name, iv)| (name.to_string(), iv.width()))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Decide whether `first` and `second` can hold simultaneously in `domain`.
///
/// Boxes are bisected along their widest variable until one guard is
/// definitely false, or until the box is narrower than `resolution`, in
/// which case overlap is reported as possible.
pub fn guard_overlap(
    first: &Predicate,
    second: &Predicate,
    domain: &Valuation<Interval>,
    resolution: Real,
) -> AutomatonResult<GuardOverlap> {
    if !(resolution > 0.0) {
        return Err(AutomatonError::Core(hf_core::HfError::InvalidArg {
            what: "overlap resolution must be positive",
        }));
    }
    let mut stack = vec![domain.clone()];
    let mut examined = 0usize;
    while let Some(region) = stack.pop() {
        examined += 1;
        let a = decide(first, &region)?;
        if a == Tribool::False {
            continue;
        }
        let b = decide(second, &region)?;
        if b == Tribool::False {
            continue;
        }
        if a == Tribool::True && b == Tribool::True {
            return Ok(GuardOverlap::Possible { witness: region });
        }
        let Some((name, width)) = widest(&region) else {
            return Ok(GuardOverlap::Possible { witness: region });
        };
        if width <= resolution || examined >= MAX_BOXES {
            return Ok(GuardOverlap::Possible { witness: region });
        }
        let Some(iv) = region.get(&name).copied() else {
            continue;
        };
        let (lo, hi) = iv.bisect();
        let mut left = region.clone();
        left.insert(name.clone(), lo);
        let mut right = region;
        right.insert(name, hi);
        stack.push(left);
        stack.push(right);
    }
    tracing::trace!(examined, "guards proven disjoint");
    Ok(GuardOverlap::Disjoint)
}

/// Check every location of `system`: no two urgent transitions with distinct
/// events may have overlapping guards inside `domain`.
///
/// An urgent transition without a guard overlaps with everything.
pub fn check_urgent_nonblocking(
    system: &CompositeHybridAutomaton,
    domain: &Valuation<Interval>,
    resolution: Real,
) -> AutomatonResult<()> {
    for location in system.locations()? {
        let urgent: Vec<_> = system
            .transitions(&location)?
            .into_iter()
            .filter(|t| t.is_urgent())
            .collect();
        for (i, t1) in urgent.iter().enumerate() {
            for t2 in &urgent[i + 1..] {
                if t1.event == t2.event {
                    continue;
                }
                let overlap = match (&t1.guard, &t2.guard) {
                    (Some(g1), Some(g2)) => guard_overlap(g1, g2, domain, resolution)?,
                    _ => GuardOverlap::Possible {
                        witness: domain.clone(),
                    },
                };
                if let GuardOverlap::Possible { witness } = overlap {
                    tracing::warn!(%location, first = %t1.event, second = %t2.event, %witness, "urgent guards overlap");
                    return Err(AutomatonError::OverlappingUrgentGuards {
                        composite: system.name().to_string(),
                        location: location.to_string(),
                        first: t1.event.name().to_string(),
                        second: t2.event.name().to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
