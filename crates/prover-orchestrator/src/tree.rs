//! Composition tree geometry.
//!
//! A proving tree reduces N leaf proofs to one root by pairwise merging:
//! level L holds `ceil(count(L-1) / 2)` slots, and slot (L, i) depends on
//! slots (L-1, 2i) and (L-1, 2i+1). An odd tail pairs with the designated
//! padding proof. A single-leaf tree is complete at level 0: its leaf is
//! the root and no merge ever runs.
//!
//! The tree is pure bookkeeping: deriving eligible merges twice from the
//! same slot state yields the same set, and the stable job-id scheme makes
//! re-enqueueing collapse onto existing jobs.

use prover_types::RollupProofOutput;

/// A merge that can run now: both dependencies hold proofs (the right one
/// possibly padding) and the output slot is still empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleMerge {
    pub level: u32,
    pub index: u64,
    pub left: RollupProofOutput,
    pub right: RollupProofOutput,
}

#[derive(Debug, Clone)]
pub struct ProvingTree {
    /// `levels[0]` are the leaves; the last level has exactly one slot.
    levels: Vec<Vec<Option<RollupProofOutput>>>,
}

impl ProvingTree {
    /// Build the slot structure for `num_leaves` leaves.
    ///
    /// Panics on zero leaves; callers validate block sizes at admission.
    pub fn new(num_leaves: usize) -> Self {
        assert!(num_leaves > 0, "proving tree needs at least one leaf");
        let mut levels = vec![vec![None; num_leaves]];
        let mut count = num_leaves;
        while count > 1 {
            count = count.div_ceil(2);
            levels.push(vec![None; count]);
        }
        Self { levels }
    }

    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn root_level(&self) -> u32 {
        (self.levels.len() - 1) as u32
    }

    /// Total merge slots above the leaves.
    pub fn num_merge_slots(&self) -> usize {
        self.levels[1..].iter().map(Vec::len).sum()
    }

    pub fn get(&self, level: u32, index: u64) -> Option<&RollupProofOutput> {
        self.levels
            .get(level as usize)?
            .get(index as usize)?
            .as_ref()
    }

    /// Store a proof in a slot. Out-of-range writes are a caller bug.
    pub fn set(&mut self, level: u32, index: u64, output: RollupProofOutput) {
        let slot = self
            .levels
            .get_mut(level as usize)
            .and_then(|l| l.get_mut(index as usize))
            .unwrap_or_else(|| panic!("slot ({level}, {index}) outside tree"));
        *slot = Some(output);
    }

    /// Whether the root slot holds a proof.
    pub fn is_complete(&self) -> bool {
        self.levels
            .last()
            .and_then(|l| l.first())
            .map(Option::is_some)
            .unwrap_or(false)
    }

    pub fn root(&self) -> Option<&RollupProofOutput> {
        self.levels.last()?.first()?.as_ref()
    }

    /// All merges whose dependencies are satisfied and whose output slot is
    /// still empty. Pure function of the current slot state.
    pub fn eligible_merges(&self) -> Vec<EligibleMerge> {
        let mut eligible = Vec::new();
        for level in 1..self.levels.len() {
            let below = &self.levels[level - 1];
            for (index, slot) in self.levels[level].iter().enumerate() {
                if slot.is_some() {
                    continue;
                }
                let Some(left) = below.get(2 * index).and_then(Option::as_ref) else {
                    continue;
                };
                let right = match below.get(2 * index + 1) {
                    // Both children exist: wait for the right one too.
                    Some(Some(right)) => right.clone(),
                    Some(None) => continue,
                    // Odd tail: pair with the padding proof.
                    None => RollupProofOutput::padding(),
                };
                eligible.push(EligibleMerge {
                    level: level as u32,
                    index: index as u64,
                    left: left.clone(),
                    right,
                });
            }
        }
        eligible
    }
}
