//! Query-argument assignment with backtracking.
//!
//! Distributes an ordered list of query tokens across ordered, typed rules.
//! Tokens no rule accepts are dropped up front; the rest are consumed as
//! consecutive runs, one run per rule, in rule order. A `multiple` rule is
//! greedy; when its greed starves a later required rule the most recent
//! greedy extension is undone (LIFO) and the scan resumes from there.
//!
//! What happens after a restart depends only on the rule and candidate
//! position it resumes at, so restart states that already failed are
//! remembered and skipped. That keeps the search polynomial in the token
//! count.

use std::collections::HashSet;

/// The view of a query rule the assignment needs.
pub trait QuerySlot {
    fn required(&self) -> bool;
    fn multiple(&self) -> bool;
    /// Whether a decoded token satisfies this rule's kind.
    fn accepts(&self, value: &str) -> bool;
}

impl<T: QuerySlot + ?Sized> QuerySlot for &T {
    fn required(&self) -> bool {
        (**self).required()
    }

    fn multiple(&self) -> bool {
        (**self).multiple()
    }

    fn accepts(&self, value: &str) -> bool {
        (**self).accepts(value)
    }
}

/// A point where a greedy rule could have stopped instead of taking the
/// next token.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    rule: usize,
    value: usize,
    taken: usize,
}

/// Assign `values` to `rules`.
///
/// Returns, per rule, the indexes of the tokens it consumed (empty for an
/// optional rule that matched nothing), or `None` if a required rule cannot
/// be satisfied.
pub fn assign<R, S>(rules: &[R], values: &[S]) -> Option<Vec<Vec<usize>>>
where
    R: QuerySlot,
    S: AsRef<str>,
{
    let candidates: Vec<usize> = (0..values.len())
        .filter(|&i| rules.iter().any(|rule| rule.accepts(values[i].as_ref())))
        .collect();

    // (rule index, value index) in consumption order
    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut checkpoints: Vec<Checkpoint> = Vec::new();
    let mut counts = vec![0usize; rules.len()];
    let mut rule_index = 0;
    // position in `candidates`
    let mut value_index = 0;
    // restart states (rule, candidate position) whose continuation failed
    let mut failed: HashSet<(usize, usize)> = HashSet::new();
    // restarts in progress, with the checkpoint depth each began at
    let mut restarts: Vec<((usize, usize), usize)> = Vec::new();

    while rule_index < rules.len() {
        let rule = &rules[rule_index];
        let can_take = counts[rule_index] == 0 || rule.multiple();
        let next = candidates
            .get(value_index)
            .copied()
            .filter(|&i| can_take && rule.accepts(values[i].as_ref()));

        if let Some(found) = next {
            if counts[rule_index] > 0 {
                checkpoints.push(Checkpoint {
                    rule: rule_index,
                    value: value_index,
                    taken: taken.len(),
                });
            }
            taken.push((rule_index, found));
            counts[rule_index] += 1;
            value_index += 1;
            continue;
        }

        if counts[rule_index] > 0 || !rule.required() {
            rule_index += 1;
            continue;
        }

        // A required rule found nothing: make the latest greedy rule stop
        // one token earlier and close it there.
        let checkpoint = loop {
            // Falling back past a restart's own checkpoints means it failed.
            while let Some(&(state, depth)) = restarts.last() {
                if checkpoints.len() > depth {
                    break;
                }
                failed.insert(state);
                restarts.pop();
            }
            let checkpoint = checkpoints.pop()?;
            if !failed.contains(&(checkpoint.rule + 1, checkpoint.value)) {
                break checkpoint;
            }
        };
        log::trace!(
            "query rule {} starved, backtracking to rule {} at token {}",
            rule_index,
            checkpoint.rule,
            checkpoint.value
        );

        for &(r, _) in &taken[checkpoint.taken..] {
            counts[r] -= 1;
        }
        taken.truncate(checkpoint.taken);
        rule_index = checkpoint.rule + 1;
        value_index = checkpoint.value;
        restarts.push(((rule_index, value_index), checkpoints.len()));
    }

    let mut assigned = vec![Vec::new(); rules.len()];
    for (r, v) in taken {
        assigned[r].push(v);
    }
    Some(assigned)
}
