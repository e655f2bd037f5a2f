//! Assignment Planner: randomized round-robin pairing of recipients with
//! (scenario, template) items.

use driftmail_common::types::{ScenarioId, TemplateId};
use rand::Rng;

/// A deduplicated recipient, carrying just what the Planner and Scheduler
/// need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
}

/// One emitted (recipient, scenario, template) tuple, identified by the
/// recipient's index into the input slice so the caller can zip it back
/// against recipient data without cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub recipient_index: usize,
    pub scenario_id: ScenarioId,
    pub template_id: TemplateId,
}

/// Pair every recipient with every (scenario, template) item in
/// `pairs`, in emission order.
///
/// `recipients` must already be in deduplicated, deterministic
/// insertion order — this function never reorders them.
pub fn assign<R: Rng>(
    recipient_count: usize,
    pairs: &[(ScenarioId, TemplateId)],
    rng: &mut R,
) -> Vec<Assignment> {
    let k = pairs.len();
    let mut pools: Vec<Vec<(ScenarioId, TemplateId)>> = vec![pairs.to_vec(); recipient_count];
    let mut out = Vec::with_capacity(recipient_count * k);

    for _round in 0..k {
        for (recipient_index, pool) in pools.iter_mut().enumerate() {
            if pool.is_empty() {
                continue;
            }
            let pick = rng.gen_range(0..pool.len());
            let (scenario_id, template_id) = pool.remove(pick);
            out.push(Assignment {
                recipient_index,
                scenario_id,
                template_id,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    #[test]
    fn emits_exactly_recipients_times_pairs_tuples() {
        let pairs = vec![(Uuid::new_v4(), Uuid::new_v4()), (Uuid::new_v4(), Uuid::new_v4())];
        let mut rng = StdRng::seed_from_u64(7);
        let out = assign(3, &pairs, &mut rng);
        assert_eq!(out.len(), 3 * pairs.len());
    }

    #[test]
    fn every_recipient_gets_every_pair_exactly_once() {
        let pairs = vec![(Uuid::new_v4(), Uuid::new_v4()), (Uuid::new_v4(), Uuid::new_v4()), (Uuid::new_v4(), Uuid::new_v4())];
        let mut rng = StdRng::seed_from_u64(99);
        let out = assign(2, &pairs, &mut rng);

        for recipient_index in 0..2 {
            let mut got: Vec<_> = out
                .iter()
                .filter(|a| a.recipient_index == recipient_index)
                .map(|a| (a.scenario_id, a.template_id))
                .collect();
            got.sort();
            let mut expected = pairs.clone();
            expected.sort();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn zero_recipients_emits_nothing() {
        let pairs = vec![(Uuid::new_v4(), Uuid::new_v4())];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(assign(0, &pairs, &mut rng).is_empty());
    }
}
