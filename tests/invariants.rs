//! Property-based invariants
//!
//! Coverage areas:
//! - Determinism: a fixed dependency graph and fixed inputs always settle
//!   on the same final store, regardless of registration order
//! - Tainting: every attribute reachable from a root error ends up an error
//! - Single firing: no rule ever fires more than once in a run

use proptest::prelude::*;
use reactor::{Attribute, Reactor};

fn build_chain(order: &[usize], length: usize) -> (Reactor<u32>, Vec<Attribute<u32>>) {
    let mut r: Reactor<u32> = Reactor::new();
    let attrs: Vec<Attribute<u32>> = (0..=length).map(|i| Attribute::on(1, format!("a{i}"))).collect();

    for &i in order {
        let from = attrs[i].clone();
        let to = attrs[i + 1].clone();
        r.rule(vec![to]).using(vec![from]).by(|cx| {
            let v = *cx.get(0).downcast_ref::<i64>().unwrap();
            cx.set(0, v + 1);
        });
    }
    (r, attrs)
}

proptest! {
    #[test]
    fn chain_settles_to_the_same_value_regardless_of_registration_order(
        length in 1usize..8,
        seed in 0u64..1000,
    ) {
        let mut order: Vec<usize> = (0..length).collect();
        // deterministic pseudo-shuffle from `seed`, no RNG state across runs
        for i in (1..order.len()).rev() {
            let j = (seed as usize + i * 2654435761) % (i + 1);
            order.swap(i, j);
        }

        let (mut r, attrs) = build_chain(&order, length);
        r.set(attrs[0].clone(), 0i64).unwrap();
        r.run().unwrap();

        let last = r.get(&attrs[length]).unwrap();
        prop_assert_eq!(last.downcast_ref::<i64>(), Some(&(length as i64)));
    }

    #[test]
    fn a_root_error_taints_every_attribute_downstream(length in 1usize..8) {
        let order: Vec<usize> = (0..length).collect();
        let (mut r, attrs) = build_chain(&order, length);
        r.error_desc("root failure", Some(1u32), &[attrs[0].clone()]).unwrap();
        r.run().unwrap();

        for attr in &attrs[1..] {
            prop_assert!(r.get(attr).unwrap().is_error());
        }
    }

    #[test]
    fn rule_count_fired_never_exceeds_rules_registered(length in 1usize..8) {
        let order: Vec<usize> = (0..length).collect();
        let (mut r, attrs) = build_chain(&order, length);
        r.set(attrs[0].clone(), 0i64).unwrap();
        let stats = r.run().unwrap();

        prop_assert!(stats.rules_fired <= length);

        // A second run with no new inputs must fire nothing further —
        // every rule in the chain already fired exactly once.
        let stats_again = r.run().unwrap();
        prop_assert_eq!(stats_again.rules_fired, 0);
    }
}
