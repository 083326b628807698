#![cfg(test)]

// Property tests for ProbeMap kept inside the crate so they can read the
// resize epoch through `stats` without extra plumbing.

use crate::config::{InsertPolicy, MapConfig};
use crate::error::Error;
use crate::probe_map::{Handle, ProbeMap};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking walks toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    Delete(usize),
    Get(usize),
    GetOr(usize),
    Contains(String),
    Find(usize),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            3 => idx.clone().prop_map(OpI::Delete),
            2 => idx.clone().prop_map(OpI::Get),
            1 => idx.clone().prop_map(OpI::GetOr),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => idx.clone().prop_map(OpI::Find),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives one scenario against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `set` returns the previous value exactly when the model had one.
// - `get`/`get_or`/`contains_key`/`find` agree with the model.
// - `delete` succeeds iff the key is live, and leaves a key that no longer resolves.
// - Absent keys always report `KeyNotFound`, however many tombstones exist.
// - `iter` yields each live entry exactly once.
// - Handles stay valid until delete/resize/clear and never resolve afterwards.
// - `len`/`is_empty` parity with the model after each op.
fn run_state_machine<S>(
    mut sut: ProbeMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Set(i, v) => {
                let k = key_from(pool, i);
                let epoch = sut.stats().epoch;
                let prev = sut.set(k.clone(), v).expect("set below load threshold");
                prop_assert_eq!(prev, model.insert(k.clone(), v));
                if sut.stats().epoch != epoch {
                    stale.extend(live.drain().map(|(_, h)| h));
                }
                let h = sut.find(&k).expect("just set");
                if let Some(old) = live.insert(k, h) {
                    prop_assert_eq!(old, h, "update must keep the handle");
                }
            }
            OpI::Delete(i) => {
                let k = key_from(pool, i);
                let res = sut.delete(&k);
                if model.remove(&k).is_some() {
                    prop_assert_eq!(res, Ok(()));
                    stale.push(live.remove(&k).expect("tracked live handle"));
                } else {
                    prop_assert_eq!(res, Err(Error::KeyNotFound));
                }
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                match model.get(&k) {
                    Some(v) => prop_assert_eq!(sut.get(&k), Ok(v)),
                    None => prop_assert_eq!(sut.get(&k), Err(Error::KeyNotFound)),
                }
            }
            OpI::GetOr(i) => {
                let k = key_from(pool, i);
                let fallback = i32::MIN;
                let expected = model.get(&k).copied().unwrap_or(fallback);
                prop_assert_eq!(*sut.get_or(&k, &fallback), expected);
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(&k));
                    prop_assert_eq!(h.value(&sut), model.get(&k));
                    prop_assert_eq!(h.key(&sut), Some(&k));
                }
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = h.value_mut(&mut sut).expect("live handle should resolve");
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
                for (k, v) in &sut {
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity().is_power_of_two() && sut.capacity() >= 8);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(ProbeMap::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, with every key on one
// probe chain, so tombstone skipping and reuse are exercised on every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ProbeMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Property: without deletions there are no tombstones, so both insert
// policies pick the same slots and produce identical logs.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_policies_agree_without_deletes(
        writes in proptest::collection::vec(("[a-z]{1,3}", any::<i32>()), 1..120)
    ) {
        let mut scan: ProbeMap<String, i32> = ProbeMap::new();
        let mut first = ProbeMap::with_config(
            MapConfig::new().with_insert_policy(InsertPolicy::FirstDecisionSlot),
        );
        let mut model: HashMap<String, i32> = HashMap::new();
        for (k, v) in writes {
            prop_assert_eq!(scan.set(k.clone(), v), first.set(k.clone(), v));
            model.insert(k, v);
        }
        prop_assert_eq!(scan.len(), model.len());
        prop_assert_eq!(first.len(), model.len());
        prop_assert_eq!(scan.capacity(), first.capacity());
        let a: Vec<_> = scan.items().collect();
        let b: Vec<_> = first.items().collect();
        prop_assert_eq!(a, b);
        for (k, v) in &model {
            prop_assert_eq!(first.get(k.as_str()), Ok(v));
        }
        prop_assert_eq!(first.get("not-a-key"), Err(Error::KeyNotFound));
    }
}
