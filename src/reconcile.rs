//! Reconciliation engine
//!
//! Pure planning: given the records currently in a `(prefix, type)` group
//! and the desired state of that group, compute the minimal operation list
//! that converges the group. No I/O happens here; the only failure is the
//! overwrite-policy conflict.
//!
//! The caller applies the returned operations in list order — all deletes,
//! then all updates, then all creates — so the service never sees transient
//! duplicates. Applying the plan and reconciling again yields an empty
//! plan.

use std::fmt;

use crate::error::Error;
use crate::record::{Record, RecordType};

//==============================================================================
// Types
//==============================================================================

/// Desired state of one record group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Subdomain label relative to the zone; `None` is the apex
    pub prefix: Option<String>,
    pub rtype: RecordType,
    pub ttl: u32,
    /// Desired `(priority, target)` pairs. Set semantics: order is
    /// irrelevant and duplicates collapse (see `validation::parse_values`).
    pub values: Vec<(Option<i32>, String)>,
    /// Permit replacing existing records that do not match
    pub overwrite: bool,
}

/// Whether the group should exist or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Present,
    Absent,
}

/// One remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a new record (no id yet)
    Create(Record),
    /// Rewrite an existing record in place (id set)
    Update(Record),
    /// Delete a record by id
    Delete(i64),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create(record) => write!(f, "create {record}"),
            Operation::Update(record) => write!(f, "update {record}"),
            Operation::Delete(id) => write!(f, "delete record {id}"),
        }
    }
}

//==============================================================================
// Engine
//==============================================================================

/// Computes the operations that converge `candidates` toward `spec`.
///
/// `candidates` must already be restricted to the `(prefix, type)` group;
/// the engine does not re-filter. Candidates are walked in input order.
pub fn reconcile(
    candidates: &[Record],
    spec: &RecordSpec,
    state: DesiredState,
) -> Result<Vec<Operation>, Error> {
    // Match candidates against the desired pairs. A candidate matches when
    // its ttl is the desired ttl and its (priority, target) pair is still
    // unclaimed in the pool; every other candidate needs replacing.
    let mut pool: Vec<(Option<i32>, String)> = dedup_values(&spec.values);
    let mut to_replace: Vec<&Record> = Vec::new();

    for candidate in candidates {
        let pair = (candidate.priority, candidate.target.clone());
        let claimed = candidate.ttl == spec.ttl
            && match pool.iter().position(|p| *p == pair) {
                Some(index) => {
                    pool.remove(index);
                    true
                }
                None => false,
            };
        if !claimed {
            to_replace.push(candidate);
        }
    }

    let mismatch = !to_replace.is_empty() || !pool.is_empty();

    match state {
        DesiredState::Present => {
            if !mismatch {
                return Ok(Vec::new());
            }
            if !spec.overwrite {
                return Err(Error::Conflict(group_name(spec)));
            }

            // Pair each mismatched record with a leftover desired pair and
            // rewrite it in place; this beats delete+create on operation
            // count. Whatever remains on either side becomes deletes or
            // creates.
            let mut deletes = Vec::new();
            let mut updates = Vec::new();
            let mut creates = Vec::new();
            let mut replace = to_replace.into_iter();
            let mut leftovers = pool.into_iter();
            loop {
                match (replace.next(), leftovers.next()) {
                    (Some(candidate), Some((priority, target))) => {
                        let id = require_id(candidate)?;
                        let mut desired = desired_record(spec, priority, &target);
                        desired.id = Some(id);
                        desired.zone = candidate.zone;
                        updates.push(Operation::Update(desired));
                    }
                    (Some(candidate), None) => {
                        deletes.push(Operation::Delete(require_id(candidate)?));
                    }
                    (None, Some((priority, target))) => {
                        creates.push(Operation::Create(desired_record(spec, priority, &target)));
                    }
                    (None, None) => break,
                }
            }

            // Deletes first, then updates, then creates.
            let mut operations = deletes;
            operations.extend(updates);
            operations.extend(creates);
            Ok(operations)
        }
        DesiredState::Absent => {
            // Only delete a group that matches the request exactly;
            // anything else is left untouched.
            if mismatch {
                return Ok(Vec::new());
            }
            candidates
                .iter()
                .map(|candidate| Ok(Operation::Delete(require_id(candidate)?)))
                .collect()
        }
    }
}

fn dedup_values(values: &[(Option<i32>, String)]) -> Vec<(Option<i32>, String)> {
    let mut out: Vec<(Option<i32>, String)> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

fn desired_record(spec: &RecordSpec, priority: Option<i32>, target: &str) -> Record {
    Record {
        id: None,
        zone: None,
        rtype: spec.rtype,
        prefix: spec.prefix.clone(),
        target: target.to_string(),
        ttl: spec.ttl,
        priority,
    }
}

fn require_id(record: &Record) -> Result<i64, Error> {
    record.id.ok_or_else(|| {
        Error::Precondition(format!("existing record \"{}\" has no id", record.target))
    })
}

fn group_name(spec: &RecordSpec) -> String {
    match &spec.prefix {
        Some(prefix) => format!("{prefix} {}", spec.rtype),
        None => format!("(apex) {}", spec.rtype),
    }
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, ttl: u32, target: &str, priority: Option<i32>) -> Record {
        Record {
            id: Some(id),
            zone: Some(7),
            rtype: RecordType::A,
            prefix: Some("www".to_string()),
            target: target.to_string(),
            ttl,
            priority,
        }
    }

    fn spec(ttl: u32, values: &[(Option<i32>, &str)], overwrite: bool) -> RecordSpec {
        RecordSpec {
            prefix: Some("www".to_string()),
            rtype: RecordType::A,
            ttl,
            values: values
                .iter()
                .map(|(p, t)| (*p, t.to_string()))
                .collect(),
            overwrite,
        }
    }

    /// Simulates applying a plan to a record set, handing out fresh ids for
    /// creates the way the service would.
    fn apply(candidates: &[Record], operations: &[Operation]) -> Vec<Record> {
        let mut next_id = 1000;
        let mut result: Vec<Record> = candidates.to_vec();
        for op in operations {
            match op {
                Operation::Delete(id) => result.retain(|r| r.id != Some(*id)),
                Operation::Update(rec) => {
                    let slot = result
                        .iter_mut()
                        .find(|r| r.id == rec.id)
                        .expect("update target exists");
                    *slot = rec.clone();
                }
                Operation::Create(rec) => {
                    let mut created = rec.clone();
                    created.id = Some(next_id);
                    next_id += 1;
                    result.push(created);
                }
            }
        }
        result
    }

    #[test]
    fn present_converged_is_noop() {
        let candidates = [
            candidate(1, 3600, "1.1.1.1", None),
            candidate(2, 3600, "2.2.2.2", None),
        ];
        // Desired order differs; values are a set.
        let spec = spec(3600, &[(None, "2.2.2.2"), (None, "1.1.1.1")], false);
        let ops = reconcile(&candidates, &spec, DesiredState::Present).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn present_mismatch_without_overwrite_conflicts() {
        let candidates = [candidate(1, 3600, "1.1.1.1", None)];
        let spec = spec(7200, &[(None, "1.1.1.1")], false);
        let err = reconcile(&candidates, &spec, DesiredState::Present).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(format!("{err}").contains("www"));
    }

    #[test]
    fn present_ttl_change_reuses_slot_as_single_update() {
        let candidates = [candidate(1, 3600, "1.1.1.1", None)];
        let spec = spec(7200, &[(None, "2.2.2.2")], true);
        let ops = reconcile(&candidates, &spec, DesiredState::Present).unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Operation::Update(rec) => {
                assert_eq!(rec.id, Some(1));
                assert_eq!(rec.target, "2.2.2.2");
                assert_eq!(rec.ttl, 7200);
                assert_eq!(rec.prefix.as_deref(), Some("www"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn present_excess_candidates_become_deletes() {
        let candidates = [
            candidate(1, 3600, "1.1.1.1", None),
            candidate(2, 3600, "2.2.2.2", None),
            candidate(3, 3600, "3.3.3.3", None),
        ];
        let spec = spec(7200, &[(None, "9.9.9.9")], true);
        let ops = reconcile(&candidates, &spec, DesiredState::Present).unwrap();
        assert_eq!(ops.len(), 3);
        // Deletes come before the update.
        assert!(matches!(ops[0], Operation::Delete(_)));
        assert!(matches!(ops[1], Operation::Delete(_)));
        assert!(matches!(ops[2], Operation::Update(_)));
    }

    #[test]
    fn present_excess_values_become_creates() {
        let candidates = [candidate(1, 3600, "1.1.1.1", None)];
        let spec = spec(
            3600,
            &[(None, "1.1.1.1"), (None, "2.2.2.2"), (None, "3.3.3.3")],
            true,
        );
        let ops = reconcile(&candidates, &spec, DesiredState::Present).unwrap();
        // 1.1.1.1 is already right; the two new values are pure creates.
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, Operation::Create(_))));
    }

    #[test]
    fn present_on_empty_group_creates_everything() {
        let spec = spec(
            300,
            &[(None, "1.1.1.1"), (None, "2.2.2.2"), (None, "3.3.3.3")],
            false,
        );
        let ops = reconcile(&[], &spec, DesiredState::Present).unwrap();
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| matches!(op, Operation::Create(_))));
    }

    #[test]
    fn present_duplicate_desired_values_collapse() {
        let spec = spec(300, &[(None, "1.1.1.1"), (None, "1.1.1.1")], false);
        let ops = reconcile(&[], &spec, DesiredState::Present).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn present_respects_priority_in_matching() {
        let candidates = [candidate(1, 3600, "mail.example.com", Some(10))];
        let mut matching = spec(3600, &[], true);
        matching.rtype = RecordType::Mx;
        matching.values = vec![(Some(10), "mail.example.com".to_string())];
        let ops = reconcile(&candidates, &matching, DesiredState::Present).unwrap();
        assert!(ops.is_empty());

        // Same target, different priority: not a match.
        let mut different = matching.clone();
        different.values = vec![(Some(20), "mail.example.com".to_string())];
        let ops = reconcile(&candidates, &different, DesiredState::Present).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], Operation::Update(_)));
    }

    #[test]
    fn absent_exact_match_deletes_all() {
        let candidates = [
            candidate(1, 3600, "1.1.1.1", None),
            candidate(2, 3600, "2.2.2.2", None),
        ];
        let spec = spec(3600, &[(None, "1.1.1.1"), (None, "2.2.2.2")], false);
        let ops = reconcile(&candidates, &spec, DesiredState::Absent).unwrap();
        assert_eq!(
            ops,
            vec![Operation::Delete(1), Operation::Delete(2)]
        );
    }

    #[test]
    fn absent_partial_match_is_noop() {
        let candidates = [
            candidate(1, 3600, "1.1.1.1", None),
            candidate(2, 3600, "2.2.2.2", None),
        ];
        // One desired value missing: refuse to delete anything.
        let spec = spec(3600, &[(None, "1.1.1.1")], false);
        let ops = reconcile(&candidates, &spec, DesiredState::Absent).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn absent_ttl_mismatch_is_noop() {
        let candidates = [candidate(1, 3600, "1.1.1.1", None)];
        let spec = spec(300, &[(None, "1.1.1.1")], false);
        let ops = reconcile(&candidates, &spec, DesiredState::Absent).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn absent_empty_group_is_noop() {
        let spec = spec(3600, &[(None, "1.1.1.1")], false);
        let ops = reconcile(&[], &spec, DesiredState::Absent).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn candidate_without_id_is_a_precondition_failure() {
        let mut anonymous = candidate(0, 3600, "1.1.1.1", None);
        anonymous.id = None;
        let spec = spec(7200, &[(None, "2.2.2.2")], true);
        let err = reconcile(
            &[anonymous.clone()],
            &spec,
            DesiredState::Present,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));

        let absent_spec = self::spec(3600, &[(None, "1.1.1.1")], false);
        let err = reconcile(&[anonymous], &absent_spec, DesiredState::Absent).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn plan_order_is_delete_update_create() {
        let candidates = [
            candidate(1, 300, "old-a", None),
            candidate(2, 300, "old-b", None),
            candidate(3, 300, "old-c", None),
        ];
        let spec = spec(600, &[(None, "new-a")], true);
        let ops = reconcile(&candidates, &spec, DesiredState::Present).unwrap();
        let kinds: Vec<u8> = ops
            .iter()
            .map(|op| match op {
                Operation::Delete(_) => 0,
                Operation::Update(_) => 1,
                Operation::Create(_) => 2,
            })
            .collect();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let cases: Vec<(Vec<Record>, RecordSpec, DesiredState)> = vec![
            (
                vec![candidate(1, 3600, "1.1.1.1", None)],
                spec(7200, &[(None, "2.2.2.2"), (None, "3.3.3.3")], true),
                DesiredState::Present,
            ),
            (
                vec![
                    candidate(1, 3600, "1.1.1.1", None),
                    candidate(2, 600, "2.2.2.2", None),
                    candidate(3, 3600, "3.3.3.3", None),
                ],
                spec(3600, &[(None, "3.3.3.3")], true),
                DesiredState::Present,
            ),
            (
                vec![],
                spec(300, &[(None, "1.1.1.1")], false),
                DesiredState::Present,
            ),
            (
                vec![
                    candidate(1, 3600, "1.1.1.1", None),
                    candidate(2, 3600, "2.2.2.2", None),
                ],
                spec(3600, &[(None, "1.1.1.1"), (None, "2.2.2.2")], false),
                DesiredState::Absent,
            ),
        ];

        for (candidates, spec, state) in cases {
            let ops = reconcile(&candidates, &spec, state).unwrap();
            let converged = apply(&candidates, &ops);
            let again = reconcile(&converged, &spec, state).unwrap();
            assert!(
                again.is_empty(),
                "second reconcile not empty: {again:?} (state {state:?})"
            );
        }
    }
}
