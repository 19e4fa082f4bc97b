//! Action orchestration
//!
//! Wires validation, the remote client and the reconciliation engine into
//! the three user-facing actions: read a record group, converge it to a
//! desired state, and remove it. The plan is computed first (pure, no
//! I/O), then applied operation by operation: deletes, updates, creates.
//!
//! Application is not atomic. A failure partway through leaves the
//! remaining operations unapplied; re-running the same action reconciles
//! from the new snapshot and converges, so the sequence is restartable.

use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Error;
use crate::reconcile::{reconcile, DesiredState, Operation, RecordSpec};
use crate::record::{Record, RecordSet, RecordType, Zone};
use crate::validation::{normalize_name, parse_values, prefix_for, validate_record_name};

//==============================================================================
// Types
//==============================================================================

/// What a converge run did (or, under `dry_run`, would have done).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergeOutcome {
    pub changed: bool,
    pub deleted: usize,
    pub updated: usize,
    pub created: usize,
}

impl ConvergeOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            deleted: 0,
            updated: 0,
            created: 0,
        }
    }
}

//==============================================================================
// Actions
//==============================================================================

/// Fetches the record group and reports it. `None` when the group is
/// empty. Never mutates anything.
pub async fn run_get(
    client: &ApiClient,
    zone: &str,
    record: &str,
    rtype: RecordType,
) -> Result<Option<RecordSet>, Error> {
    let (zone_name, record_name, prefix) = resolve_names(zone, record)?;
    let zone = fetch_zone(client, &zone_name).await?;
    let group = zone.group(prefix.as_deref(), rtype);
    debug!("{} matching record(s) in group", group.len());
    Ok(RecordSet::from_records(&record_name, rtype, &group))
}

/// Converges one record group toward the desired state.
///
/// With `dry_run` the plan is logged and nothing is applied.
#[allow(clippy::too_many_arguments)]
pub async fn run_converge(
    client: &ApiClient,
    zone: &str,
    record: &str,
    rtype: RecordType,
    ttl: u32,
    values: &[String],
    overwrite: bool,
    state: DesiredState,
    dry_run: bool,
) -> Result<ConvergeOutcome, Error> {
    if ttl == 0 {
        return Err(Error::Precondition("ttl must be positive".to_string()));
    }
    let (zone_name, _record_name, prefix) = resolve_names(zone, record)?;
    let values = parse_values(rtype, values)?;

    let zone = fetch_zone(client, &zone_name).await?;
    let candidates: Vec<Record> = zone
        .group(prefix.as_deref(), rtype)
        .into_iter()
        .cloned()
        .collect();

    let spec = RecordSpec {
        prefix,
        rtype,
        ttl,
        values,
        overwrite,
    };
    let plan = reconcile(&candidates, &spec, state)?;
    if plan.is_empty() {
        info!("nothing to change");
        return Ok(ConvergeOutcome::unchanged());
    }

    let outcome = ConvergeOutcome {
        changed: !dry_run,
        deleted: plan
            .iter()
            .filter(|op| matches!(op, Operation::Delete(_)))
            .count(),
        updated: plan
            .iter()
            .filter(|op| matches!(op, Operation::Update(_)))
            .count(),
        created: plan
            .iter()
            .filter(|op| matches!(op, Operation::Create(_)))
            .count(),
    };

    if dry_run {
        for op in &plan {
            info!("would {}", op);
        }
        return Ok(outcome);
    }

    // Deletes first, then updates, then creates; the plan is already in
    // that order.
    for op in plan {
        info!("{}", op);
        match op {
            Operation::Delete(id) => {
                client.delete_record(Some(id)).await?;
            }
            Operation::Update(record) => {
                client.update_record(&record).await?;
            }
            Operation::Create(record) => {
                client.add_record(&zone_name, &record).await?;
            }
        }
    }
    Ok(outcome)
}

//==============================================================================
// Helpers
//==============================================================================

fn resolve_names(zone: &str, record: &str) -> Result<(String, String, Option<String>), Error> {
    let zone_name = normalize_name(zone);
    let record_name = normalize_name(record);
    validate_record_name(&record_name)?;
    let prefix = prefix_for(&zone_name, &record_name)?;
    Ok((zone_name, record_name, prefix))
}

async fn fetch_zone(client: &ApiClient, zone_name: &str) -> Result<Zone, Error> {
    client
        .get_zone(zone_name)
        .await?
        .ok_or_else(|| Error::Precondition(format!("zone \"{zone_name}\" not found")))
}

//==============================================================================
// Tests
//==============================================================================
