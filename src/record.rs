//! DNS record and zone data model
//!
//! Records are read fresh from the remote service for every run and
//! discarded afterwards; there is no local cache. The zone owns its
//! records, a record's `zone` field is only a weak back-reference.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::codec::Value;
use crate::error::Error;

//==============================================================================
// Record types
//==============================================================================

/// Supported DNS record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ptr,
    Srv,
    Spf,
    Ns,
    Caa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Spf => "SPF",
            RecordType::Ns => "NS",
            RecordType::Caa => "CAA",
        }
    }

    /// Whether values of this type carry a leading integer priority
    /// (`"10 mail.example.com"`).
    pub fn has_priority(&self) -> bool {
        matches!(self, RecordType::Mx | RecordType::Ptr)
    }

    fn parse(s: &str) -> Option<RecordType> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            "CNAME" => Some(RecordType::Cname),
            "MX" => Some(RecordType::Mx),
            "TXT" => Some(RecordType::Txt),
            "PTR" => Some(RecordType::Ptr),
            "SRV" => Some(RecordType::Srv),
            "SPF" => Some(RecordType::Spf),
            "NS" => Some(RecordType::Ns),
            "CAA" => Some(RecordType::Caa),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::parse(s)
            .ok_or_else(|| Error::Precondition(format!("unknown record type \"{s}\"")))
    }
}

//==============================================================================
// Records
//==============================================================================

/// A single DNS record as the remote service sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Server-assigned identity; absent until the record is created
    pub id: Option<i64>,
    /// Weak back-reference to the owning zone
    pub zone: Option<i64>,
    pub rtype: RecordType,
    /// Subdomain label relative to the zone; `None` is the zone apex
    pub prefix: Option<String>,
    pub target: String,
    /// Seconds, positive
    pub ttl: u32,
    /// Only meaningful for priority-bearing types
    pub priority: Option<i32>,
}

impl Record {
    /// Encodes the record the way the service expects (`recorddata`
    /// argument). Identity fields are only included on request.
    pub fn to_wire(&self, include_ids: bool) -> Value {
        let mut entries = vec![
            (Value::from("type"), Value::from(self.rtype.as_str())),
            (
                Value::from("prefix"),
                match &self.prefix {
                    Some(p) => Value::from(p.as_str()),
                    None => Value::Null,
                },
            ),
            (Value::from("target"), Value::from(self.target.as_str())),
            (Value::from("ttl"), Value::Int(i64::from(self.ttl))),
            (
                Value::from("priority"),
                match self.priority {
                    Some(p) => Value::Int(i64::from(p)),
                    None => Value::Null,
                },
            ),
        ];
        if include_ids {
            entries.push((
                Value::from("id"),
                self.id.map(Value::Int).unwrap_or(Value::Null),
            ));
            entries.push((
                Value::from("zone"),
                self.zone.map(Value::Int).unwrap_or(Value::Null),
            ));
        }
        Value::Map(entries)
    }

    /// Decodes a record from a response map.
    pub fn from_wire(value: &Value) -> Result<Record, Error> {
        let rtype_str = value
            .map_get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Coding("record has no type field".to_string()))?;
        let rtype = RecordType::parse(rtype_str)
            .ok_or_else(|| Error::Coding(format!("unknown record type \"{rtype_str}\"")))?;
        let target = value
            .map_get("target")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Coding("record has no target field".to_string()))?
            .to_string();
        let ttl = value
            .map_get("ttl")
            .and_then(Value::as_i64)
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| Error::Coding("record has no valid ttl field".to_string()))?;
        let prefix = match value.map_get("prefix") {
            None | Some(Value::Null) => None,
            Some(v) => v.as_str().map(str::to_string),
        };
        let priority = match value.map_get("priority") {
            None | Some(Value::Null) => None,
            Some(v) => v
                .as_i64()
                .and_then(|p| i32::try_from(p).ok())
                .map(Some)
                .ok_or_else(|| Error::Coding("record has invalid priority field".to_string()))?,
        };
        Ok(Record {
            id: value.map_get("id").and_then(Value::as_i64),
            zone: value.map_get("zone").and_then(Value::as_i64),
            rtype,
            prefix,
            target,
            ttl,
            priority,
        })
    }

    /// The value string as users write it: `"priority target"` for
    /// priority-bearing types, the bare target otherwise.
    pub fn value_string(&self) -> String {
        match self.priority {
            Some(priority) => format!("{priority} {}", self.target),
            None => self.target.clone(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix.as_deref().unwrap_or("(apex)");
        write!(
            f,
            "{} {} -> \"{}\" (ttl {})",
            self.rtype,
            prefix,
            self.target,
            format_ttl(self.ttl)
        )?;
        if let Some(priority) = self.priority {
            write!(f, " priority {priority}")?;
        }
        if let Some(id) = self.id {
            write!(f, " [id {id}]")?;
        }
        Ok(())
    }
}

/// Formats a TTL as hours/minutes/seconds, e.g. `2h 30m` or `45s`.
pub fn format_ttl(ttl: u32) -> String {
    let seconds = ttl % 60;
    let minutes = (ttl / 60) % 60;
    let hours = ttl / 3600;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 {
        parts.push(format!("{seconds}s"));
    }
    if parts.is_empty() {
        return "0s".to_string();
    }
    parts.join(" ")
}

//==============================================================================
// Zones
//==============================================================================

/// A DNS zone with its records and the metadata the service reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub ttl: u32,
    pub email: Option<String>,
    pub nameserver: Option<String>,
    pub serial: Option<String>,
    pub serial_last_update: Option<String>,
    pub refresh: Option<String>,
    pub retry: Option<String>,
    pub expire: Option<String>,
    pub template: Option<String>,
    pub ns3: Option<String>,
    pub records: Vec<Record>,
}

impl Zone {
    /// Decodes a zone from a response map. Zones are only ever read, never
    /// sent, so there is no inverse.
    pub fn from_wire(value: &Value) -> Result<Zone, Error> {
        let id = value
            .map_get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Coding("zone has no id field".to_string()))?;
        let name = value
            .map_get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Coding("zone has no name field".to_string()))?
            .to_string();
        let ttl = value
            .map_get("ttl")
            .and_then(Value::as_i64)
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| Error::Coding("zone has no valid ttl field".to_string()))?;
        let records = value
            .map_get("records")
            .and_then(Value::as_list)
            .ok_or_else(|| Error::Coding("zone has no records field".to_string()))?
            .iter()
            .map(Record::from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Zone {
            id,
            name,
            ttl,
            email: opt_string(value.map_get("email")),
            nameserver: opt_string(value.map_get("nameserver")),
            serial: opt_string(value.map_get("serial")),
            serial_last_update: opt_string(value.map_get("serialLastUpdate")),
            refresh: opt_string(value.map_get("refresh")),
            retry: opt_string(value.map_get("retry")),
            expire: opt_string(value.map_get("expire")),
            template: opt_string(value.map_get("template")),
            ns3: opt_string(value.map_get("ns3")),
            records,
        })
    }

    /// Records in the `(prefix, type)` group, in zone order.
    pub fn group(&self, prefix: Option<&str>, rtype: RecordType) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.prefix.as_deref() == prefix && r.rtype == rtype)
            .collect()
    }
}

/// Optional stringly zone metadata; the service sends ints and strings
/// interchangeably here.
fn opt_string(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Int(i)) => Some(i.to_string()),
        Some(_) => None,
    }
}

//==============================================================================
// Record set reports
//==============================================================================

/// Aggregated view of one record group, as reported by the `get` action.
///
/// When the group's records disagree on TTL the report carries the minimum
/// plus the full set of observed TTLs, so differing TTLs are never silently
/// collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Fully-qualified record name
    pub name: String,
    pub rtype: RecordType,
    /// Minimum TTL across the group
    pub ttl: u32,
    /// All observed TTLs; only populated when they differ
    pub ttls: Option<BTreeSet<u32>>,
    /// Value strings in zone order
    pub values: Vec<String>,
}

impl RecordSet {
    /// Builds the report from a non-empty record group. Returns `None` for
    /// an empty group.
    pub fn from_records(name: &str, rtype: RecordType, records: &[&Record]) -> Option<RecordSet> {
        let ttl = records.iter().map(|r| r.ttl).min()?;
        let ttls: BTreeSet<u32> = records.iter().map(|r| r.ttl).collect();
        Some(RecordSet {
            name: name.to_string(),
            rtype,
            ttl,
            ttls: (ttls.len() > 1).then_some(ttls),
            values: records.iter().map(|r| r.value_string()).collect(),
        })
    }
}

//==============================================================================
// Tests
//==============================================================================
