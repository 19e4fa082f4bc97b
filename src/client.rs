//! Remote API client
//!
//! One method per remote capability. Every call follows the same template:
//! compose an envelope (auth header + named operation), send it through the
//! injected transport, check the authentication header of the response and
//! extract the typed result.

use std::time::Duration;

use tracing::debug;
use zeroize::Zeroizing;

use crate::codec::Value;
use crate::constants::FAULT_ZONE_NOT_FOUND;
use crate::envelope::{Composer, ResponseParser};
use crate::error::{Error, FaultOrigin};
use crate::record::{Record, Zone};
use crate::transport::{HttpTransport, Transport};

//==============================================================================
// Client
//==============================================================================

pub struct ApiClient {
    api: String,
    username: String,
    password: Zeroizing<String>,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    /// Creates a client with an injected transport (tests use a scripted
    /// one).
    pub fn new(api: &str, username: &str, password: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            api: api.to_string(),
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            transport,
        }
    }

    /// Creates a client backed by the HTTPS transport.
    pub fn connect(
        api: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let transport = HttpTransport::new(api, timeout)?;
        Ok(Self::new(api, username, password, Box::new(transport)))
    }

    fn prepare(&self) -> Composer {
        let mut command = Composer::new(&self.api);
        command.add_auth(&self.username, &self.password);
        command
    }

    /// Sends a composed command and returns the named body result.
    ///
    /// Outside the success status range the body is treated as a fault
    /// document, never decoded as a value. A successful response must carry
    /// `authenticateResponse == true` in its header.
    async fn execute(&self, command: Composer, result_name: &str) -> Result<Value, Error> {
        let payload = command.serialize()?;
        let (status, body) = self.transport.send(&payload).await?;

        if !(200..300).contains(&status) {
            debug!("HTTP error {} ({} byte body)", status, body.len());
            return match ResponseParser::parse(&self.api, &body) {
                Err(err @ Error::Fault { .. }) => Err(err),
                _ => Err(Error::Fault {
                    origin: FaultOrigin::Server,
                    message: format!("HTTP error {status} while executing command"),
                }),
            };
        }

        let response = ResponseParser::parse(&self.api, &body)?;
        match response.header_result("authenticateResponse") {
            Ok(Value::Bool(true)) => {}
            _ => return Err(Error::Auth),
        }
        response.body_result(result_name).cloned()
    }

    //--------------------------------------------------------------------------
    // Operations
    //--------------------------------------------------------------------------

    /// Number of zones of the authenticated user.
    pub async fn count_zones(&self) -> Result<i64, Error> {
        debug!("get number of zones");
        let mut command = self.prepare();
        command.add_operation("getNumberOfZones", Vec::new());
        expect_int(self.execute(command, "getNumberOfZonesResponse").await?)
    }

    /// Searches a zone by name or id. An absent zone is `Ok(None)`, not an
    /// error; the service reports it as a fault with a well-known message.
    pub async fn get_zone(&self, search: &str) -> Result<Option<Zone>, Error> {
        debug!("get zone {:?}", search);
        let mut command = self.prepare();
        command.add_operation("getZone", vec![("search", Value::from(search))]);
        match self.execute(command, "getZoneResponse").await {
            Ok(result) => Ok(Some(Zone::from_wire(&expect_map(result)?)?)),
            Err(err) if err.is_server_fault(FAULT_ZONE_NOT_FOUND) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Fetches one record by id.
    pub async fn get_record(&self, record_id: Option<i64>) -> Result<Record, Error> {
        let record_id = record_id
            .ok_or_else(|| Error::Precondition("need record id to get record".to_string()))?;
        debug!("get record {}", record_id);
        let mut command = self.prepare();
        command.add_operation("getRecord", vec![("recordId", Value::Int(record_id))]);
        let result = self.execute(command, "getRecordResponse").await?;
        Record::from_wire(&expect_map(result)?)
    }

    /// Adds a record to an existing zone (searched by name or id). Returns
    /// the created record with its server-assigned id.
    pub async fn add_record(&self, search: &str, record: &Record) -> Result<Record, Error> {
        debug!("add record {}", record);
        let mut command = self.prepare();
        command.add_operation(
            "addRecord",
            vec![
                ("search", Value::from(search)),
                ("recorddata", record.to_wire(false)),
            ],
        );
        let result = self.execute(command, "addRecordResponse").await?;
        Record::from_wire(&expect_map(result)?)
    }

    /// Rewrites an existing record in place.
    pub async fn update_record(&self, record: &Record) -> Result<Record, Error> {
        let record_id = record
            .id
            .ok_or_else(|| Error::Precondition("need record id to update record".to_string()))?;
        debug!("update record {}", record);
        let mut command = self.prepare();
        command.add_operation(
            "updateRecord",
            vec![
                ("recordId", Value::Int(record_id)),
                ("recorddata", record.to_wire(false)),
            ],
        );
        let result = self.execute(command, "updateRecordResponse").await?;
        Record::from_wire(&expect_map(result)?)
    }

    /// Deletes a record by id. True on success.
    pub async fn delete_record(&self, record_id: Option<i64>) -> Result<bool, Error> {
        let record_id = record_id
            .ok_or_else(|| Error::Precondition("need record id to delete record".to_string()))?;
        debug!("delete record {}", record_id);
        let mut command = self.prepare();
        command.add_operation("deleteRecord", vec![("recordId", Value::Int(record_id))]);
        expect_bool(self.execute(command, "deleteRecordResponse").await?)
    }

    /// Replaces an IP in all records of the user. Returns the number of
    /// changed records.
    pub async fn change_ip(&self, from_ip: &str, to_ip: &str) -> Result<i64, Error> {
        debug!("change IP {} -> {}", from_ip, to_ip);
        let mut command = self.prepare();
        command.add_operation(
            "changeIp",
            vec![
                ("currentIp", Value::from(from_ip)),
                ("newIp", Value::from(to_ip)),
            ],
        );
        expect_int(self.execute(command, "changeIpResponse").await?)
    }

    /// Replaces the TTL in all records of the user pointing at an IP.
    /// Returns the number of changed records.
    pub async fn change_ttl(&self, ip: &str, ttl: u32) -> Result<i64, Error> {
        debug!("change TTL for {} to {}", ip, ttl);
        let mut command = self.prepare();
        command.add_operation(
            "changeTTL",
            vec![("ip", Value::from(ip)), ("ttl", Value::Int(i64::from(ttl)))],
        );
        expect_int(self.execute(command, "changeTTLResponse").await?)
    }
}

//==============================================================================
// Result kind checks
//==============================================================================

fn expect_int(value: Value) -> Result<i64, Error> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(Error::TypeMismatch {
            expected: "int",
            found: other.kind(),
        }),
    }
}

fn expect_bool(value: Value) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Error::TypeMismatch {
            expected: "boolean",
            found: other.kind(),
        }),
    }
}

fn expect_map(value: Value) -> Result<Value, Error> {
    match value {
        Value::Map(_) => Ok(value),
        other => Err(Error::TypeMismatch {
            expected: "map",
            found: other.kind(),
        }),
    }
}

//==============================================================================
// Tests
//==============================================================================
