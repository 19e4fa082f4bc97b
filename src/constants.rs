//! Common constants used throughout the zonectl application

//==============================================================================
// Wire Format Namespaces
//==============================================================================

/// SOAP 1.1 envelope namespace
pub const NS_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// XML Schema instance namespace (nil/type attributes)
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace (primitive types)
pub const NS_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Apache SOAP map namespace (key/value maps)
pub const NS_APACHE_MAP: &str = "http://xml.apache.org/xml-soap";

/// SOAP encoding namespace (arrays)
pub const NS_SOAP_ENC: &str = "http://schemas.xmlsoap.org/soap/encoding/";

//==============================================================================
// Remote API Constants
//==============================================================================

/// Default API endpoint (the endpoint URL doubles as the operation namespace)
pub const DEFAULT_ENDPOINT: &str = "https://ns1.hosttech.eu/public/api";

/// User agent string for API requests
pub const USER_AGENT: &str = "zonectl/0.3";

/// Server fault message that signals an absent zone rather than an error
pub const FAULT_ZONE_NOT_FOUND: &str = "zone not found";

//==============================================================================
// Timeout Constants
//==============================================================================

/// Default request timeout in seconds (the API is slow but low-traffic)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Minimum request timeout in seconds
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Maximum request timeout in seconds
pub const MAX_TIMEOUT_SECS: u64 = 3600;

//==============================================================================
// Record Constants
//==============================================================================

/// Default TTL for new records in seconds (one hour)
pub const DEFAULT_TTL_SECS: u32 = 3600;

/// Maximum DNS record name length in characters
pub const MAX_RECORD_NAME_LENGTH: usize = 253;

/// Maximum DNS label length in characters
pub const MAX_LABEL_LENGTH: usize = 63;

//==============================================================================
// Environment Variable Names
//==============================================================================

/// Environment variable name for the API user name
pub const ENV_USERNAME: &str = "HOSTTECH_USERNAME";

/// Environment variable name for the API password
pub const ENV_PASSWORD: &str = "HOSTTECH_PASSWORD";

/// Environment variable name for the API endpoint
pub const ENV_ENDPOINT: &str = "HOSTTECH_ENDPOINT";

/// Environment variable name for the request timeout in seconds
pub const ENV_TIMEOUT: &str = "ZONECTL_TIMEOUT";
