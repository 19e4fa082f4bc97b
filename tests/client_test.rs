//! Integration tests for the HTTPS transport and client
//!
//! Drives the real reqwest-backed transport against a local mock server.

use std::time::Duration;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zonectl::client::ApiClient;
use zonectl::constants::{NS_ENVELOPE, NS_XSD, NS_XSI};
use zonectl::error::{Error, FaultOrigin};

const TIMEOUT: Duration = Duration::from_secs(10);

fn envelope(api: &str, body: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='utf-8'?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{NS_ENVELOPE}\" xmlns:ns1=\"{api}\" \
         xmlns:xsi=\"{NS_XSI}\" xmlns:xsd=\"{NS_XSD}\">\
         <SOAP-ENV:Header>\
         <ns1:authenticateResponse><return xsi:type=\"xsd:boolean\">true</return></ns1:authenticateResponse>\
         </SOAP-ENV:Header>\
         <SOAP-ENV:Body>{body}</SOAP-ENV:Body>\
         </SOAP-ENV:Envelope>"
    )
}

#[tokio::test]
async fn count_zones_over_http() {
    let server = MockServer::start().await;
    let api = format!("{}/public/api", server.uri());
    let body = envelope(
        &api,
        "<ns1:getNumberOfZonesResponse><return xsi:type=\"xsd:int\">5</return></ns1:getNumberOfZonesResponse>",
    );

    Mock::given(method("POST"))
        .and(path("/public/api"))
        .and(header("Content-Type", "application/xml"))
        .and(body_string_contains("getNumberOfZones"))
        .and(body_string_contains("<UserName>user</UserName>"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::connect(&api, "user", "secret", TIMEOUT).expect("client");
    assert_eq!(client.count_zones().await.expect("count"), 5);
}

#[tokio::test]
async fn fault_response_over_http() {
    let server = MockServer::start().await;
    let api = format!("{}/public/api", server.uri());
    let body = format!(
        "<?xml version='1.0' encoding='utf-8'?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{NS_ENVELOPE}\">\
         <SOAP-ENV:Body><SOAP-ENV:Fault>\
         <faultcode>SOAP-ENV:Server</faultcode>\
         <faultstring>zone not found</faultstring>\
         </SOAP-ENV:Fault></SOAP-ENV:Body>\
         </SOAP-ENV:Envelope>"
    );

    Mock::given(method("POST"))
        .and(path("/public/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .mount(&server)
        .await;

    let client = ApiClient::connect(&api, "user", "secret", TIMEOUT).expect("client");
    // The recognized fault message maps to an absent zone.
    assert_eq!(client.get_zone("missing.example").await.expect("get"), None);
    // The same fault on any other operation propagates.
    let err = client.count_zones().await.expect_err("fault");
    match err {
        Error::Fault { origin, message } => {
            assert_eq!(origin, FaultOrigin::Server);
            assert_eq!(message, "zone not found");
        }
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_is_not_a_transport_error() {
    let server = MockServer::start().await;
    let api = format!("{}/public/api", server.uri());

    Mock::given(method("POST"))
        .and(path("/public/api"))
        .respond_with(ResponseTemplate::new(500).set_body_raw("oops", "text/plain"))
        .mount(&server)
        .await;

    let client = ApiClient::connect(&api, "user", "secret", TIMEOUT).expect("client");
    let err = client.count_zones().await.expect_err("http error");
    match err {
        Error::Fault { origin, message } => {
            assert_eq!(origin, FaultOrigin::Server);
            assert!(message.contains("500"));
        }
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_failure_is_a_network_error() {
    // Nothing listens here.
    let client =
        ApiClient::connect("http://127.0.0.1:9/public/api", "user", "secret", TIMEOUT)
            .expect("client");
    let err = client.count_zones().await.expect_err("no listener");
    assert!(matches!(err, Error::Network(_)));
}
