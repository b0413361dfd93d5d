mod common;

use common::service;
use sandboxflow_cloud::compute::{AccessConfig, Instance, NetworkInterface};
use sandboxflow_cloud::testing::{FakeCompute, PlatformUpdate, RecordingSession};
use sandboxflow_cloud::{CloudError, RecordedAddresses, RefreshOutcome};
use std::sync::Arc;

const ZONE: &str = "us-west1-b";

fn seed(fake: &FakeCompute, private_ip: &str, public_ip: Option<&str>) {
    fake.set_instance(
        ZONE,
        Instance {
            id: "42".to_string(),
            name: "web--abcdef".to_string(),
            network_interfaces: vec![NetworkInterface {
                name: "nic0".to_string(),
                subnetwork: "projects/proj1/regions/us-west1/subnetworks/web-aaaaaa".to_string(),
                network_ip: private_ip.to_string(),
                access_configs: public_ip
                    .map(|ip| {
                        vec![AccessConfig {
                            nat_ip: Some(ip.to_string()),
                            ..AccessConfig::external_nat()
                        }]
                    })
                    .unwrap_or_default(),
                ..Default::default()
            }],
        },
    );
}

fn recorded(private_ip: &str, public_ip: &str) -> RecordedAddresses {
    RecordedAddresses {
        private_ip: private_ip.to_string(),
        public_ip: public_ip.to_string(),
    }
}

#[tokio::test]
async fn test_changed_private_ip_updates_once() {
    let fake = Arc::new(FakeCompute::new("proj1"));
    seed(&fake, "10.0.0.6", None);
    let session = RecordingSession::new();

    let outcome = service(&fake)
        .refresh_ip(&session, "web--abcdef", &recorded("10.0.0.5", ""), Some(r"10\.0\."))
        .await
        .unwrap();

    assert!(outcome.private_updated);
    assert!(!outcome.public_updated);
    assert_eq!(
        session.updates(),
        vec![PlatformUpdate::ResourceAddress {
            resource: "web--abcdef".to_string(),
            address: "10.0.0.6".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_regex_mismatch_skips_update() {
    let fake = Arc::new(FakeCompute::new("proj1"));
    seed(&fake, "10.0.0.6", None);
    let session = RecordingSession::new();

    service(&fake)
        .refresh_ip(&session, "web--abcdef", &recorded("10.0.0.5", ""), Some(r"192\.168\."))
        .await
        .unwrap();

    assert!(session.updates().is_empty());
}

#[tokio::test]
async fn test_unchanged_addresses_skip_update() {
    let fake = Arc::new(FakeCompute::new("proj1"));
    seed(&fake, "10.0.0.5", Some("34.1.1.1"));
    let session = RecordingSession::new();

    let outcome = service(&fake)
        .refresh_ip(&session, "web--abcdef", &recorded("10.0.0.5", "34.1.1.1"), None)
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::default());
    assert!(session.updates().is_empty());
}

#[tokio::test]
async fn test_public_ip_uses_attribute_update() {
    let fake = Arc::new(FakeCompute::new("proj1"));
    seed(&fake, "10.0.0.5", Some("34.9.9.9"));
    let session = RecordingSession::new();

    service(&fake)
        .refresh_ip(&session, "web--abcdef", &recorded("10.0.0.5", "34.1.1.1"), None)
        .await
        .unwrap();

    assert_eq!(
        session.updates(),
        vec![PlatformUpdate::Attribute {
            resource: "web--abcdef".to_string(),
            attribute: "Public IP".to_string(),
            value: "34.9.9.9".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_invalid_regex_is_error() {
    let fake = Arc::new(FakeCompute::new("proj1"));
    seed(&fake, "10.0.0.6", None);

    let err = service(&fake)
        .refresh_ip(&RecordingSession::new(), "web--abcdef", &recorded("", ""), Some("[0-9"))
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::InvalidRegex(_)));
    assert!(fake.calls().is_empty());
}
