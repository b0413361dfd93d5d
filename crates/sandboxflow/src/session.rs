//! Platform updates written to stdout as JSON lines

use async_trait::async_trait;
use sandboxflow_cloud::PlatformSession;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum PlatformUpdate<'a> {
    UpdateResourceAddress {
        resource: &'a str,
        address: &'a str,
    },
    SetAttributeValue {
        resource: &'a str,
        attribute: &'a str,
        value: &'a str,
    },
}

impl PlatformUpdate<'_> {
    fn emit(&self) -> sandboxflow_cloud::Result<()> {
        println!("{}", serde_json::to_string(self)?);
        Ok(())
    }
}

/// Session that hands updates to whoever invoked the binary
pub struct ConsoleSession;

#[async_trait]
impl PlatformSession for ConsoleSession {
    async fn update_resource_address(
        &self,
        resource: &str,
        address: &str,
    ) -> sandboxflow_cloud::Result<()> {
        PlatformUpdate::UpdateResourceAddress { resource, address }.emit()
    }

    async fn set_attribute_value(
        &self,
        resource: &str,
        attribute: &str,
        value: &str,
    ) -> sandboxflow_cloud::Result<()> {
        PlatformUpdate::SetAttributeValue {
            resource,
            attribute,
            value,
        }
        .emit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_wire_shape() {
        let update = PlatformUpdate::UpdateResourceAddress {
            resource: "web--a1b2c3",
            address: "10.0.0.5",
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({
                "command": "updateResourceAddress",
                "resource": "web--a1b2c3",
                "address": "10.0.0.5"
            })
        );

        let update = PlatformUpdate::SetAttributeValue {
            resource: "web--a1b2c3",
            attribute: "Public IP",
            value: "34.100.0.2",
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["command"], "setAttributeValue");
        assert_eq!(value["attribute"], "Public IP");
    }
}
