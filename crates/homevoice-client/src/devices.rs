//! `/devices*`: simulated device registry and control.

use crate::error::ClientError;
use crate::gateway::Gateway;
use homevoice_types::device::{ControlCommand, Device, DeviceInput, DeviceQuery, DeviceStatistics};
use serde::Serialize;

pub struct DevicesApi<'a> {
    pub(crate) gw: &'a Gateway,
}

#[derive(Serialize)]
struct TargetedCommand<'c> {
    device_id: i64,
    #[serde(flatten)]
    command: &'c ControlCommand,
}

impl DevicesApi<'_> {
    /// Device list. Filtering happens server-side.
    pub fn list(&self, q: &DeviceQuery) -> Result<Vec<Device>, ClientError> {
        let query = [
            (
                "type",
                q.device_type.map(|t| t.tag().to_string()).unwrap_or_default(),
            ),
            ("location", q.location.clone().unwrap_or_default()),
            (
                "status",
                q.status.map(|s| s.tag().to_string()).unwrap_or_default(),
            ),
            ("search", q.search.clone().unwrap_or_default()),
        ];
        self.gw.get_query("/devices", &query)
    }

    pub fn get(&self, id: i64) -> Result<Device, ClientError> {
        self.gw.get(&format!("/devices/{id}"))
    }

    pub fn create(&self, input: &DeviceInput) -> Result<Option<Device>, ClientError> {
        self.gw.post_saved("/devices", input)
    }

    pub fn update(&self, id: i64, input: &DeviceInput) -> Result<Option<Device>, ClientError> {
        self.gw.put_saved(&format!("/devices/{id}"), input)
    }

    pub fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.gw.delete(&format!("/devices/{id}"))
    }

    /// `POST /devices/control` with the target id in the body.
    pub fn control(
        &self,
        device_id: i64,
        command: &ControlCommand,
    ) -> Result<serde_json::Value, ClientError> {
        self.gw
            .post_value("/devices/control", &TargetedCommand { device_id, command })
    }

    pub fn control_by_id(
        &self,
        id: i64,
        command: &ControlCommand,
    ) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value(&format!("/devices/{id}/control"), command)
    }

    pub fn types(&self) -> Result<serde_json::Value, ClientError> {
        self.gw.get("/devices/types")
    }

    pub fn locations(&self) -> Result<Vec<String>, ClientError> {
        self.gw.get("/devices/locations")
    }

    pub fn statistics(&self) -> Result<DeviceStatistics, ClientError> {
        self.gw.get("/devices/statistics")
    }

    /// Replace the registry with the backend's default device set.
    pub fn initialize(&self) -> Result<serde_json::Value, ClientError> {
        self.gw.post_empty("/devices/initialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targeted_command_flattens() {
        let cmd = ControlCommand {
            action: "set_brightness".into(),
            value: Some(serde_json::json!(60)),
        };
        let json = serde_json::to_value(TargetedCommand {
            device_id: 4,
            command: &cmd,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"device_id": 4, "action": "set_brightness", "value": 60})
        );
    }
}
