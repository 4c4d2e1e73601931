use serde::Deserialize;

use crate::domain::device_serial::DeviceSerial;

/// A device registration event received through the webhook.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    /// Serial as it was delivered, kept for the retry ledger.
    pub raw_serial: String,
    pub serial: DeviceSerial,
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct DeviceEventForm {
    pub serial: Option<String>,
    pub event: Option<String>,
}

impl DeviceEvent {
    pub fn parse(raw_serial: String, name: String) -> Result<DeviceEvent, String> {
        let name = name.trim().to_string();

        if name.is_empty() {
            return Err(String::from("event name is missing"));
        }

        let serial = DeviceSerial::parse(&raw_serial)?;

        Ok(DeviceEvent {
            raw_serial,
            serial,
            name,
        })
    }
}

impl TryFrom<DeviceEventForm> for DeviceEvent {
    type Error = String;

    fn try_from(form: DeviceEventForm) -> Result<Self, Self::Error> {
        let serial = form.serial.ok_or_else(|| String::from("serial is missing"))?;
        let event = form.event.ok_or_else(|| String::from("event name is missing"))?;

        DeviceEvent::parse(serial, event)
    }
}
