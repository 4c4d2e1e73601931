/// Device serial number without the hardware batch suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSerial(String);

impl DeviceSerial {
    /// Trims the serial and truncates it at the first hyphen: `ABC123-99` becomes `ABC123`.
    pub fn parse(serial: &str) -> Result<DeviceSerial, String> {
        let normalized = serial.trim().split('-').next().unwrap_or_default();

        if normalized.is_empty() {
            return Err(format!("{} is not a valid device serial", serial));
        }

        Ok(Self(normalized.to_string()))
    }
}

impl AsRef<str> for DeviceSerial {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
