use device_relay::config::{get_configuration, ScannerSettings};
use device_relay::startup::ScannerApplication;
use device_relay::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(String::from("barcode_scanner"), String::from("info"));

    init_subscriber(subscriber);

    let config =
        get_configuration::<ScannerSettings>("scanner").expect("Failed to read configuration.");
    let application = ScannerApplication::build(config).await?;

    application.run_until_stop().await
}
