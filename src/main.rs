use device_relay::config::{get_configuration, Settings};
use device_relay::startup::Application;
use device_relay::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(String::from("webhook_relay"), String::from("info"));

    init_subscriber(subscriber);

    let config = get_configuration::<Settings>("relay").expect("Failed to read configuration.");
    let application = Application::build(config).await?;

    application.run_until_stop().await
}
