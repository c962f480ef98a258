use botapi::types::{ApiResponse, GetUpdates, Update};
use botapi::BotApi;
use std::env;
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

fn main() -> anyhow::Result<()> {
    let agent = Agent::from(
        Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .provider(TlsProvider::NativeTls)
                    .build(),
            )
            .build(),
    );
    let api_server =
        env::var("TELEGRAM_API_URL").unwrap_or_else(|_| "https://api.telegram.org/".to_string());
    let token = env::var("TELEGRAM_API_KEY")?;
    let api = BotApi::new(api_server, &token)?;

    let mut resp = agent.run(api.get_updates(&GetUpdates::new(None, 0)))?;

    let updates: ApiResponse<Vec<Update>> = resp.body_mut().read_json()?;

    println!("{:#?}", updates.into_result()?);

    Ok(())
}
