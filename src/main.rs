use cadence::application_port::*;
use cadence::client::*;
use cadence::domain_model::HttpRequest;
use cadence::logger::*;
use cadence::settings::*;
use reqwest::{Method, Url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let client = Client::try_new(&project_settings).await?;
    let session = client.session();

    match cli.command.unwrap_or(Command::Status) {
        Command::Request { method, body, url } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let url = Url::parse(&url)?;
            let mut request = HttpRequest::new(method, url);
            if let Some(body) = body {
                request = request.with_body(body);
            }
            let response = session.execute(request).await?;
            println!("{}", response.status);
            println!("{}", String::from_utf8_lossy(&response.body));
        }
        Command::Refresh => {
            let refreshed = session.attempt_refreshing_session().await?;
            println!("refreshed: {refreshed}");
        }
        Command::Status => {
            let exists = session.does_session_exist().await?;
            println!("session exists: {exists}");
            if exists {
                match session.user_id().await {
                    Ok(user_id) => println!("user id: {user_id}"),
                    Err(e) => println!("user id unavailable: {e}"),
                }
            }
        }
        Command::SignOut => {
            session.sign_out().await?;
            println!("signed out");
        }
    }

    client.shutdown();
    Ok(())
}
