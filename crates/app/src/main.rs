use clap::Parser;
use engine::{GridStore, TransactionRepository, Tz, grid::MemoryGrid};
use settings::{Settings, Storage};
use sheets::SheetsClient;
use telegram_bot::UserId;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = settings::Args::parse();
    let settings = Settings::new(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "telemoney={level},telegram_bot={level},sheets={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone: Tz = settings
        .app
        .timezone
        .parse()
        .map_err(|err| format!("invalid app.timezone {:?}: {err}", settings.app.timezone))?;
    tracing::info!(env = ?settings.app.env, %timezone, "Starting telemoney...");

    match &settings.storage {
        Storage::Memory { transaction_sheet } => {
            tracing::warn!("Using in-memory storage, expenses are lost on restart");
            let repository = TransactionRepository::new(MemoryGrid::new(), transaction_sheet)
                .with_timezone(timezone);
            run_bot(&settings.telegram, repository).await
        }
        Storage::Sheets(sheets) => {
            let mut client = SheetsClient::builder()
                .spreadsheet_id(&sheets.spreadsheet_id)
                .credentials(sheets.credentials()?);
            if let Some(base_url) = &sheets.base_url {
                client = client.base_url(base_url);
            }
            let client = client.build()?;
            let sheet = sheets.transaction_sheet(settings.app.env);
            tracing::info!(
                spreadsheet_id = client.spreadsheet_id(),
                sheet,
                "Found sheets storage settings..."
            );

            let repository = TransactionRepository::new(client, sheet).with_timezone(timezone);
            run_bot(&settings.telegram, repository).await
        }
    }
}

async fn run_bot<S: GridStore + 'static>(
    telegram: &settings::Telegram,
    repository: TransactionRepository<S>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bot = telegram_bot::Bot::builder()
        .token(&telegram.token)
        .allowed_users(telegram.allowed_users.iter().copied().map(UserId).collect())
        .repository(repository)
        .build()
        .map_err(|err| format!("failed to initialize telegram bot: {err}"))?;

    bot.run().await;
    Ok(())
}
