//! lootbox-mint
//!
//! Publishes a directory of loot box assets, binds and publishes their
//! metadata, and mints one token per record to the named recipient.

mod cli;
mod run;

use cli::CliArgs;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let matches = cli::command().get_matches();
    let args = match CliArgs::from_matches(&matches) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(run::EXIT_USAGE);
        }
    };
    init_tracing(args.log_json);

    let code = match run::execute(&args).await {
        Ok(outcome) => match run::render(&outcome, args.report_json) {
            Ok(text) => {
                println!("{}", text.trim_end());
                run::EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e:#}");
                run::EXIT_FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            eprintln!("error: {e:#}");
            if let Some(pipeline) = e.downcast_ref::<lootbox_core::PipelineError>() {
                if pipeline.is_irreversible() {
                    eprintln!(
                        "note: {} mint(s) confirmed before the failure; they are not rolled back",
                        pipeline.confirmed_mints()
                    );
                }
            }
            run::exit_code(&e)
        }
    };
    std::process::exit(code);
}
