use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::error::Error;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vellum::build::build_site;
use vellum::client::Client;
use vellum::config::Config;
use vellum::preview;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("vellum")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from a headless CMS")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Renders the index and every post page")
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .default_value("./_output")
                        .help("The directory the site is written to"),
                )
                .arg(
                    Arg::with_name("ref")
                        .long("ref")
                        .takes_value(true)
                        .help("Renders content at this preview ref instead of the published content"),
                ),
        )
        .subcommand(
            SubCommand::with_name("preview")
                .about("Resolves a preview token to the page it previews")
                .arg(
                    Arg::with_name("token")
                        .long("token")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("document")
                        .long("document")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .get_matches();

    if let Err(e) = run(&matches).await {
        eprintln!("ERROR: {}", e);
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  caused by: {}", err);
            source = err.source();
        }
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches<'_>) -> Result<(), Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    match matches.subcommand() {
        ("build", Some(matches)) => {
            let output = Path::new(matches.value_of("output").unwrap_or("./_output"));
            let config = Config::from_directory(&cwd, output)?;
            build_site(&config, matches.value_of("ref").map(str::to_owned)).await?;
        }
        ("preview", Some(matches)) => {
            let config = Config::from_directory(&cwd, Path::new("."))?;
            let client = Client::new(config.api_endpoint, config.access_token);
            let token = matches.value_of("token").unwrap_or_default();
            let document = matches.value_of("document").unwrap_or_default();
            match preview::resolve(&client, token, document).await? {
                Some(path) => println!("{}", preview::redirect_url(&config.site_root, &path)?),
                None => return Err("Invalid token".into()),
            }
        }
        _ => {}
    }
    Ok(())
}
