use brandscope_scraper::{
    extract_best_sellers_at, scrape_brand_brief, scrape_html, BrandBriefServices, BriefSettings,
    HttpPage, PageCookie,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "brandscope-cli")]
#[command(about = "Brandscope storefront intelligence command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find the best-sellers page and extract its products
    BestSellers(Target),
    /// Build the aggregated brand brief for a storefront
    BrandBrief(Target),
    /// Print the raw HTML and normalized text of a page
    ScrapeHtml(Target),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::BestSellers(_) => "best-sellers",
            Commands::BrandBrief(_) => "brand-brief",
            Commands::ScrapeHtml(_) => "scrape-html",
        }
    }

    fn target(&self) -> &Target {
        match self {
            Commands::BestSellers(target)
            | Commands::BrandBrief(target)
            | Commands::ScrapeHtml(target) => target,
        }
    }
}

#[derive(Debug, Args)]
struct Target {
    /// Absolute storefront URL
    url: String,

    /// Cookie sent with every page request, as `name=value` (repeatable)
    #[arg(long = "cookie", value_parser = parse_cookie)]
    cookies: Vec<PageCookie>,
}

fn parse_cookie(raw: &str) -> Result<PageCookie, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("cookie name is empty in '{raw}'"));
    }
    Ok(PageCookie {
        name: name.to_owned(),
        value: value.trim().to_owned(),
        domain: None,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = brandscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let target = cli.command.target();
    tracing::info!(
        command = cli.command.name(),
        url = %target.url,
        cookies = target.cookies.len(),
        "running scrape"
    );

    let services = BrandBriefServices::from_app_config(&config)?;
    let settings = BriefSettings::from_app_config(&config);

    let output = match cli.command {
        Commands::BestSellers(target) => {
            let mut page = HttpPage::new(&config.user_agent, &target.cookies)?;
            let resolution = extract_best_sellers_at(
                &mut page,
                &target.url,
                services.completion.as_ref(),
                &settings.navigation,
            )
            .await;
            serde_json::to_string_pretty(&resolution)?
        }
        Commands::BrandBrief(target) => {
            let mut page = HttpPage::new(&config.user_agent, &target.cookies)?;
            let brief = scrape_brand_brief(&mut page, &target.url, &services, &settings).await;
            serde_json::to_string_pretty(&brief)?
        }
        Commands::ScrapeHtml(target) => {
            let mut page = HttpPage::new(&config.user_agent, &target.cookies)?;
            let snapshot = scrape_html(&mut page, &target.url, &settings.navigation).await?;
            serde_json::to_string_pretty(&snapshot)?
        }
    };

    tracing::debug!(bytes = output.len(), "scrape finished");
    println!("{output}");
    Ok(())
}
