use std::sync::Arc;

use anyhow::Result;
use catfetch_app::Page;
use catfetch_app::cli::{Cli, DEFAULT_CONFIG_FILE};
use catfetch_common::observability::init_logging;
use catfetch_config::CatfetchConfigLoader;
use catfetch_http::HttpClient;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over files, flags win over both)
    let loader = match &cli.config {
        Some(path) => CatfetchConfigLoader::new().with_file(path),
        None => CatfetchConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let settings = cli.settings(loader.load()?);

    let log_path = init_logging(settings.log.clone())?;
    tracing::info!(
        log_path=%log_path.display(),
        base_url=%settings.base_url,
        path=%settings.path,
        controls=?cli.controls,
        sequential=cli.sequential,
        "catfetch.start"
    );

    // 2) Mount the page
    let mut client = HttpClient::new(&settings.base_url)?;
    if let Some(timeout) = settings.timeout {
        client = client.with_timeout(timeout);
    }
    let page = Page::mount(Arc::new(client), settings.path.clone(), settings.content_match)?;

    // 3) Click through; failed cycles are logged and leave no trace in the region
    let outcomes = page.click_through(&cli.controls, cli.sequential).await;
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    tracing::info!(
        cycles = outcomes.len(),
        failed,
        groups = page.content().group_count(),
        "catfetch.done"
    );

    print!("{}", page.content().render_as(settings.output)?);
    Ok(())
}
