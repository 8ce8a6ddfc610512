//! Command handlers

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use souq_app::app::{current_year, Services};
use souq_app::config::Config;
use souq_app::export::export_active_listings;
use souq_app::http::{build_pipeline, AppState, Server, TokenIssuer};
use souq_app::repository::open_repositories;
use souq_app::smoke::SmokeRunner;
use souq_domain::model::PricingRequest;
use souq_infra::seed::SeedRunner;
use souq_infra::seed_csv::SeedData;
use souq_types::{Error, OutputFormat, Result};

use crate::cli::{Cli, Commands};
use crate::output::{
    output_estimate, output_matches, output_recommendations, output_removal, output_seed_report,
    output_smoke_outcome, output_smoke_report, output_tokens,
};

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn services(config: &Config) -> Result<Services> {
    let repos = open_repositories(config)?;
    Ok(Services::new(repos, config.match_options()))
}

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config (file, then environment)
    let config = Config::load()?;
    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind),

        Commands::Price {
            make,
            model,
            year,
            condition,
            mileage,
            governorate,
        } => {
            let request = PricingRequest {
                make,
                model,
                year,
                condition,
                mileage_km: mileage,
                governorate,
            };
            cmd_price(&config, &request, output_format)
        }

        Commands::Barter {
            user,
            max_len,
            tolerance,
            limit,
        } => cmd_barter(&config, user, max_len, tolerance, limit, output_format),

        Commands::Recommend { user, limit } => {
            cmd_recommend(&config, &user, limit.unwrap_or(config.recommendation_limit), output_format)
        }

        Commands::Seed { dir, clean } => cmd_seed(&config, dir, clean, output_format),

        Commands::Dedupe => cmd_dedupe(&config, output_format),

        Commands::Smoke { base_url } => cmd_smoke(&config, base_url, output_format),

        Commands::Export { output } => cmd_export(&config, output),

        Commands::Token { user, refresh } => cmd_token(&config, user, refresh, output_format),

        Commands::Config {
            show,
            set_environment,
            set_bind,
            set_store_dir,
            set_output,
            set_api_url,
            set_tolerance,
            set_max_chain_length,
            set_recommendation_limit,
            set_market_data,
            reset,
        } => cmd_config(
            show,
            ConfigUpdate {
                environment: set_environment,
                bind: set_bind,
                store_dir: set_store_dir,
                output_format: set_output,
                api_url: set_api_url,
                tolerance: set_tolerance,
                max_chain_length: set_max_chain_length,
                recommendation_limit: set_recommendation_limit,
                market_data: set_market_data,
            },
            reset,
        ),
    }
}

fn cmd_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let issuer = TokenIssuer::from_config(&config)?;
    let repos = open_repositories(&config)?;
    let state = AppState::new(repos, &config);
    let pipeline = build_pipeline(issuer);

    tracing::info!(
        environment = %config.environment,
        bind = %config.bind,
        "starting souq api"
    );
    runtime()?.block_on(async move {
        let server = Server::bind(&config.bind, state, pipeline).await?;
        server
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await
    })
}

fn cmd_price(config: &Config, request: &PricingRequest, format: OutputFormat) -> Result<()> {
    let services = services(config)?;
    let estimate = services.pricing.estimate(request)?;
    output_estimate(format, &estimate)
}

fn cmd_barter(
    config: &Config,
    user: Option<String>,
    max_len: Option<usize>,
    tolerance: Option<f64>,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let services = services(config)?;
    let mut options = *services.barter.options();
    if let Some(max_len) = max_len {
        if max_len < 2 {
            return Err(Error::invalid(format!(
                "chain length must be at least 2, got {}",
                max_len
            )));
        }
        options.max_chain_length = max_len;
    }
    if let Some(tolerance) = tolerance {
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(Error::invalid(format!(
                "tolerance must be within 0..=1, got {}",
                tolerance
            )));
        }
        options.tolerance = tolerance;
    }
    if let Some(limit) = limit {
        options.limit = limit;
    }

    let mut result = services.barter.matches_with(&options)?;
    if let Some(user) = user {
        result = result.involving(&user);
    }
    output_matches(format, &result)
}

fn cmd_recommend(config: &Config, user: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let services = services(config)?;
    let response = services.recommendations.recommend(user, limit)?;
    output_recommendations(format, &response)
}

fn cmd_seed(config: &Config, dir: Option<PathBuf>, clean: bool, format: OutputFormat) -> Result<()> {
    let repos = open_repositories(config)?;
    let runner = SeedRunner::new(&repos);

    if clean {
        let report = runner.clean()?;
        return output_removal(format, "Removed seeded rows", &report);
    }

    let data = match &dir {
        Some(dir) => {
            if !dir.is_dir() {
                return Err(Error::invalid(format!("not a directory: {}", dir.display())));
            }
            SeedData::load_dir(dir, current_year())?
        }
        None => SeedData::sample(current_year())?,
    };
    if data.is_empty() {
        println!("No seed rows found");
        return Ok(());
    }

    let pb = progress_bar(data.len() as u64);
    pb.set_message("seeding");
    let tick = || pb.inc(1);
    let report = runner.run(&data, Some(&tick));
    pb.finish_and_clear();
    let report = report?;

    tracing::info!(
        inserted = report.inserted(),
        skipped = report.skipped(),
        "seed finished"
    );
    output_seed_report(format, &report)
}

fn cmd_dedupe(config: &Config, format: OutputFormat) -> Result<()> {
    let repos = open_repositories(config)?;
    let report = SeedRunner::new(&repos).dedupe()?;
    output_removal(format, "Removed duplicates", &report)
}

fn cmd_smoke(config: &Config, base_url: Option<String>, format: OutputFormat) -> Result<()> {
    let base_url = base_url.unwrap_or_else(|| config.api_url.clone());
    let issuer = TokenIssuer::from_config(config)?;
    let runner = SmokeRunner::new(&base_url, &issuer)?;

    let pb = progress_bar(SmokeRunner::scenario_count() as u64);
    let on_done = |outcome: &souq_app::smoke::SmokeOutcome| {
        if !outcome.passed {
            pb.println(output_smoke_outcome(outcome));
        }
        pb.set_message(outcome.name.clone());
        pb.inc(1);
    };
    let report = runtime()?.block_on(runner.run(Some(&on_done)));
    pb.finish_and_clear();

    output_smoke_report(format, &report)?;
    if report.all_passed() {
        Ok(())
    } else {
        Err(Error::Http(format!(
            "{} of {} smoke scenarios failed",
            report.failed(),
            report.outcomes.len()
        )))
    }
}

fn cmd_export(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let output_path = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "souq-listings-{}.xlsx",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    });
    let services = services(config)?;
    let rows = export_active_listings(&services, &output_path)?;

    println!("Exported {} listings to: {}", rows, output_path.display());
    Ok(())
}

fn cmd_token(
    config: &Config,
    user: Option<String>,
    refresh: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let issuer = TokenIssuer::from_config(config)?;
    match (user, refresh) {
        (_, Some(refresh_token)) => {
            let access_token = issuer.refresh(&refresh_token)?;
            if format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "access_token": access_token,
                        "token_type": "Bearer",
                        "expires_in": config.access_token_ttl_secs,
                    }))?
                );
            } else {
                println!("Access token: {}", access_token);
            }
            Ok(())
        }
        (Some(user), None) => {
            let pair = issuer.issue_pair(&user)?;
            output_tokens(format, &pair)
        }
        (None, None) => Err(Error::invalid("either --user or --refresh is required")),
    }
}

/// Fields `config --set-…` may change
#[derive(Default)]
struct ConfigUpdate {
    environment: Option<String>,
    bind: Option<String>,
    store_dir: Option<PathBuf>,
    output_format: Option<OutputFormat>,
    api_url: Option<String>,
    tolerance: Option<f64>,
    max_chain_length: Option<usize>,
    recommendation_limit: Option<usize>,
    market_data: Option<PathBuf>,
}

impl ConfigUpdate {
    /// Apply to `config`; returns whether anything changed
    fn apply(self, config: &mut Config) -> Result<bool> {
        let mut modified = false;

        if let Some(environment) = self.environment {
            config.environment = environment;
            modified = true;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
            modified = true;
        }
        if let Some(dir) = self.store_dir {
            config.store_dir = Some(dir);
            modified = true;
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
            modified = true;
        }
        if let Some(url) = self.api_url {
            config.api_url = url;
            modified = true;
        }
        if let Some(tolerance) = self.tolerance {
            if !(0.0..=1.0).contains(&tolerance) {
                return Err(Error::invalid(format!(
                    "tolerance must be within 0..=1, got {}",
                    tolerance
                )));
            }
            config.barter_tolerance = tolerance;
            modified = true;
        }
        if let Some(len) = self.max_chain_length {
            if len < 2 {
                return Err(Error::invalid(format!(
                    "chain length must be at least 2, got {}",
                    len
                )));
            }
            config.barter_max_chain_length = len;
            modified = true;
        }
        if let Some(limit) = self.recommendation_limit {
            config.recommendation_limit = limit;
            modified = true;
        }
        if let Some(path) = self.market_data {
            config.market_data_path = Some(path);
            modified = true;
        }
        Ok(modified)
    }
}

fn cmd_config(show: bool, update: ConfigUpdate, reset: bool) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    // Edit the file only; environment values must not be persisted
    let mut config = Config::load_file()?;
    let modified = update.apply(&mut config)?;

    if modified {
        config.save()?;
        println!("Configuration saved to: {}", Config::config_path()?.display());
    }

    if show || !modified {
        println!("{}", Config::load()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_update_applies_fields() {
        let mut config = Config::default();
        let update = ConfigUpdate {
            environment: Some("staging".to_string()),
            tolerance: Some(0.25),
            max_chain_length: Some(3),
            output_format: Some(OutputFormat::Json),
            ..Default::default()
        };
        assert!(update.apply(&mut config).unwrap());
        assert_eq!(config.environment, "staging");
        assert_eq!(config.barter_tolerance, 0.25);
        assert_eq!(config.barter_max_chain_length, 3);
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_config_update_empty_is_noop() {
        let mut config = Config::default();
        assert!(!ConfigUpdate::default().apply(&mut config).unwrap());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_update_rejects_bad_values() {
        let mut config = Config::default();
        let update = ConfigUpdate {
            tolerance: Some(1.5),
            ..Default::default()
        };
        assert!(update.apply(&mut config).is_err());

        let update = ConfigUpdate {
            max_chain_length: Some(1),
            ..Default::default()
        };
        assert!(update.apply(&mut config).is_err());
    }
}
