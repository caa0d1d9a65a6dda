//! EFA transit CLI
//!
//! Answers trip, departure and stop questions against the EFA backend.

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use anyhow::Context;
use application::{
    LlmExtractor, TransitQueryService, detect_language, summarize_departures, summarize_stops,
};
use clap::Parser;
use infrastructure::{
    AppConfig, EfaTransitAdapter, OllamaInferenceAdapter, SystemClock, TelemetryConfig,
    init_telemetry,
};
use presentation_cli::{
    cli::{Cli, Commands, join_words},
    output::{render_answer, render_error},
};
use serde::Serialize;
use tracing::{debug, info};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_service(config: &AppConfig, use_llm: bool) -> anyhow::Result<TransitQueryService> {
    let timezone = config.query.transit_timezone()?;
    let transit = Arc::new(EfaTransitAdapter::new(
        &config.efa,
        config.retry.clone(),
        timezone,
    )?);
    let mut service =
        TransitQueryService::new(transit, Arc::new(SystemClock), config.query.clone())?;

    if use_llm || config.inference.enabled {
        let inference = Arc::new(OllamaInferenceAdapter::new(&config.inference)?);
        service = service.with_extractor(Arc::new(LlmExtractor::new(inference)));
        info!(model = %config.inference.model, "LLM extraction enabled");
    }
    Ok(service)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.verbose > 0 {
        config.telemetry.log_filter = TelemetryConfig::filter_for_verbosity(cli.verbose);
    }
    init_telemetry(&config.telemetry)?;
    debug!(base_url = %config.efa.base_url, "Configuration loaded");

    let use_llm = matches!(cli.command, Commands::Search { llm: true, .. });
    let service = build_service(&config, use_llm)?;
    let default_language = config.query.default_language;

    match cli.command {
        Commands::Search {
            text,
            language,
            json,
            ..
        } => {
            let text = join_words(&text);
            let shown_in =
                language.unwrap_or_else(|| detect_language(&text, default_language));
            let answer = service
                .answer(&text, language, None)
                .await
                .map_err(|e| anyhow::anyhow!(render_error(&e, shown_in)))?;

            if json {
                print_json(&answer)?;
            } else {
                println!("{}", render_answer(&answer));
            }
        },

        Commands::Departures {
            stop_id,
            limit,
            duration,
            no_delays,
            json,
        } => {
            let board = service
                .fetch_departures(&stop_id, None, duration, limit, !no_delays, None)
                .await
                .map_err(|e| anyhow::anyhow!(render_error(&e, default_language)))?;

            if json {
                print_json(&board)?;
            } else {
                println!("{}", summarize_departures(&board.value, None, default_language));
            }
        },

        Commands::Stops {
            query,
            limit,
            focus,
            json,
        } => {
            let query = join_words(&query);
            let focus = focus.location()?;
            let language = detect_language(&query, default_language);
            let stops = service
                .find_stops(&query, limit, focus.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!(render_error(&e, language)))?;

            if json {
                print_json(&stops)?;
            } else {
                println!("{}", summarize_stops(&stops, language));
            }
        },

        Commands::Resolve { text, language } => {
            let text = join_words(&text);
            let shown_in =
                language.unwrap_or_else(|| detect_language(&text, default_language));
            let resolved = service
                .resolve_query(&text, language)
                .await
                .map_err(|e| anyhow::anyhow!(render_error(&e, shown_in)))?;
            print_json(&resolved)?;
        },
    }

    Ok(())
}
