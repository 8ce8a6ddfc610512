//! Output formatting module

use serde::Serialize;

use souq_app::http::TokenPair;
use souq_app::smoke::{SmokeOutcome, SmokeReport};
use souq_domain::model::{BarterMatchResult, PriceEstimate, RecommendationsResponse};
use souq_infra::seed::{RemovalReport, SeedReport};
use souq_types::{OutputFormat, Result};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn egp(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    format!("{} EGP", out)
}

pub fn output_estimate(format: OutputFormat, estimate: &PriceEstimate) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(estimate);
    }
    println!("\nPrice Estimate");
    println!("==============");
    println!("Estimate:        {}", egp(estimate.point));
    println!("Range:           {} - {}", egp(estimate.low), egp(estimate.high));
    println!("Confidence:      {:.0}%", estimate.confidence * 100.0);
    println!("Comparables:     {}", estimate.comparables_used);
    println!("Method:          {:?}", estimate.method);
    Ok(())
}

pub fn output_matches(format: OutputFormat, result: &BarterMatchResult) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }
    println!(
        "\nBarter Chains ({} items considered, tolerance {:.0}%, max length {})",
        result.items_considered,
        result.tolerance * 100.0,
        result.max_chain_length
    );
    println!("{}", "=".repeat(60));
    if result.chains.is_empty() {
        println!("No closing chains found.");
        return Ok(());
    }
    for (i, chain) in result.chains.iter().enumerate() {
        println!(
            "\n#{} score {:.3}  fairness {:.2}  imbalance {:.1}%",
            i + 1,
            chain.score,
            chain.fairness,
            chain.max_relative_imbalance * 100.0
        );
        for t in &chain.transfers {
            println!(
                "  {} -> {}: {} ({})",
                t.from,
                t.to,
                t.item_title,
                egp(t.value)
            );
        }
    }
    Ok(())
}

pub fn output_recommendations(format: OutputFormat, response: &RecommendationsResponse) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(response);
    }
    println!("\nRecommendations for {}", response.user_id);
    println!("{}", "=".repeat(60));
    if response.items.is_empty() {
        println!("No active listings to recommend.");
        return Ok(());
    }
    println!(
        "{:>3}  {:>6}  {:<28} {:>16}  {}",
        "#", "Score", "Vehicle", "Price", "Governorate"
    );
    for (i, scored) in response.items.iter().enumerate() {
        let l = &scored.listing;
        let vehicle = format!("{} {} {}", l.make.label(), l.model, l.year);
        println!(
            "{:>3}  {:>6.3}  {:<28} {:>16}  {}",
            i + 1,
            scored.score,
            vehicle,
            egp(l.price),
            l.governorate.label()
        );
    }
    Ok(())
}

pub fn output_seed_report(format: OutputFormat, report: &SeedReport) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    println!("\nSeed complete");
    println!("=============");
    println!("{}", report);
    Ok(())
}

pub fn output_removal(format: OutputFormat, action: &str, report: &RemovalReport) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    println!(
        "{}: {} listings, {} barter items ({} total)",
        action,
        report.listings,
        report.barter_items,
        report.total()
    );
    Ok(())
}

pub fn output_smoke_outcome(outcome: &SmokeOutcome) -> String {
    let mark = if outcome.passed { "PASS" } else { "FAIL" };
    if outcome.detail.is_empty() {
        format!("{} {} ({} ms)", mark, outcome.name, outcome.elapsed_ms)
    } else {
        format!("{} {} ({} ms): {}", mark, outcome.name, outcome.elapsed_ms, outcome.detail)
    }
}

pub fn output_smoke_report(format: OutputFormat, report: &SmokeReport) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    println!("\nSmoke Test: {}", report.base_url);
    println!("{}", "=".repeat(60));
    for outcome in &report.outcomes {
        println!("{}", output_smoke_outcome(outcome));
    }
    println!(
        "\n{} passed, {} failed",
        report.passed(),
        report.failed()
    );
    Ok(())
}

pub fn output_tokens(format: OutputFormat, pair: &TokenPair) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(pair);
    }
    println!("Access token:  {}", pair.access_token);
    println!("Refresh token: {}", pair.refresh_token);
    println!("Expires in:    {} s", pair.expires_in);
    Ok(())
}
