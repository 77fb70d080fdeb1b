#![deny(warnings)]

//! Headless CLI: run one analytics request from a file and print the JSON response.

use anyhow::{bail, Context, Result};
use royalty_core::EngineConfig;
use royalty_engine::{run, AnalyticsRequest};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    request: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: Option<u64>,
    pretty: bool,
}

fn parse_args<I: Iterator<Item = String>>(mut it: I) -> Result<Args> {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--request" => args.request = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--seed" => {
                let raw = it.next().context("--seed needs a value")?;
                args.seed = Some(raw.parse().with_context(|| format!("invalid seed: {raw}"))?);
            }
            "--pretty" => args.pretty = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

/// JSON when the extension says so, YAML otherwise.
fn load_request(path: &Path) -> Result<AnalyticsRequest> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let req = if is_json {
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(req)
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pure JSON.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");

    let Some(request_path) = args.request.as_deref() else {
        bail!("usage: royalty-cli --request <file.yaml|file.json> [--config <engine.yaml>] [--seed N] [--pretty]");
    };
    let cfg = match &args.config {
        Some(p) => EngineConfig::load(p)?,
        None => EngineConfig::default(),
    };
    let mut req = load_request(request_path)?;
    if args.seed.is_some() {
        req.seed = args.seed;
    }

    let resp = run(&req, &cfg)?;
    let out = if args.pretty {
        serde_json::to_string_pretty(&resp)?
    } else {
        serde_json::to_string(&resp)?
    };
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use royalty_engine::DataStatus;

    fn assets() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets")
    }

    #[test]
    fn parses_flags() {
        let args = parse_args(
            ["--request", "r.yaml", "--seed", "9", "--pretty"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert_eq!(args.request, Some(PathBuf::from("r.yaml")));
        assert_eq!(args.seed, Some(9));
        assert!(args.pretty);
        assert!(parse_args(["--seed", "x"].into_iter().map(String::from)).is_err());
        assert!(parse_args(["--bogus"].into_iter().map(String::from)).is_err());
    }

    #[test]
    fn sample_request_runs() {
        let req = load_request(&assets().join("requests/sample_forecast.yaml")).unwrap();
        let cfg = EngineConfig::load(assets().join("config/engine.yaml")).unwrap();
        let resp = run(&req, &cfg).unwrap();
        assert_eq!(resp.status, DataStatus::Populated);
        assert_eq!(resp.scenarios.as_ref().map(Vec::len), Some(3));
        assert_eq!(resp.distributions.territory.len(), 3);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("2025-Q4"));
    }
}
