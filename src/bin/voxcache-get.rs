//! VOXCACHE Lookup CLI
//!
//! Looks one key up in a seeded cache and prints `{"value": ..., "exists": ...}`.
//! Absence is not an error: the exit code is 0 either way.

use clap::Parser;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use voxcache::Cache;

/// VOXCACHE Get - embedded cache lookup printed as JSON
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Key to look up
    key: String,

    /// Extra entry to seed before the lookup, as KEY=VALUE (VALUE may be JSON)
    #[arg(long = "seed", value_name = "KEY=VALUE", value_parser = parse_seed)]
    seeds: Vec<(String, Value)>,
}

fn parse_seed(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("voxcache=warn".parse()?))
        .init();

    let args = Args::parse();

    let cache = Cache::seeded_default();
    for (key, value) in args.seeds {
        cache.put(key, value);
    }

    let lookup = cache.lookup(&args.key);
    debug!(key = %args.key, exists = lookup.exists, "Lookup done");
    println!("{}", lookup.to_json()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("a=b").unwrap(), ("a".into(), json!("b")));
        assert_eq!(parse_seed("n=42").unwrap(), ("n".into(), json!(42)));
        assert_eq!(
            parse_seed(r#"obj={"x":[1]}"#).unwrap(),
            ("obj".into(), json!({"x": [1]}))
        );
        assert_eq!(parse_seed("eq=a=b").unwrap(), ("eq".into(), json!("a=b")));
        assert_eq!(parse_seed("empty=").unwrap(), ("empty".into(), json!("")));
        assert!(parse_seed("novalue").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["voxcache-get", "hello", "--seed", "k=v"]).unwrap();
        assert_eq!(args.key, "hello");
        assert_eq!(args.seeds, vec![("k".to_string(), json!("v"))]);

        assert!(Args::try_parse_from(["voxcache-get"]).is_err());
    }
}
