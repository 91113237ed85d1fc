//! # Normalize Subcommand
//!
//! Loads a document, deep-freezes it and writes back its serializable form.
//! Duplicate keys are collapsed on the way through. `canonical-json` emits
//! RFC 8785 output via `serde_jcs`, so the bytes are stable regardless of
//! the input's key order.
//!
//! JSON has no spelling for NaN or infinity, so the two JSON formats refuse
//! documents holding them instead of writing `null`. YAML writes `.nan` and
//! `.inf`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use freezer_core::{FreezeConfig, Plain, Scalar};

use crate::load::load_frozen;

/// Output encodings for `freezer normalize`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON in document order.
    Json,
    /// YAML in document order.
    Yaml,
    /// RFC 8785 canonical JSON.
    CanonicalJson,
}

/// Arguments for the `freezer normalize` subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// JSON or YAML document.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write to this path instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Fail on the first NaN or infinite float in `plain`.
fn ensure_finite(plain: &Plain) -> Result<()> {
    let mut stack = vec![plain];
    while let Some(node) = stack.pop() {
        match node {
            Plain::Scalar(Scalar::Float(x)) if !x.is_finite() => {
                bail!("JSON cannot represent the float {x}; use --format yaml")
            }
            Plain::Scalar(_) => {}
            Plain::Sequence(items) => stack.extend(items),
            Plain::Mapping(entries) => {
                for (key, value) in entries {
                    stack.push(key);
                    stack.push(value);
                }
            }
        }
    }
    Ok(())
}

/// Encode a plain tree in the requested format.
pub fn render(plain: &Plain, format: OutputFormat) -> Result<String> {
    if format != OutputFormat::Yaml {
        ensure_finite(plain)?;
    }
    let text = match format {
        OutputFormat::Json => {
            let mut s = serde_json::to_string_pretty(plain).context("failed to encode JSON")?;
            s.push('\n');
            s
        }
        OutputFormat::Yaml => serde_yaml::to_string(plain).context("failed to encode YAML")?,
        OutputFormat::CanonicalJson => {
            serde_jcs::to_string(plain).context("failed to encode canonical JSON")?
        }
    };
    Ok(text)
}

/// Execute the normalize subcommand.
///
/// Returns exit code: 0 on success.
pub fn run_normalize(args: &NormalizeArgs, config: &FreezeConfig) -> Result<u8> {
    let frozen = load_frozen(&args.file, config)?;
    let plain = frozen
        .to_serializable_with(false, config)
        .with_context(|| format!("failed to serialize {}", args.file.display()))?;
    let text = render(&plain, args.format)?;

    match &args.out {
        Some(out) => {
            std::fs::write(out, &text)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(out = %out.display(), format = ?args.format, "wrote normalized document");
        }
        None => print!("{text}"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_sorts_keys() {
        let plain = Plain::mapping([
            ("b".into(), 2.into()),
            ("a".into(), Plain::sequence([true.into(), 1.into()])),
        ]);
        assert_eq!(
            render(&plain, OutputFormat::CanonicalJson).unwrap(),
            r#"{"a":[true,1],"b":2}"#
        );
    }

    #[test]
    fn json_keeps_document_order() {
        let plain = Plain::mapping([("b".into(), 2.into()), ("a".into(), 1.into())]);
        let text = render(&plain, OutputFormat::Json).unwrap();
        assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());
    }

    #[test]
    fn yaml_output_reparses() {
        let plain = Plain::mapping([("name".into(), "api".into())]);
        let text = render(&plain, OutputFormat::Yaml).unwrap();
        let back: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back["name"], serde_yaml::Value::from("api"));
    }

    #[test]
    fn non_finite_floats_are_rejected_for_json() {
        let plain = Plain::mapping([
            ("ok".into(), 1.5.into()),
            ("bad".into(), Plain::sequence([f64::NAN.into()])),
        ]);
        let err = render(&plain, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("NaN"));
        assert!(render(&plain, OutputFormat::CanonicalJson).is_err());

        let inf = Plain::sequence([f64::INFINITY.into()]);
        assert!(render(&inf, OutputFormat::Json).is_err());
    }

    #[test]
    fn non_finite_floats_survive_yaml() {
        let plain = Plain::mapping([("x".into(), f64::NAN.into())]);
        let text = render(&plain, OutputFormat::Yaml).unwrap();
        assert!(text.contains(".nan"));
    }

    #[test]
    fn normalize_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        let out = dir.path().join("out.json");
        std::fs::write(&input, "z: 1\na: [x, y]\n").unwrap();

        let args = NormalizeArgs {
            file: input,
            format: OutputFormat::CanonicalJson,
            out: Some(out.clone()),
        };
        assert_eq!(run_normalize(&args, &FreezeConfig::default()).unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            r#"{"a":["x","y"],"z":1}"#
        );
    }

    #[test]
    fn complex_yaml_keys_cannot_become_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("complex.yaml");
        std::fs::write(&input, "? [1, 2]\n: pair\n").unwrap();
        let args = NormalizeArgs {
            file: input,
            format: OutputFormat::Json,
            out: None,
        };
        assert!(run_normalize(&args, &FreezeConfig::default()).is_err());
    }
}
