use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use entrust_catalog::{Catalog, FormType, Level, Specialty};
use entrust_core::{init_tracing, EngineConfig, FormEngine};
use entrust_record::EvidenceSummary;
use serde_json::json;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("entrust")
        .version(entrust_core::VERSION)
        .about("Requirements & evidence engine for competency assessment forms")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("resolve")
                .about("Print the requirements for a form type, level and specialty")
                .arg(
                    Arg::new("form")
                        .long("form")
                        .default_value("EPA")
                        .value_parser(value_parser!(FormType))
                        .help("Form type (EPA or GSAT)"),
                )
                .arg(
                    Arg::new("level")
                        .long("level")
                        .required(true)
                        .value_parser(value_parser!(u8).range(1..=4))
                        .help("Training level 1-4"),
                )
                .arg(
                    Arg::new("specialty")
                        .long("specialty")
                        .default_value("")
                        .help("Specialty label; ignored at levels 1-2"),
                ),
        )
        .subcommand(
            Command::new("progress")
                .about("Compute the progress matrix from evidence summaries")
                .arg(
                    Arg::new("evidence")
                        .long("evidence")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file holding an array of evidence summaries"),
                ),
        )
        .subcommand(
            Command::new("check-catalog")
                .about("Load a catalog and report its entries")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_parser(value_parser!(PathBuf))
                        .help("Catalog TOML (built-in catalog when omitted)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    let matches = cli.get_matches();

    let config = EngineConfig::from_env().context("loading configuration")?;
    init_tracing(&config.logging);

    match matches.subcommand() {
        Some(("resolve", args)) => {
            let form_type = args
                .get_one::<FormType>("form")
                .copied()
                .unwrap_or(FormType::Epa);
            let level = args.get_one::<u8>("level").copied().unwrap_or(1);
            let level = Level::new(level)?;
            let specialty = args
                .get_one::<String>("specialty")
                .cloned()
                .map(Specialty::from)
                .unwrap_or_default();

            let engine = FormEngine::in_memory(config)?;
            let requirements = engine
                .resolve_requirements(form_type, level, &specialty)
                .with_context(|| {
                    format!("no requirements for {form_type} {level} '{specialty}'")
                })?;
            println!("{}", serde_json::to_string_pretty(requirements)?);
        }
        Some(("progress", args)) => {
            let path = args
                .get_one::<PathBuf>("evidence")
                .context("--evidence is required")?;
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let items: Vec<EvidenceSummary> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;

            let engine = FormEngine::in_memory(config)?;
            for item in items {
                engine.upsert_evidence(item).await?;
            }
            let matrix = engine.progress(&[]).await?;
            println!("{}", serde_json::to_string_pretty(&matrix)?);
        }
        Some(("check-catalog", args)) => {
            let catalog = match args.get_one::<PathBuf>("path") {
                Some(path) => Catalog::load(path)?,
                None => Catalog::builtin()?.clone(),
            };
            let counts: Vec<_> = catalog
                .domains()
                .map(|d| (d.form_type().to_string(), d.entry_count()))
                .collect();

            if args.get_flag("json") {
                let report: serde_json::Map<_, _> = counts
                    .into_iter()
                    .map(|(form, count)| (form, json!(count)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Catalog OK");
                for (form, count) in counts {
                    println!("  {form}: {count} entries");
                }
            }
        }
        Some((other, _)) => anyhow::bail!("unknown command {other}"),
        None => anyhow::bail!("a command is required"),
    }

    Ok(())
}
