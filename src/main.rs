use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use havok_tag_downgrade::{Converter, ReportFormat, RuleRegistry, RuleSet, TransformationReporter};

#[derive(Parser, Debug)]
#[command(name = "hktcnv")]
#[command(about = "Converts a Havok Tag XML file from 2011.3 to 2010.2 format to be converted by hkxcmd")]
struct Args {
    /// Source tag XML file
    source: PathBuf,

    /// Destination file (defaults to <source>-out.<ext> next to the source)
    dest: Option<PathBuf>,

    /// YAML or JSON rule set to use instead of the built-in 2011.3 -> 2010.2 rules
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Print a summary of the applied transformations
    #[arg(long, value_enum, value_name = "FORMAT")]
    report: Option<ReportFormat>,

    /// Log every mutation to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "havok_tag_downgrade=debug"
    } else {
        "havok_tag_downgrade=warn"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()),
        )
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let rules = match &args.rules {
        Some(path) => RuleRegistry::new()
            .load_rules_from_file(path)
            .with_context(|| format!("Cannot use rule set '{}'", path.display()))?,
        None => RuleSet::builtin(),
    };

    let converter = Converter::new(rules);
    let outcome = converter.convert_file(&args.source, args.dest.as_deref())?;

    if let Some(format) = args.report {
        let reporter = TransformationReporter::new().with_format(format);
        let report = reporter.generate_report(&outcome.result);
        println!("{}", reporter.format_report(&report)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_positional_only() {
        let args = Args::try_parse_from(["hktcnv", "skeleton.xml"]).unwrap();
        assert_eq!(args.source, PathBuf::from("skeleton.xml"));
        assert!(args.dest.is_none());
        assert!(args.rules.is_none());
        assert!(args.report.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_all_options() {
        let args = Args::try_parse_from([
            "hktcnv",
            "in.xml",
            "out.xml",
            "--rules",
            "rules.yaml",
            "--report",
            "json",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.dest, Some(PathBuf::from("out.xml")));
        assert_eq!(args.rules, Some(PathBuf::from("rules.yaml")));
        assert_eq!(args.report, Some(ReportFormat::Json));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_require_source() {
        assert!(Args::try_parse_from(["hktcnv"]).is_err());
        assert!(Args::try_parse_from(["hktcnv", "in.xml", "--report", "html"]).is_err());
    }

    #[test]
    fn test_run_reports_missing_file() {
        let args = Args::try_parse_from(["hktcnv", "/nonexistent/skeleton.xml"]).unwrap();
        let error = run(args).unwrap_err();
        assert!(error.to_string().contains("does not appear to exist"));
    }
}
