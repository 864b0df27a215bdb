mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{
    AutopilotStrategy, DEFAULT_FRAME_MS, LogicTester, ScenarioResult, resolve_seed_inputs,
    split_csv,
};

#[derive(Debug, Parser)]
#[command(name = "vault-battle-tester", version = "0.1.0")]
#[command(about = "Headless QA for Vault Battle - autopilot battles with property checks")]
struct Args {
    /// Autopilot policies to run (comma-separated, or "all")
    #[arg(long, default_value = "reflex")]
    policies: String,

    /// List all available policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Seeds to run (comma-separated numbers or VB- replay codes, or "all")
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of consecutive seeds to play per listed seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Fixed frame step in milliseconds
    #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
    #[arg(value_parser = clap::value_parser!(u32).range(1..=1000))]
    frame_ms: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_policies(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let strategies = expand_policies(&args.policies)?;
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    log::debug!(
        "running {} policies over {} seeds x {} iterations",
        strategies.len(),
        seed_infos.len(),
        args.iterations
    );

    let tester = LogicTester::new(args.verbose, args.frame_ms);
    let results: Vec<ScenarioResult> = strategies
        .iter()
        .flat_map(|strategy| tester.run_policy(*strategy, &seed_infos, args.iterations))
        .collect();

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_policies(args: &Args) -> Result<bool> {
    if !args.list_policies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available policies:")?;
    for strategy in AutopilotStrategy::ALL {
        writeln!(
            output_target.writer(),
            "  {:10} - {}",
            strategy.key(),
            strategy.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "⚔️  Vault Battle Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_policies(policies_arg: &str) -> Result<Vec<AutopilotStrategy>> {
    let mut strategies = Vec::new();
    for token in split_csv(policies_arg) {
        let expanded: Vec<AutopilotStrategy> = if token.eq_ignore_ascii_case("all") {
            AutopilotStrategy::ALL.to_vec()
        } else {
            vec![token.parse().map_err(anyhow::Error::msg)?]
        };
        for strategy in expanded {
            if !strategies.contains(&strategy) {
                strategies.push(strategy);
            }
        }
    }
    if strategies.is_empty() {
        strategies.push(AutopilotStrategy::Reflex);
    }
    Ok(strategies)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No battles executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            policies: "idle".to_string(),
            list_policies: false,
            seeds: "1337".to_string(),
            iterations: 1,
            frame_ms: DEFAULT_FRAME_MS,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vault-battle-{}-{name}", std::process::id()))
    }

    #[test]
    fn expands_all_policies_without_duplicates() {
        let expanded = expand_policies("reflex,all").unwrap();
        assert_eq!(
            expanded,
            vec![
                AutopilotStrategy::Reflex,
                AutopilotStrategy::Idle,
                AutopilotStrategy::Random
            ]
        );
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let err = expand_policies("idle,turbo").unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }

    #[test]
    fn empty_policy_list_defaults_to_reflex() {
        assert_eq!(expand_policies(" , ").unwrap(), vec![AutopilotStrategy::Reflex]);
    }

    #[test]
    fn maybe_list_policies_writes_output() {
        let temp = temp_file("policies.txt");
        let args = Args {
            list_policies: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_policies(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available policies"));
        assert!(content.contains("reflex"));
    }

    #[test]
    fn maybe_list_policies_returns_false_when_disabled() {
        assert!(!maybe_list_policies(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_emits_json_array() {
        let temp = temp_file("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn write_reports_console_without_results() {
        let temp = temp_file("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No battles executed"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
