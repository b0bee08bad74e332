use anyhow::{Context, Result, anyhow};
use log::info;
use pico_args::Arguments;
use std::{env, fs::File, io, path::PathBuf};

use crate::config::Config;
use crate::devices::{babolat, watch, zepp};
use crate::export;
use crate::load;
use crate::pipeline::{self, SessionOutput};
use crate::stroke::Stroke;
use crate::timebase::{self, AnalysisWindow};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("tennis") => {
            let babolat: PathBuf = pargs
                .value_from_str("--babolat")
                .map_err(|_| anyhow!(TENNIS_USAGE))?;
            let zepp: PathBuf = pargs
                .value_from_str("--zepp")
                .map_err(|_| anyhow!(TENNIS_USAGE))?;
            let run = RunArgs::parse(&mut pargs)?;
            reject_leftovers(pargs)?;
            let (cfg, window) = run.prepare()?;

            let bab_raw = load::open_csv(babolat::DEVICE, &babolat)?;
            let zepp_raw = load::open_csv(zepp::DEVICE, &zepp)?;
            let out = pipeline::tennis_session(&bab_raw, &zepp_raw, &window, &cfg.settings())
                .context("tennis session failed")?;
            run.finish("tennis", out)
        }

        Some("calibrate") => {
            let wrist: PathBuf = pargs
                .value_from_str("--watch")
                .map_err(|_| anyhow!(CALIBRATE_USAGE))?;
            let zepp: PathBuf = pargs
                .value_from_str("--zepp")
                .map_err(|_| anyhow!(CALIBRATE_USAGE))?;
            let run = RunArgs::parse(&mut pargs)?;
            reject_leftovers(pargs)?;
            let (cfg, window) = run.prepare()?;

            let watch_raw = load::open_csv(watch::DEVICE, &wrist)?;
            let zepp_raw = load::open_csv(zepp::DEVICE, &zepp)?;
            let out = pipeline::wrist_calibration(&watch_raw, &zepp_raw, &window, &cfg.settings())
                .context("wrist calibration failed")?;
            run.finish("calibrate", out)
        }

        Some("golf") => {
            let wrist: PathBuf = pargs
                .value_from_str("--watch")
                .map_err(|_| anyhow!(GOLF_USAGE))?;
            let zepp: PathBuf = pargs
                .value_from_str("--zepp")
                .map_err(|_| anyhow!(GOLF_USAGE))?;
            let run = RunArgs::parse(&mut pargs)?;
            reject_leftovers(pargs)?;
            let (cfg, window) = run.prepare()?;

            let watch_raw = load::open_csv(watch::DEVICE, &wrist)?;
            let golf_raw = load::open_csv(zepp::golf::DEVICE, &zepp)?;
            let out = pipeline::golf_session(&watch_raw, &golf_raw, &window, &cfg.settings())
                .context("golf session failed")?;
            run.finish("golf", out)
        }

        Some("config") => {
            let source = ConfigSource::parse(&mut pargs)?;
            reject_leftovers(pargs)?;
            let cfg = source.load()?;
            print_response(&serde_json::json!({"ok": true, "data": cfg.report()}));
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

enum ConfigSource {
    Default,
    Builtin,
    File(PathBuf),
}

impl ConfigSource {
    fn parse(pargs: &mut Arguments) -> Result<Self> {
        if pargs.contains("--builtin-config") {
            return Ok(Self::Builtin);
        }
        Ok(match pargs.opt_value_from_str::<_, PathBuf>("--config")? {
            Some(p) => Self::File(p),
            None => Self::Default,
        })
    }

    fn load(&self) -> Result<Config> {
        match self {
            Self::Default => Config::load_or_install_default(),
            Self::Builtin => Config::builtin(),
            Self::File(p) => Config::load(p),
        }
    }
}

/// Options shared by every session command.
struct RunArgs {
    start: String,
    end: String,
    out: Option<PathBuf>,
    strokes: Option<Vec<Stroke>>,
    config: ConfigSource,
}

impl RunArgs {
    fn parse(pargs: &mut Arguments) -> Result<Self> {
        let start: String = pargs
            .value_from_str("--start")
            .map_err(|_| anyhow!("--start YYYY-MM-DD is required"))?;
        let end: String = pargs
            .value_from_str("--end")
            .map_err(|_| anyhow!("--end YYYY-MM-DD is required"))?;
        let out: Option<PathBuf> = pargs.opt_value_from_str("--out")?;
        let strokes = match pargs.opt_value_from_str::<_, String>("--strokes")? {
            Some(list) => Some(parse_strokes(&list)?),
            None => None,
        };
        let config = ConfigSource::parse(pargs)?;
        Ok(Self {
            start,
            end,
            out,
            strokes,
            config,
        })
    }

    fn prepare(&self) -> Result<(Config, AnalysisWindow)> {
        let cfg = self.config.load()?;
        let max_days = cfg.profile.session.max_window_days;
        let window = AnalysisWindow::parse(&self.start, &self.end, cfg.tz, max_days)?;
        info!(
            "window {} .. {} ({})",
            timebase::display(&window.start),
            timebase::display(&window.end),
            cfg.tz
        );
        Ok((cfg, window))
    }

    fn finish(&self, name: &str, mut out: SessionOutput) -> Result<()> {
        if let Some(strokes) = &self.strokes {
            out.table = export::filter_strokes(&out.table, strokes);
        }

        match &self.out {
            Some(path) => {
                let f = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                export::write_csv(&out.table, f)?;
                info!("wrote {} row(s) to {}", out.table.rows.len(), path.display());
            }
            None => export::write_csv(&out.table, io::stdout().lock())?,
        }

        let mut summarized: Vec<&String> = out.calc_signals.iter().collect();
        if summarized.is_empty() {
            summarized = out.reference_signals.iter().collect();
        }
        let matched: serde_json::Map<String, serde_json::Value> = out
            .table
            .matched
            .iter()
            .map(|(tag, n)| (tag.clone(), serde_json::json!(n)))
            .collect();
        let report = serde_json::json!({
            "ok": true,
            "data": {
                "session": name,
                "rows": out.table.rows.len(),
                "columns": out.table.columns.len(),
                "matched": matched,
                "signals": out.signals(),
                "summary": export::describe(&out.table, &summarized),
                "output": self.out,
            }
        });
        // stdout may be carrying the table itself
        if self.out.is_some() {
            print_response(&report);
        } else {
            eprintln!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        Ok(())
    }
}

fn parse_strokes(list: &str) -> Result<Vec<Stroke>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Stroke>().map_err(|e| anyhow!(e)))
        .collect()
}

fn reject_leftovers(pargs: Arguments) -> Result<()> {
    let rest = pargs.finish();
    if !rest.is_empty() {
        return Err(anyhow!("unexpected arguments: {rest:?}"));
    }
    Ok(())
}

const TENNIS_USAGE: &str = "usage: sensorfuse tennis --babolat <csv> --zepp <csv> ...";
const CALIBRATE_USAGE: &str = "usage: sensorfuse calibrate --watch <csv> --zepp <csv> ...";
const GOLF_USAGE: &str = "usage: sensorfuse golf --watch <csv> --zepp <csv> ...";

fn print_help() {
    println!(
        r#"sensorfuse: align and score tennis/golf sensor sessions

USAGE:
  sensorfuse help [command]                       Show general or command-specific help
  sensorfuse tennis --babolat <csv> --zepp <csv>  Zepp swings matched to Babolat, with ZIQ/PIQ
  sensorfuse calibrate --watch <csv> --zepp <csv> Watch motion matched to Zepp raw sensor signals
  sensorfuse golf --watch <csv> --zepp <csv>      Watch motion matched to Zepp golf swings
  sensorfuse config                               Show the effective configuration

SESSION OPTIONS:
  --start YYYY-MM-DD    First day of the window (inclusive)
  --end YYYY-MM-DD      Last day of the window (inclusive)
  --out <csv>           Write the fused table here instead of stdout
  --strokes A,B         Keep only these stroke labels (e.g. SERVEFH,TOPSPINFH)
  --config <path>       Use this config file
  --builtin-config      Ignore config files, use built-in defaults

TIPS:
  - Config: ~/.config/sensorfuse/config.toml (installed on first run)
  - RUST_LOG=debug shows per-row rejections
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "tennis" => {
            println!(
                "usage: sensorfuse tennis --babolat <csv> --zepp <csv> --start <date> --end <date>"
            );
            println!("Babolat `motions` and Zepp `swings` exports; Zepp is the probe side.");
        }
        "calibrate" => {
            println!(
                "usage: sensorfuse calibrate --watch <csv> --zepp <csv> --start <date> --end <date>"
            );
            println!("WristMotion.csv and a Zepp tennis `swings` export; watch is the probe side.");
        }
        "golf" => {
            println!(
                "usage: sensorfuse golf --watch <csv> --zepp <csv> --start <date> --end <date>"
            );
            println!("WristMotion.csv and a Zepp golf `swings` export; watch is the probe side.");
        }
        "config" => {
            println!("usage: sensorfuse config [--config <path> | --builtin-config]");
            println!("Prints the effective configuration as JSON.");
        }
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
