use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use wardrobe_contracts::assets::{preset_asset, presets, AssetCategory, ImageAsset};
use wardrobe_contracts::commands::{parse_command, WizardCommand, SESSION_HELP_COMMANDS};
use wardrobe_contracts::events::EventWriter;
use wardrobe_contracts::wizard::{WizardState, WizardStep};
use wardrobe_engine::error::error_chain_text;
use wardrobe_engine::files::{inline_image_file, save_data_url};
use wardrobe_engine::resolver::is_remote_reference;
use wardrobe_engine::{build_client, EngineConfig, WardrobeError, WizardSession};

#[derive(Debug, Parser)]
#[command(name = "wardrobe", version, about = "Virtual try-on wizard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive three-step try-on session.
    Session(SessionArgs),
    /// One-shot try-on of a face and a cloth.
    Tryon(TryonArgs),
    /// One-shot clothing design from a text description.
    Design(DesignArgs),
    /// List the built-in preset photos.
    Presets(PresetsArgs),
}

#[derive(Debug, Parser)]
struct BackendArgs {
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Parser)]
struct TryonArgs {
    #[arg(long)]
    face: String,
    #[arg(long)]
    cloth: String,
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Parser)]
struct DesignArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Parser)]
struct PresetsArgs {
    #[arg(long)]
    json: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("wardrobe error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
        Command::Tryon(args) => run_tryon(args),
        Command::Design(args) => run_design(args),
        Command::Presets(args) => {
            print_presets(&mut io::stdout(), args.json)?;
            Ok(0)
        }
    }
}

fn open_session(backend: &BackendArgs) -> WizardSession {
    let mut config = EngineConfig::from_env();
    if let Some(model) = backend.model.as_deref().filter(|m| !m.trim().is_empty()) {
        config.image_model = model.trim().to_string();
    }
    let events = backend.events.as_ref().map(EventWriter::for_new_session);
    WizardSession::new(
        build_client(&config, backend.dryrun, events.clone()),
        events,
    )
}

fn run_session(args: SessionArgs) -> Result<()> {
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let mut repl = Repl {
        session: open_session(&args.backend),
        out_dir: args.out,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    writeln!(stdout, "Wardrobe session started. Type /help for commands.")?;
    writeln!(stdout, "{}", step_indicator(repl.session.state()))?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        if repl.handle(parse_command(input), &mut stdout)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn run_tryon(args: TryonArgs) -> Result<i32> {
    let mut session = open_session(&args.backend);
    session.select_face(asset_from_reference(AssetCategory::Face, &args.face)?);
    session.select_cloth(asset_from_reference(AssetCategory::Cloth, &args.cloth)?)?;
    let result = session.generate_result()?;
    let path = save_data_url(result.url(), &args.out)?;
    println!("Saved try-on to {}", path.display());
    Ok(0)
}

fn run_design(args: DesignArgs) -> Result<i32> {
    if args.prompt.trim().is_empty() {
        bail!("--prompt must not be empty");
    }
    let session = open_session(&args.backend);
    let url = session
        .client()
        .generate_clothing_from_text(&args.prompt)?;
    let path = save_data_url(&url, &args.out)?;
    println!("Saved design to {}", path.display());
    Ok(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Repl {
    session: WizardSession,
    out_dir: PathBuf,
}

impl Repl {
    fn handle(&mut self, command: WizardCommand, out: &mut impl Write) -> Result<Flow> {
        match command {
            WizardCommand::Noop => {}
            WizardCommand::Help => {
                writeln!(out, "Commands:")?;
                for (usage, summary) in SESSION_HELP_COMMANDS {
                    writeln!(out, "  {usage:<24} {summary}")?;
                }
            }
            WizardCommand::Quit => return Ok(Flow::Quit),
            WizardCommand::Presets => print_presets(out, false)?,
            WizardCommand::SelectFace { reference } => {
                match asset_from_reference(AssetCategory::Face, &reference) {
                    Ok(asset) => {
                        writeln!(out, "Model photo set ({})", asset.id())?;
                        self.session.select_face(asset);
                        writeln!(out, "{}", step_indicator(self.session.state()))?;
                    }
                    Err(err) => writeln!(out, "Could not use {reference}: {err:#}")?,
                }
            }
            WizardCommand::SelectCloth { reference } => {
                let asset = match asset_from_reference(AssetCategory::Cloth, &reference) {
                    Ok(asset) => asset,
                    Err(err) => {
                        writeln!(out, "Could not use {reference}: {err:#}")?;
                        return Ok(Flow::Continue);
                    }
                };
                let id = asset.id().to_string();
                match self.session.select_cloth(asset) {
                    Ok(()) => {
                        writeln!(out, "Outfit set ({id})")?;
                        self.enter_result_step(out)?;
                    }
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            WizardCommand::Design { prompt } => {
                writeln!(out, "Designing outfit...")?;
                match self.session.design_cloth(&prompt) {
                    Ok(asset) => {
                        writeln!(out, "Designed outfit ({})", asset.id())?;
                        self.enter_result_step(out)?;
                    }
                    Err(err) => report_failure(out, "Design", &err, false)?,
                }
            }
            WizardCommand::Generate => self.generate(out)?,
            WizardCommand::Navigate { step } => {
                if self.session.navigate_to(step) {
                    writeln!(out, "{}", step_indicator(self.session.state()))?;
                    if step == WizardStep::GenerateResult {
                        self.show_latest(out)?;
                    }
                } else {
                    writeln!(out, "Step {} is not open yet", step.number())?;
                }
            }
            WizardCommand::Status => write_status(out, self.session.state())?,
            WizardCommand::History => {
                let state = self.session.state();
                if state.history().len() == 0 {
                    writeln!(out, "No try-on results yet")?;
                }
                for (idx, asset) in state.history().enumerate() {
                    writeln!(out, "  {}. {}", idx + 1, asset.id())?;
                }
            }
            WizardCommand::Save { path } => {
                let Some(result) = self.session.state().generated_result() else {
                    writeln!(out, "Nothing to save yet")?;
                    return Ok(Flow::Continue);
                };
                let target = path
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.out_dir.clone());
                match save_data_url(result.url(), &target) {
                    Ok(saved) => writeln!(out, "Saved {}", saved.display())?,
                    Err(err) => writeln!(out, "Save failed: {err:#}")?,
                }
            }
            WizardCommand::Invalid { command, message } => {
                writeln!(out, "/{command}: {message}")?;
            }
            WizardCommand::Unknown { command, .. } => {
                writeln!(out, "Unknown command: /{command} (try /help)")?;
            }
        }
        Ok(Flow::Continue)
    }

    // Opening the result step always starts a fresh try-on.
    fn enter_result_step(&mut self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", step_indicator(self.session.state()))?;
        self.generate(out)
    }

    fn generate(&mut self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "Generating try-on...")?;
        match self.session.generate_result() {
            Ok(result) => {
                writeln!(
                    out,
                    "Try-on ready ({}). Use /save to keep it.",
                    result.id()
                )?;
                writeln!(out, "{}", step_indicator(self.session.state()))?;
            }
            Err(err) => report_failure(out, "Try-on", &err, true)?,
        }
        Ok(())
    }

    fn show_latest(&self, out: &mut impl Write) -> Result<()> {
        match self.session.state().generated_result() {
            Some(result) => writeln!(out, "Latest result: {}", result.id())?,
            None => writeln!(out, "No result yet; use /generate")?,
        }
        Ok(())
    }
}

fn report_failure(
    out: &mut impl Write,
    what: &str,
    err: &WardrobeError,
    retryable: bool,
) -> Result<()> {
    if let WardrobeError::Wizard(inner) = err {
        writeln!(out, "{inner}")?;
        return Ok(());
    }
    writeln!(out, "{what} failed. Please try again.")?;
    writeln!(out, "  ({})", error_chain_text(err, 240))?;
    if retryable {
        writeln!(out, "Type /retry to run it again.")?;
    }
    Ok(())
}

/// Preset id, remote URL, inline data URL, or a local image file.
fn asset_from_reference(category: AssetCategory, reference: &str) -> Result<ImageAsset> {
    let reference = reference.trim();
    if let Some(preset) = preset_asset(category, reference) {
        return Ok(preset);
    }
    // Asset origins are preset, upload or generated; anything the user hands
    // in, a typed URL included, is recorded as an upload.
    if is_remote_reference(reference) || reference.starts_with("data:") {
        return Ok(ImageAsset::upload(reference, category));
    }
    let path = Path::new(reference);
    if !path.is_file() {
        bail!("no preset or file named {reference}");
    }
    Ok(ImageAsset::upload(inline_image_file(path)?, category))
}

fn step_indicator(state: &WizardState) -> String {
    WizardStep::ALL
        .iter()
        .map(|step| {
            let label = format!("{} {}", step.number(), step.label());
            if *step == state.current_step() {
                format!("[{label}]")
            } else if *step < state.current_step() {
                format!("{label} ✓")
            } else {
                label
            }
        })
        .collect::<Vec<String>>()
        .join("  >  ")
}

fn write_status(out: &mut impl Write, state: &WizardState) -> Result<()> {
    let describe = |asset: Option<&ImageAsset>| {
        asset
            .map(|asset| format!("{} ({})", asset.id(), asset.origin().as_str()))
            .unwrap_or_else(|| "-".to_string())
    };
    writeln!(out, "{}", step_indicator(state))?;
    writeln!(out, "  model:   {}", describe(state.selected_face()))?;
    writeln!(out, "  outfit:  {}", describe(state.selected_cloth()))?;
    writeln!(out, "  result:  {}", describe(state.generated_result()))?;
    writeln!(out, "  history: {}", state.history().len())?;
    Ok(())
}

fn print_presets(out: &mut impl Write, as_json: bool) -> Result<()> {
    let groups = [
        ("faces", AssetCategory::Face),
        ("cloths", AssetCategory::Cloth),
    ];
    if as_json {
        let mut listing = serde_json::Map::new();
        for (name, category) in groups {
            let entries: Vec<Value> = presets(category)
                .iter()
                .map(|spec| json!({ "id": spec.id, "label": spec.label, "url": spec.url }))
                .collect();
            listing.insert(name.to_string(), Value::Array(entries));
        }
        writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
        return Ok(());
    }
    for (name, category) in groups {
        writeln!(out, "{name}:")?;
        for spec in presets(category) {
            writeln!(out, "  {:<4} {}", spec.id, spec.label)?;
        }
    }
    Ok(())
}
