use std::io::{self, ErrorKind, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use banao_contracts::aspect::AspectRatio;
use banao_contracts::chat::{parse_command, Intent, SESSION_HELP_COMMANDS};
use banao_contracts::events::SessionEvents;
use banao_contracts::images::{ImageSlot, ImageSource};
use banao_contracts::preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, TerminalColorScheme, Theme,
    ThemeContext,
};
use banao_engine::{EngineConfig, GeminiClient, GenerateOutcome, SessionController, SessionSnapshot};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "banao",
    version,
    about = "Place the person from one photo into the scene of another"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one composite and save it.
    Compose(ComposeArgs),
    /// Interactive session with slash commands.
    Session(SessionArgs),
    /// Show or toggle the light/dark preference.
    Theme(ThemeArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Debug, Parser)]
struct ComposeArgs {
    #[arg(long)]
    person: PathBuf,
    #[arg(long)]
    style: PathBuf,
    #[arg(long, default_value = "Original")]
    aspect_ratio: AspectRatio,
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct ThemeArgs {
    #[command(subcommand)]
    action: Option<ThemeAction>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ThemeAction {
    Show,
    Toggle,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("banao error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Compose(args) => run_compose(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
        Command::Theme(args) => run_theme(args),
    }
}

/// Fails before any client exists when the credential is missing.
fn build_controller(engine: &EngineArgs, events: Option<&Path>) -> Result<SessionController> {
    let config = EngineConfig::from_env()?
        .with_model(engine.model.clone())
        .with_api_base(engine.api_base.clone());
    let client = GeminiClient::new(&config);
    let mut controller = SessionController::new(Box::new(client));
    if let Some(path) = events {
        controller = controller.with_events(SessionEvents::create(path));
    }
    Ok(controller)
}

fn open_theme() -> ThemeContext {
    let store: Box<dyn PreferenceStore> = match FilePreferenceStore::open_default() {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(error = %err, "theme preference will not persist");
            Box::new(MemoryPreferenceStore::new())
        }
    };
    ThemeContext::initialize(store, &TerminalColorScheme::from_env())
}

fn run_compose(args: ComposeArgs) -> Result<i32> {
    let controller = build_controller(&args.engine, args.events.as_deref())?;
    let palette = Palette::for_theme(open_theme().theme());

    for (slot, path) in [
        (ImageSlot::Person, &args.person),
        (ImageSlot::Style, &args.style),
    ] {
        if controller.set_image(slot, &ImageSource::path(path)).is_err() {
            report_error(&mut io::stderr(), &palette, &controller.snapshot())?;
            return Ok(1);
        }
    }
    controller.set_aspect_ratio(args.aspect_ratio);

    println!(
        "Generating ({} aspect ratio) with {}...",
        args.aspect_ratio,
        controller.generator_name()
    );
    match controller.generate() {
        GenerateOutcome::Generated => match controller.download(&args.out)? {
            Some(path) => {
                println!("{}", palette.accent(&format!("Saved {}", path.display())));
                Ok(0)
            }
            None => Ok(1),
        },
        _ => {
            report_error(&mut io::stderr(), &palette, &controller.snapshot())?;
            Ok(1)
        }
    }
}

/// Mutable state the REPL threads through every command.
struct Session<'a> {
    controller: &'a SessionController,
    theme: ThemeContext,
    palette: Palette,
    default_out: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn run_session(args: SessionArgs) -> Result<()> {
    let controller = build_controller(&args.engine, args.events.as_deref())?;
    let theme = open_theme();
    let mut session = Session {
        controller: &controller,
        palette: Palette::for_theme(theme.theme()),
        theme,
        default_out: args.out,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    writeln!(stdout, "BanaO session started. Type /help for commands.")?;

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

        let intent = parse_command(line.trim_end_matches(['\n', '\r']));
        if handle_intent(&intent, &mut session, &mut stdout)? == Flow::Quit {
            break;
        }
    }

    Ok(())
}

fn handle_intent(intent: &Intent, session: &mut Session<'_>, out: &mut dyn Write) -> Result<Flow> {
    let controller = session.controller;
    match intent.action.as_str() {
        "noop" => {}
        "help" => writeln!(out, "Commands: {}", SESSION_HELP_COMMANDS.join("  "))?,
        "set_person" | "set_style" => {
            let slot = if intent.action == "set_person" {
                ImageSlot::Person
            } else {
                ImageSlot::Style
            };
            let Some(path) = intent.arg("path") else {
                writeln!(out, "/{} requires a path", slot.as_str())?;
                return Ok(Flow::Continue);
            };
            match controller.set_image(slot, &ImageSource::path(path)) {
                Ok(()) => write_slot(out, slot, &controller.snapshot())?,
                Err(_) => report_error(out, &session.palette, &controller.snapshot())?,
            }
        }
        "set_ratio" => set_ratio(out, controller, intent, &session.palette)?,
        "list_ratios" => {
            let current = controller.aspect_ratio();
            for ratio in AspectRatio::ALL {
                let marker = if ratio == current { "*" } else { " " };
                writeln!(out, "{marker} {ratio}")?;
            }
        }
        "generate" => {
            if controller.snapshot().can_generate() {
                writeln!(out, "Generating ({} aspect ratio)...", controller.aspect_ratio())?;
            }
            match controller.generate() {
                GenerateOutcome::Generated => writeln!(
                    out,
                    "{}",
                    session
                        .palette
                        .accent("Your creation is ready! Use /download to save it.")
                )?,
                GenerateOutcome::Busy => writeln!(out, "A generation is already running.")?,
                _ => report_error(out, &session.palette, &controller.snapshot())?,
            }
        }
        "download" => {
            let dir = intent
                .arg("dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| session.default_out.clone());
            match controller.download(&dir) {
                Ok(Some(path)) => writeln!(out, "Saved {}", path.display())?,
                Ok(None) => writeln!(out, "Nothing to download yet.")?,
                Err(err) => writeln!(
                    out,
                    "{}",
                    session.palette.error(&format!("Download failed: {err:#}"))
                )?,
            }
        }
        "status" => {
            for line in status_lines(&controller.snapshot()) {
                writeln!(out, "{line}")?;
            }
        }
        "toggle_theme" => {
            let saved = match session.theme.toggle() {
                Ok(_) => true,
                Err(err) => {
                    warn!(error = %err, "theme preference not saved");
                    false
                }
            };
            session.palette = session.palette.retheme(session.theme.theme());
            let applied = session.palette.accent(session.theme.root_class());
            if saved {
                writeln!(out, "Theme set to {applied}")?;
            } else {
                writeln!(out, "Theme set to {applied} (not saved)")?;
            }
        }
        "quit" => return Ok(Flow::Quit),
        _ => writeln!(out, "Unknown command: {}. Type /help.", intent.raw.trim())?,
    }
    Ok(Flow::Continue)
}

fn set_ratio(
    out: &mut dyn Write,
    controller: &SessionController,
    intent: &Intent,
    palette: &Palette,
) -> io::Result<()> {
    let Some(raw) = intent.arg("ratio") else {
        return writeln!(out, "Aspect ratio is {}", controller.aspect_ratio());
    };
    match raw.parse::<AspectRatio>() {
        Ok(ratio) => {
            controller.set_aspect_ratio(ratio);
            writeln!(out, "Aspect ratio set to {ratio}")
        }
        Err(err) => writeln!(out, "{}", palette.error(&err)),
    }
}

fn run_theme(args: ThemeArgs) -> Result<i32> {
    let mut theme = open_theme();
    match args.action.unwrap_or(ThemeAction::Show) {
        ThemeAction::Show => println!("{}", theme.theme()),
        ThemeAction::Toggle => println!("{}", theme.toggle()?),
    }
    Ok(0)
}

fn write_slot(out: &mut dyn Write, slot: ImageSlot, snapshot: &SessionSnapshot) -> io::Result<()> {
    let summary = match slot {
        ImageSlot::Person => snapshot.person.as_ref(),
        ImageSlot::Style => snapshot.style.as_ref(),
    };
    match summary {
        Some(summary) => writeln!(out, "{} image: {}", slot.as_str(), summary.describe()),
        None => Ok(()),
    }
}

fn status_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    let describe = |summary: Option<&banao_engine::SlotSummary>| {
        summary
            .map(|summary| summary.describe())
            .unwrap_or_else(|| "(none)".to_string())
    };
    let mut lines = vec![
        format!("person: {}", describe(snapshot.person.as_ref())),
        format!("style: {}", describe(snapshot.style.as_ref())),
        format!("aspect ratio: {}", snapshot.aspect_ratio),
        format!(
            "result: {}",
            if snapshot.generated_image.is_some() {
                "ready"
            } else if snapshot.is_generating {
                "generating"
            } else {
                "none"
            }
        ),
    ];
    if let Some(error) = snapshot.last_error.as_deref() {
        lines.push(format!("error: {error}"));
    }
    lines
}

fn report_error(out: &mut dyn Write, palette: &Palette, snapshot: &SessionSnapshot) -> io::Result<()> {
    match snapshot.last_error.as_deref() {
        Some(error) => writeln!(out, "{}", palette.error(&format!("Oops! {error}"))),
        None => Ok(()),
    }
}

/// ANSI colours chosen for the active theme; plain text off a terminal.
#[derive(Debug, Clone, Copy)]
struct Palette {
    accent: &'static str,
    error: &'static str,
    enabled: bool,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        Self::with_colors(theme, io::stdout().is_terminal())
    }

    fn with_colors(theme: Theme, enabled: bool) -> Self {
        match theme {
            Theme::Light => Self {
                accent: "\x1b[35m",
                error: "\x1b[31m",
                enabled,
            },
            Theme::Dark => Self {
                accent: "\x1b[95m",
                error: "\x1b[91m",
                enabled,
            },
        }
    }

    fn retheme(self, theme: Theme) -> Self {
        Self::with_colors(theme, self.enabled)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{color}{text}\x1b[0m")
    }

    fn accent(&self, text: &str) -> String {
        self.paint(self.accent, text)
    }

    fn error(&self, text: &str) -> String {
        self.paint(self.error, text)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use banao_contracts::aspect::AspectRatio;
    use banao_contracts::chat::parse_command;
    use banao_contracts::errors::ApiError;
    use banao_contracts::preferences::{
        MemoryPreferenceStore, PreferenceStore, StaticColorScheme, Theme, ThemeContext,
    };
    use banao_engine::{
        CompositeGenerator, GenerationRequest, GenerationResult, SessionController,
        SessionSnapshot,
    };
    use clap::Parser;

    use super::{handle_intent, status_lines, Cli, Command, Flow, Palette, Session};

    struct FixedGenerator(GenerationResult);

    impl CompositeGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn request_composite(&self, _request: &GenerationRequest) -> GenerationResult {
            self.0.clone()
        }
    }

    struct ReadOnlyStore;

    impl PreferenceStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> Option<String> {
            None
        }

        fn save(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("preferences are read-only")
        }
    }

    fn session<'a>(
        controller: &'a SessionController,
        store: Box<dyn PreferenceStore>,
        default_out: PathBuf,
    ) -> Session<'a> {
        let theme = ThemeContext::initialize(store, &StaticColorScheme(None));
        Session {
            controller,
            palette: Palette::with_colors(theme.theme(), false),
            theme,
            default_out,
        }
    }

    fn run_line(session: &mut Session<'_>, line: &str) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = handle_intent(&parse_command(line), session, &mut out).expect("handle intent");
        (flow, String::from_utf8(out).expect("utf8 output"))
    }

    fn write_image(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, b"image-bytes").expect("write fixture");
        path.display().to_string()
    }

    fn empty_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            person: None,
            style: None,
            aspect_ratio: AspectRatio::Original,
            is_generating: false,
            last_error: None,
            generated_image: None,
        }
    }

    #[test]
    fn compose_parses_aspect_ratio_label() {
        let cli = Cli::parse_from([
            "banao",
            "compose",
            "--person",
            "me.jpg",
            "--style",
            "jacket.png",
            "--aspect-ratio",
            "16:9",
        ]);
        let Command::Compose(args) = cli.command else {
            panic!("expected compose");
        };
        assert_eq!(args.aspect_ratio, AspectRatio::Landscape16x9);
        assert_eq!(args.out.to_string_lossy(), ".");
    }

    #[test]
    fn compose_rejects_unknown_ratio() {
        let parsed = Cli::try_parse_from([
            "banao",
            "compose",
            "--person",
            "me.jpg",
            "--style",
            "jacket.png",
            "--aspect-ratio",
            "1:1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn status_lists_slots_and_error() {
        let mut snapshot = empty_snapshot();
        snapshot.last_error = Some("Please upload both images before generating.".to_string());
        let lines = status_lines(&snapshot);
        assert_eq!(lines[0], "person: (none)");
        assert_eq!(lines[2], "aspect ratio: Original");
        assert_eq!(lines[3], "result: none");
        assert_eq!(
            lines[4],
            "error: Please upload both images before generating."
        );
    }

    #[test]
    fn palette_is_plain_off_terminal() {
        let plain = Palette::with_colors(Theme::Dark, false);
        assert_eq!(plain.accent("ready"), "ready");

        let colored = Palette::with_colors(Theme::Dark, true);
        assert_eq!(colored.error("oops"), "\x1b[91moops\x1b[0m");
    }

    #[test]
    fn image_command_without_path_asks_for_one() {
        let controller = SessionController::new(Box::new(FixedGenerator(Ok(None))));
        let mut session = session(&controller, Box::new(MemoryPreferenceStore::new()), ".".into());

        let (flow, output) = run_line(&mut session, "/person");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(output, "/person requires a path\n");
        assert!(controller.snapshot().person.is_none());
    }

    #[test]
    fn generate_then_download_falls_back_to_default_dir() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let controller =
            SessionController::new(Box::new(FixedGenerator(Ok(Some("Zm9v".to_string())))));
        let default_out = temp.path().join("out");
        let mut session = session(
            &controller,
            Box::new(MemoryPreferenceStore::new()),
            default_out.clone(),
        );

        let (_, output) = run_line(&mut session, "/download");
        assert_eq!(output, "Nothing to download yet.\n");

        let person = write_image(temp.path(), "person.jpg");
        let style = write_image(temp.path(), "style.png");
        run_line(&mut session, &format!("/person {person}"));
        run_line(&mut session, &format!("/style {style}"));
        run_line(&mut session, "/ratio 16:9");
        let (_, output) = run_line(&mut session, "/generate");
        assert!(output.starts_with("Generating (16:9 aspect ratio)..."));
        assert!(output.contains("Your creation is ready!"));

        let (_, output) = run_line(&mut session, "/download");
        let saved = default_out.join("BanaO_generated_image.png");
        assert_eq!(output, format!("Saved {}\n", saved.display()));
        assert_eq!(fs::read(saved)?, b"foo");
        Ok(())
    }

    #[test]
    fn generate_reports_missing_input_and_api_failure() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let controller =
            SessionController::new(Box::new(FixedGenerator(Err(ApiError::new("boom")))));
        let mut session = session(&controller, Box::new(MemoryPreferenceStore::new()), ".".into());

        let (_, output) = run_line(&mut session, "/generate");
        assert_eq!(
            output,
            "Oops! Please upload both images before generating.\n"
        );

        let person = write_image(temp.path(), "person.jpg");
        let style = write_image(temp.path(), "style.png");
        run_line(&mut session, &format!("/person {person}"));
        run_line(&mut session, &format!("/style {style}"));
        let (_, output) = run_line(&mut session, "/generate");
        assert!(output.ends_with(
            "Oops! Generation failed: Failed to generate image due to an API error.\n"
        ));
        Ok(())
    }

    #[test]
    fn theme_toggle_that_cannot_persist_still_applies() {
        let controller = SessionController::new(Box::new(FixedGenerator(Ok(None))));
        let mut session = session(&controller, Box::new(ReadOnlyStore), ".".into());

        let (flow, output) = run_line(&mut session, "/theme");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(output, "Theme set to dark (not saved)\n");
        assert_eq!(session.theme.theme(), Theme::Dark);
    }

    #[test]
    fn bad_ratio_and_unknown_command_keep_session_running() {
        let controller = SessionController::new(Box::new(FixedGenerator(Ok(None))));
        let mut session = session(&controller, Box::new(MemoryPreferenceStore::new()), ".".into());

        let (_, output) = run_line(&mut session, "/ratio 1:1");
        assert!(output.starts_with("unsupported aspect ratio '1:1'"));
        assert_eq!(controller.aspect_ratio(), AspectRatio::Original);

        let (flow, output) = run_line(&mut session, "/nope");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(output, "Unknown command: /nope. Type /help.\n");

        assert_eq!(run_line(&mut session, "/quit").0, Flow::Quit);
    }
}
