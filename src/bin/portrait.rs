use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use portrait_maker::{
    AppConfig, EditorSession, FaceCenter, ProjectId, Quality, RenderParameters, SlotStatus,
    StateKey, TrashReceipt,
    config::default_config_path,
    diagnostics,
    render::ExportThreading,
    segment::CancelFlag,
};

#[derive(Parser, Debug)]
#[command(name = "portrait", version, about = "Manage character portrait projects")]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project pool root, overriding the configuration.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every slot of the pool.
    List,
    /// Create a project in the lowest free slot.
    New {
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Import an image as the source of one state.
    Import {
        #[arg(long)]
        slot: usize,
        #[arg(long, value_parser = parse_state)]
        state: StateKey,
        #[arg(long)]
        file: PathBuf,
    },
    /// Change render parameters.
    Set(SetArgs),
    /// Detach a state from the defaults, or rejoin it (which resets it).
    Individual {
        #[arg(long)]
        slot: usize,
        #[arg(long, value_parser = parse_state)]
        state: StateKey,
        #[arg(long, conflicts_with = "off", required_unless_present = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
        /// Confirm resetting the state's parameters when rejoining.
        #[arg(long)]
        yes: bool,
    },
    /// Set or clear the face centre of a state, or of the project with no --state.
    Center {
        #[arg(long)]
        slot: usize,
        #[arg(long, value_parser = parse_state)]
        state: Option<StateKey>,
        #[arg(long, requires = "y", conflicts_with = "clear")]
        x: Option<i32>,
        #[arg(long, requires = "x", conflicts_with = "clear")]
        y: Option<i32>,
        #[arg(long)]
        clear: bool,
    },
    /// Select the frame overlay applied on export (empty clears it).
    Frame {
        #[arg(long)]
        slot: usize,
        #[arg(long, default_value = "")]
        id: String,
    },
    /// Write a preview PNG of one state.
    Preview {
        #[arg(long)]
        slot: usize,
        #[arg(long, value_parser = parse_state)]
        state: StateKey,
        #[arg(long)]
        out: PathBuf,
        /// Use the fast resampling filter.
        #[arg(long)]
        fast: bool,
        /// Draw the face-centre marker.
        #[arg(long)]
        marker: bool,
    },
    /// Save the record and export every state.
    Export {
        #[arg(long)]
        slot: usize,
        /// Render states one after another.
        #[arg(long)]
        serial: bool,
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Move a project to the trash.
    Delete {
        #[arg(long)]
        slot: usize,
    },
    /// Move a trashed project back into its slot.
    Restore {
        #[arg(long)]
        slot: usize,
        /// Directory under the pool's trash.
        #[arg(long)]
        trashed: PathBuf,
    },
    /// Download the background-removal model.
    FetchModel,
}

#[derive(Args, Debug)]
struct SetArgs {
    #[arg(long)]
    slot: usize,
    /// State to edit; edits the defaults when omitted.
    #[arg(long, value_parser = parse_state)]
    state: Option<StateKey>,
    /// Write the template and every tracking state.
    #[arg(long, conflicts_with = "local")]
    global: bool,
    /// Write only this state, even if it tracks the defaults.
    #[arg(long, requires = "state")]
    local: bool,
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    offset_x: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    offset_y: Option<i32>,
    #[arg(long)]
    rembg: Option<bool>,
    #[arg(long)]
    matting: Option<bool>,
    #[arg(long)]
    fg_threshold: Option<u8>,
    #[arg(long)]
    bg_threshold: Option<u8>,
    #[arg(long)]
    erode_size: Option<u32>,
    #[arg(long)]
    icon_scale_a: Option<f32>,
    #[arg(long)]
    icon_scale_b: Option<f32>,
}

impl SetArgs {
    fn apply_to(&self, mut p: RenderParameters) -> RenderParameters {
        if let Some(v) = self.scale {
            p.scale = v;
        }
        if let Some(v) = self.offset_x {
            p.offset_x = v;
        }
        if let Some(v) = self.offset_y {
            p.offset_y = v;
        }
        if let Some(v) = self.rembg {
            p.use_rembg = v;
        }
        if let Some(v) = self.matting {
            p.alpha_matting = v;
        }
        if let Some(v) = self.fg_threshold {
            p.alpha_matting_fg_threshold = v;
        }
        if let Some(v) = self.bg_threshold {
            p.alpha_matting_bg_threshold = v;
        }
        if let Some(v) = self.erode_size {
            p.alpha_matting_erode_size = v;
        }
        if let Some(v) = self.icon_scale_a {
            p.icon_scale_a = v;
        }
        if let Some(v) = self.icon_scale_b {
            p.icon_scale_b = v;
        }
        p
    }
}

fn parse_state(s: &str) -> Result<StateKey, String> {
    s.parse().map_err(|e: portrait_maker::PortraitError| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    diagnostics::init(&cli.log, Vec::new());

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => default_config_path().context("cannot determine configuration directory")?,
    };
    let mut config = AppConfig::load_or_init(&config_path);
    if let Some(root) = &cli.root {
        config.pool_root = Some(root.clone());
    }

    if let Command::FetchModel = cli.cmd {
        return cmd_fetch_model(&config);
    }

    let mut session = EditorSession::open(&config).context("open project pool")?;
    match cli.cmd {
        Command::List => cmd_list(&session),
        Command::New { name } => {
            let id = session.create_project(&name)?;
            let p = session.project(id)?;
            println!("{}\t{}", p.slot_name(), id);
            Ok(())
        }
        Command::Import { slot, state, file } => {
            let id = slot_project(&session, slot)?;
            let source = session.import_source(id, state, &file)?;
            session.repository().save(session.project(id)?)?;
            println!("{state}\t{source}");
            Ok(())
        }
        Command::Set(args) => cmd_set(&mut session, &args),
        Command::Individual {
            slot,
            state,
            on,
            off: _,
            yes,
        } => {
            let id = slot_project(&session, slot)?;
            let change = session.set_individual(id, state, on, |_, _| yes)?;
            session.repository().save(session.project(id)?)?;
            println!("{change:?}");
            Ok(())
        }
        Command::Center {
            slot,
            state,
            x,
            y,
            clear,
        } => {
            let id = slot_project(&session, slot)?;
            let center = match (x, y, clear) {
                (Some(x), Some(y), false) => Some(FaceCenter::new(x, y)),
                (_, _, true) => None,
                _ => anyhow::bail!("pass --x and --y, or --clear"),
            };
            session.set_face_center(id, state, center)?;
            session.repository().save(session.project(id)?)?;
            Ok(())
        }
        Command::Frame { slot, id: frame } => {
            let id = slot_project(&session, slot)?;
            session.set_frame(id, Some(frame))?;
            session.repository().save(session.project(id)?)?;
            Ok(())
        }
        Command::Preview {
            slot,
            state,
            out,
            fast,
            marker,
        } => {
            let id = slot_project(&session, slot)?;
            let quality = if fast { Quality::Fast } else { Quality::Full };
            let img = session
                .preview(id, state, quality, marker)?
                .with_context(|| format!("state '{state}' has no image"))?;
            write_png(&out, &img)?;
            eprintln!("wrote {}", out.display());
            Ok(())
        }
        Command::Export {
            slot,
            serial,
            threads,
        } => {
            let id = slot_project(&session, slot)?;
            session.set_export_threading(ExportThreading {
                parallel: !serial,
                threads,
            });
            let report = session.save(id)?;
            for path in &report.written {
                eprintln!("wrote {}", path.display());
            }
            for (state, err) in &report.failures {
                eprintln!("failed {state}: {err}");
            }
            if !report.is_success() {
                anyhow::bail!("{} state(s) failed to export", report.failures.len());
            }
            Ok(())
        }
        Command::Delete { slot } => {
            let id = slot_project(&session, slot)?;
            let project = session.project(id)?.clone();
            let receipt = session.repository().delete(&project)?;
            println!("{}", receipt.trashed.display());
            Ok(())
        }
        Command::Restore { slot, trashed } => {
            let receipt = TrashReceipt {
                original: session.repository().slot_path(slot),
                trashed,
            };
            let p = session.repository().restore(&receipt)?;
            println!("{}\t{}", p.slot_name(), p.id());
            Ok(())
        }
        Command::FetchModel => cmd_fetch_model(&config),
    }
}

fn slot_project(session: &EditorSession, slot: usize) -> anyhow::Result<ProjectId> {
    session
        .project_in_slot(slot)
        .map(|p| p.id())
        .with_context(|| format!("slot {slot} holds no project"))
}

fn cmd_list(session: &EditorSession) -> anyhow::Result<()> {
    let repo = session.repository();
    for entry in repo.list()? {
        match &entry.status {
            SlotStatus::Empty => continue,
            SlotStatus::Unmanaged => println!("face{}\t(unmanaged)", entry.index),
            SlotStatus::Managed(p) => {
                let states = p.record.states_with_source().count();
                println!(
                    "face{}\t{}\t{}\t{states} state(s)",
                    entry.index,
                    p.id(),
                    p.record.display_name
                );
            }
        }
    }
    Ok(())
}

fn cmd_set(session: &mut EditorSession, args: &SetArgs) -> anyhow::Result<()> {
    let id = slot_project(session, args.slot)?;
    let record = &session.project(id)?.record;
    let current = match args.state {
        Some(state) => record.state_or_default(state).params,
        None => record.defaults.clone(),
    };
    let params = args.apply_to(current);

    match (args.state, args.global, args.local) {
        (Some(state), false, true) => session.set_local_params(id, state, params)?,
        (Some(state), false, false) => session.edit_params(id, state, params)?,
        _ => session.set_global_params(id, params)?,
    }
    session.repository().save(session.project(id)?)?;
    Ok(())
}

fn cmd_fetch_model(config: &AppConfig) -> anyhow::Result<()> {
    let asset = config.model_asset()?;
    if asset.is_installed() {
        eprintln!("model already installed at {}", asset.path.display());
        return Ok(());
    }
    let mut last = -1i32;
    let outcome = asset.download(&CancelFlag::new(), |fraction| {
        let pct = (fraction * 100.0) as i32;
        if pct / 10 != last / 10 {
            eprintln!("{pct}%");
            last = pct;
        }
    })?;
    eprintln!("{outcome:?} -> {}", asset.path.display());
    Ok(())
}

fn write_png(path: &Path, img: &image::RgbaImage) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}
