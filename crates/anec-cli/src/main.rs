//! `anect`: convert compiled ANE programs into ANEC artifacts.
//!
//! ```text
//! USAGE:
//!   anect convert <model.hwx>        Write <name>.anec into the output directory
//!   anect convert -p -d <model.hwx>  Print the layout, write nothing
//!   anect inspect <name.anec>        Decode an artifact header
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anec_convert::{
    name_from_path, read_blob, render, sanitize_name, serialize, OutputArtifact,
    ProgramLayout,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anect", about = "HWX to ANEC converter", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Recover the layout of a compiled model and write the artifact.
    Convert(ConvertArgs),
    /// Print the header of a written artifact.
    Inspect {
        /// Artifact (.anec).
        path: PathBuf,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Compiled model (.hwx).
    path: PathBuf,
    /// Model name (default: input file stem).
    #[arg(short, long)]
    name: Option<String>,
    /// Output directory.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
    /// Bypass the unresolved CPU layer check.
    #[arg(short, long)]
    force: bool,
    /// Print the ane_model struct.
    #[arg(short, long)]
    print: bool,
    /// Don't write anything.
    #[arg(short, long)]
    dry: bool,
    /// Also write anec_<name>.h.
    #[arg(long)]
    header: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Convert(args) => cmd_convert(&args)?,
        Cmd::Inspect { path } => cmd_inspect(&path)?,
    }

    Ok(())
}

fn cmd_convert(args: &ConvertArgs) -> Result<()> {
    let path = args.path.as_path();
    let name = args
        .name
        .as_deref()
        .map_or_else(|| name_from_path(path), sanitize_name);
    info!("using name: {name}");

    let blob = read_blob(path)?;
    let layout = ProgramLayout::from_input(path, &blob, args.force)?;

    if args.print {
        print!("{}", render::render_struct(&layout, &name));
    }
    if args.dry {
        return Ok(());
    }

    let artifact = serialize(&layout, &blob)?;
    let anec_path = args.out.join(format!("{name}.anec"));
    let file = File::create(&anec_path)
        .with_context(|| format!("creating {}", anec_path.display()))?;
    artifact.write_to(BufWriter::new(file))?;
    info!("wrote {} ({} bytes)", anec_path.display(), artifact.len());

    if args.header {
        let hdr_path = args.out.join(format!("anec_{name}.h"));
        fs::write(&hdr_path, render::render_header(&layout, &name))
            .with_context(|| format!("writing {}", hdr_path.display()))?;
        info!("wrote {}", hdr_path.display());
    }

    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (h, body) = OutputArtifact::parse(&data)?;

    println!("Artifact     : {}", path.display());
    println!("Size         : 0x{:x} (body 0x{:x} bytes)", h.total_size, body.len());
    println!("Descriptors  : {} x 0x{:x}", h.td_count, h.td_size);
    println!("Task         : 0x{:x}", h.tsk_size);
    println!("Kernel       : 0x{:x}", h.krn_size);
    println!("Inputs       : {}", h.src_count);
    println!("Outputs      : {}", h.dst_count);

    for (slot, &tiles) in h.tiles.iter().enumerate() {
        if tiles == 0 {
            continue;
        }
        let [n, c, hh, w, rs, ps] = h.nchw[slot];
        if n == 0 {
            println!("  slot {slot:2}  {tiles:5} tile(s)");
        } else {
            println!(
                "  slot {slot:2}  {tiles:5} tile(s)  ({n}, {c}, {hh}, {w})  rS 0x{rs:x}  pS 0x{ps:x}"
            );
        }
    }

    Ok(())
}
