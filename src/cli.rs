// ============================================================================
// PlaceFE CLI — headless canvas snapshot via command-line arguments
// ============================================================================
//
// Usage examples:
//   placefe --snapshot canvas.png
//   placefe --snapshot canvas.png --server https://api.placefe.app --cell-px 4
//   placefe --snapshot out.jpg --offline -v
//
// No GUI is opened in snapshot mode. The canvas is hydrated with the same
// chunked wave protocol the GUI uses, then rasterized and written to the
// output file (format inferred from the extension by the image crate).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use crate::http::HttpGridSource;
use crate::hydrate;
use crate::palette::Palette;
use crate::remote::RemoteGridSource;
use crate::settings::AppSettings;
use crate::sim::SimGridSource;
use crate::snapshot;

/// PlaceFE — shared pixel-canvas client.
///
/// With `--snapshot` the canvas is fetched and rendered to an image file
/// without opening a window; otherwise the flags override the saved GUI
/// settings for this launch.
#[derive(Parser, Debug)]
#[command(
    name = "placefe",
    about = "Shared pixel-canvas client",
    long_about = "Pan, zoom and paint on a shared credit-metered pixel canvas.\n\n\
                  Headless example:\n  \
                  placefe --snapshot canvas.png --server https://api.placefe.app --cell-px 4"
)]
pub struct CliArgs {
    /// Render the canvas to this image file (PNG/JPEG) and exit — no GUI.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Grid service endpoint. Overrides the saved setting for this launch.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Account id used for credit balance and commits.
    #[arg(long, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Run against an in-process simulated canvas instead of a server.
    #[arg(long)]
    pub offline: bool,

    /// Output pixels per canvas cell in snapshot mode (1–64).
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub cell_px: u32,

    /// Print grid dimensions and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when the snapshot flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--snapshot")
    }
}

/// The remote source selected by flags + settings: the HTTP service, or the
/// in-process simulator for `--offline`.
pub fn build_source(args: &CliArgs, settings: &AppSettings) -> Arc<dyn RemoteGridSource> {
    if args.offline {
        Arc::new(SimGridSource::new(256, 256, 250))
    } else {
        let server = args.server.as_deref().unwrap_or(&settings.server_url);
        Arc::new(HttpGridSource::new(server))
    }
}

/// Run the headless snapshot and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let output = args.snapshot.clone().expect("routed on --snapshot");
    let cell_px = args.cell_px.clamp(1, 64);
    let settings = AppSettings::load();
    let source = build_source(&args, &settings);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: could not start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let (meta, cells) = match runtime.block_on(async {
        let meta = source.grid_metadata().await?;
        let cells = hydrate::fetch_all(source.as_ref(), meta.width, meta.height).await?;
        Ok::<_, crate::remote::RemoteError>((meta, cells))
    }) {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.verbose {
        println!(
            "fetched {}×{} canvas ({} cells) in {:.0}ms",
            meta.width,
            meta.height,
            cells.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    let palette = Palette::new();
    let img = snapshot::rasterize(&cells, meta.width, meta.height, &palette, cell_px);
    let (out_w, out_h) = img.dimensions();

    // JPEG has no alpha channel; flatten onto black for .jpg outputs.
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let saved = match ext.as_deref() {
        Some("jpg") | Some("jpeg") => image::DynamicImage::ImageRgba8(img).to_rgb8().save(&output),
        _ => img.save(&output),
    };
    if let Err(e) = saved {
        eprintln!("error: could not write '{}': {e}", output.display());
        return ExitCode::FAILURE;
    }

    if args.verbose {
        println!(
            "→ {} ({out_w}×{out_h}, {:.0}ms total)",
            output.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    } else {
        println!("→ {}", output.display());
    }
    ExitCode::SUCCESS
}
