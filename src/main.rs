// GUI-subsystem binary: no console window is ever allocated by Windows.
// In snapshot mode (--snapshot) we attach to the launching terminal so that
// println!/eprintln! reach it despite SUBSYSTEM:WINDOWS.
#![windows_subsystem = "windows"]

use std::process::ExitCode;

use clap::Parser;
use eframe::egui;
use placefe::app::PlaceFEApp;
use placefe::cli::{self, CliArgs};
use placefe::remote::AccountId;
use placefe::session::CanvasSession;
use placefe::settings::AppSettings;
use placefe::{log_err, log_info, logger};

fn main() -> ExitCode {
    // -- Windows console management ------------------------------------
    #[cfg(target_os = "windows")]
    if CliArgs::is_cli_mode() {
        unsafe extern "system" {
            fn AttachConsole(dwProcessId: u32) -> i32;
        }
        const ATTACH_PARENT_PROCESS: u32 = 0xFFFF_FFFF;
        unsafe {
            AttachConsole(ATTACH_PARENT_PROCESS);
        }
    }

    // -- CLI / headless snapshot mode ----------------------------------
    if CliArgs::is_cli_mode() {
        let args = CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode -------------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    let settings = {
        let mut s = AppSettings::load();
        if let Some(server) = &args.server {
            s.server_url = server.clone();
        }
        if let Some(account) = &args.account {
            s.account = account.clone();
        }
        s
    };

    let account = if !settings.account.is_empty() {
        Some(AccountId(settings.account.clone()))
    } else if args.offline {
        // The simulator needs some identity to settle commits against.
        Some(AccountId("offline-artist".to_string()))
    } else {
        None
    };

    let source = cli::build_source(&args, &settings);
    log_info!(
        "connecting to {}",
        if args.offline {
            "offline simulator"
        } else {
            settings.server_url.as_str()
        }
    );

    let session = match CanvasSession::new(source, account) {
        Ok(session) => session,
        Err(e) => {
            log_err!("failed to start network runtime: {}", e);
            eprintln!("error: failed to start network runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("PlaceFE"),
        ..Default::default()
    };

    match eframe::run_native(
        "PlaceFE",
        options,
        Box::new(move |cc| Box::new(PlaceFEApp::new(cc, settings, session))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("window loop failed: {}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
