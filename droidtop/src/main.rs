//! Entry point for the droidtop TUI. Parses args, resolves the profile and runs the App.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

use droidtop::app::App;
use droidtop::layout::{FileStore, LayoutStore};
use droidtop::profiles::{
    load_profiles, log_path, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
};
use droidtop::session::SessionController;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "[--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] [--dry-run] \
[--device ID|-d ID] [--package PKG|-p PKG] [ws://HOST:PORT/ws]";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    device: Option<String>,
    package: Option<String>,
    save: bool,
    dry_run: bool,
}

fn flag_value(arg: &str, long: &str) -> Option<String> {
    arg.strip_prefix(long)
        .and_then(|rest| rest.strip_prefix('='))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "droidtop".into());
    let mut p = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(format!("Usage: {prog} {USAGE}")),
            "--tls-ca" | "-t" => p.tls_ca = it.next(),
            "--profile" | "-P" => p.profile = it.next(),
            "--device" | "-d" => p.device = it.next(),
            "--package" | "-p" => p.package = it.next(),
            "--save" => p.save = true,
            "--dry-run" => p.dry_run = true,
            _ if arg.starts_with("--tls-ca=") => p.tls_ca = flag_value(&arg, "--tls-ca"),
            _ if arg.starts_with("--profile=") => p.profile = flag_value(&arg, "--profile"),
            _ if arg.starts_with("--device=") => p.device = flag_value(&arg, "--device"),
            _ if arg.starts_with("--package=") => p.package = flag_value(&arg, "--package"),
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'. Usage: {prog} {USAGE}"))
            }
            _ if p.url.is_none() => p.url = Some(arg),
            _ => return Err(format!("Unexpected argument. Usage: {prog} {USAGE}")),
        }
    }
    Ok(p)
}

// The TUI owns the terminal, so logs go to a file. Best effort: no file, no logs.
fn init_logging() {
    let path = log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("DROIDTOP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    init_logging();

    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
        device: parsed.device.clone(),
        package: parsed.package.clone(),
    };

    let mut profiles_mut = profiles_file.clone();
    let entry: ProfileEntry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                let overwrite = match profiles_mut.profiles.get(name) {
                    // New profile: auto-save immediately
                    None => true,
                    Some(existing) if *existing == entry => false,
                    Some(_) => {
                        parsed.save
                            || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
                    }
                };
                if overwrite {
                    profiles_mut.profiles.insert(name.clone(), entry.clone());
                    if let Err(e) = save_profiles(&profiles_mut) {
                        tracing::warn!(error = %e, "failed to save profiles");
                    }
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| (1..=names.len()).contains(idx))
                .and_then(|idx| profiles_mut.profiles.get(&names[idx - 1]).cloned());
            match picked {
                Some(entry) => entry,
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (ws://HOST:PORT/ws or wss://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                tls_ca: Some(ca.trim().to_string()).filter(|c| !c.is_empty()),
                device: parsed.device.clone(),
                package: parsed.package.clone(),
            };
            profiles_mut.profiles.insert(name, entry.clone());
            if let Err(e) = save_profiles(&profiles_mut) {
                tracing::warn!(error = %e, "failed to save profiles");
            }
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    if parsed.dry_run {
        println!("would connect to {}", entry.url);
        return Ok(());
    }

    tracing::info!(url = %entry.url, "starting droidtop");
    let ctl = SessionController::new().with_preselection(entry.device.clone(), entry.package.clone());
    let store = LayoutStore::new(FileStore::new(FileStore::default_path()));
    let mut app = App::new(ctl, store);
    app.run(&entry.url, entry.tls_ca.as_deref()).await
}

fn prompt_yes_no(prompt: &str) -> bool {
    match prompt_string(prompt) {
        Ok(line) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
