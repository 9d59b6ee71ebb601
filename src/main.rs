use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use log::{debug, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::runtime::Runtime;

use cloudflare_dns_manager::config::{Settings, UiKind};
use cloudflare_dns_manager::controller::AppController;
use cloudflare_dns_manager::credentials::CredentialStore;
use cloudflare_dns_manager::dispatcher::Dispatcher;
use cloudflare_dns_manager::frontend::tui::{spawn_input_thread, TuiFrontend};
use cloudflare_dns_manager::menu::Menu;
use cloudflare_dns_manager::public_ip::{default_mirrors, PublicIpResolver};

#[derive(Parser, Debug)]
#[command(name = "cloudflare-dns-manager", version, about = "Manage Cloudflare DNS records from the terminal")]
struct Cli {
    /// Front-end to start; overrides the `ui` setting.
    #[arg(long, value_enum)]
    ui: Option<UiKind>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let ui = match cli.ui {
        Some(ui) => ui,
        None => settings.ui()?,
    };

    // Log lines would tear up the alternate screen.
    let level = if ui == UiKind::Tui && io::stderr().is_terminal() {
        LevelFilter::Off
    } else {
        settings.log_level()
    };
    let mut logger = SimpleLogger::new().with_level(level);
    if level != LevelFilter::Off {
        logger = logger.env();
    }
    logger.with_utc_timestamps().with_colors(true).init()?;
    debug!("Initialized logging.");

    let runtime = Runtime::new()?;
    let store = CredentialStore::open_default()?;
    debug!("Credentials file: {}", store.path().display());

    match ui {
        UiKind::Tui => run_tui(&runtime, &store, &settings),
        UiKind::Menu => run_menu(&runtime, &store, &settings),
    }
}

fn resolver(settings: &Settings) -> PublicIpResolver {
    PublicIpResolver::new(default_mirrors(), settings.ip_lookup_timeout())
}

fn run_tui(runtime: &Runtime, store: &CredentialStore, settings: &Settings) -> Result<()> {
    let (dispatcher, events) = Dispatcher::new(runtime.handle().clone());
    let frontend = TuiFrontend::new()?;
    spawn_input_thread(dispatcher.sender());

    let mut controller = AppController::new(
        frontend,
        store,
        settings.client_options(),
        resolver(settings),
        dispatcher,
    );
    let result = controller.run(&events);
    let restored = controller.frontend_mut().restore();

    result.and(restored)
}

fn run_menu(runtime: &Runtime, store: &CredentialStore, settings: &Settings) -> Result<()> {
    let stdin = io::stdin();
    let mut menu = Menu::new(
        stdin.lock(),
        io::stdout(),
        runtime,
        store,
        settings.client_options(),
        resolver(settings),
    );
    menu.run()
}
