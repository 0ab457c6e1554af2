//! Cardshop CLI - a terminal front end for the card shop session.
//!
//! Restores the saved session, walks the application's routes through the
//! navigation guard and manages login state from the command line.

mod navigator;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cardshop_core::store::{CredentialBackend, CredentialStore, MemoryBackend};
use cardshop_core::{Config, LoginRequest, Registration, RouteTable, Router, SessionManager};
use navigator::TerminalNavigator;

const USAGE: &str = "\
Usage: cardshop [--ephemeral] <command>

Commands:
  open <path>                 Navigate to a route (/, /login, /profile, /admin)
  login [username]            Log in, prompting for the password
  logout                      Log out and forget the saved session
  whoami                      Show the logged-in user
  check                       Revalidate the saved session with the service
  register <username> [--email <e>] [--nickname <n>] [--phone <p>]
  routes                      List the application's routes";

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cardshop.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let ephemeral = take_flag(&mut args, "--ephemeral");

    let mut config = Config::load()?;
    let _log_guard = init_tracing(&config);
    info!(api = %config.api_base_url, storage = ?config.storage, "Cardshop starting");

    let backend: Arc<dyn CredentialBackend> = if ephemeral {
        Arc::new(MemoryBackend::new())
    } else {
        config.credential_backend()?
    };
    let store = CredentialStore::new(backend);
    let navigator = Arc::new(TerminalNavigator::new());
    let session = Arc::new(
        SessionManager::connect(
            &config.api_base_url,
            config.request_timeout(),
            store,
            navigator.clone(),
        )
        .context("Failed to set up the HTTP client")?,
    );
    session.restore();
    let router = Router::new(RouteTable::default(), session.clone(), navigator.clone());

    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "open" => {
            let path = rest.first().map(String::as_str).unwrap_or("/");
            let nav = router.navigate(path).await?;
            println!("{}  [{}]", nav.path, nav.title);
        }
        "login" => {
            let username = match rest.first() {
                Some(u) => u.clone(),
                None => prompt_username(config.last_username.as_deref())?,
            };
            let password =
                rpassword::prompt_password("Password: ").context("Failed to read password")?;

            let result = session.login(&LoginRequest::new(&username, password)).await;
            if !result.success {
                bail!("{}", result.message);
            }
            println!("Logged in as {}. {}", session.display_name(), result.message);

            config.last_username = Some(username);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
        }
        "logout" => {
            session.logout().await;
            println!("Logged out");
        }
        "whoami" => {
            if !session.is_logged_in() {
                println!("Not logged in");
                return Ok(());
            }
            // Stale data is still worth showing if the refresh fails
            session.refresh_profile().await;
            print_user(&session);
        }
        "check" => {
            if session.check_auth().await {
                println!("Session is valid");
            } else {
                println!("Session is not valid; please log in again");
            }
        }
        "register" => register(&session, rest).await?,
        "routes" => {
            for route in router.routes().routes() {
                let mut rules = Vec::new();
                if route.guest_only {
                    rules.push("guest");
                }
                if route.requires_auth {
                    rules.push("auth");
                }
                if route.requires_admin {
                    rules.push("admin");
                }
                println!("{:<10} {:<14} {}", route.path, route.display_title(), rules.join(","));
            }
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }

    info!("Cardshop shutting down");
    Ok(())
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

/// Pull `--name value` out of `args`.
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("{} needs a value", name);
            }
            let value = args.remove(i + 1);
            args.remove(i);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let entered = line.trim();

    match (entered.is_empty(), last) {
        (false, _) => Ok(entered.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("A username is required"),
    }
}

async fn register(session: &SessionManager, rest: &[String]) -> Result<()> {
    let mut args = rest.to_vec();
    let email = take_option(&mut args, "--email")?;
    let nickname = take_option(&mut args, "--nickname")?;
    let phone_number = take_option(&mut args, "--phone")?;
    let Some(username) = args.first().cloned() else {
        bail!("register needs a username\n\n{}", USAGE);
    };

    let password = rpassword::prompt_password("Choose a password: ")?;
    let confirm = rpassword::prompt_password("Repeat password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let result = session
        .register(&Registration {
            username,
            password,
            email,
            nickname,
            phone_number,
        })
        .await;
    if !result.success {
        bail!("{}", result.message);
    }
    if result.message.is_empty() {
        println!("Registered");
    } else {
        println!("{}", result.message);
    }
    Ok(())
}

fn print_user(session: &SessionManager) {
    let Some(user) = session.user() else {
        println!("Not logged in");
        return;
    };
    println!("{} ({})", session.display_name(), user.username);
    println!("  role:    {}", user.role);
    if let Some(ref email) = user.email {
        println!("  email:   {}", email);
    }
    if let Some(ref phone) = user.phone_number {
        println!("  phone:   {}", phone);
    }
    if let Some(last_login) = user.last_login_time {
        println!("  last login: {}", last_login.format("%Y-%m-%d %H:%M"));
    }
}
