//! Farmstead CLI - manage your farm from the terminal.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farm_api::FarmApi;
use farm_auth::AuthError;
use farm_config_and_utils::{init_logging, Config, Paths};
use tracing::{debug, warn};

/// Farmstead command-line interface.
#[derive(Parser)]
#[command(name = "farmstead")]
#[command(about = "Farmstead client for farm, livestock and inventory management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Also write logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base directory for config, session and logs. Defaults to ~/.farmstead
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the session state
    Status,

    /// Enter your farm details to finish setting up a new account
    Onboard {
        /// Farm to update. Defaults to the farm on your profile
        #[arg(long)]
        farm_id: Option<u64>,
        #[command(flatten)]
        farm: commands::FarmArgs,
    },

    /// Show your profile and farm
    Profile,

    /// Browse livestock
    Livestock {
        #[command(subcommand)]
        command: LivestockCommands,
    },

    /// List inventory products
    Products,

    /// List inventory categories
    Categories,

    /// Send a password reset email
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },

    /// Change your password
    ChangePassword,
}

#[derive(Subcommand)]
enum LivestockCommands {
    /// List animals, one page at a time
    List {
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Show one animal
    Show {
        /// Livestock ID
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &paths, cli.verbose);

    let api = FarmApi::from_config(&config, &paths)?;
    let session = api.bootstrap();
    debug!(
        authenticated = session.is_authenticated(),
        new_user = session.is_new_user,
        "Session restored"
    );

    let format = cli.format;
    let result = match cli.command {
        Commands::Login { email } => commands::login(&api, email, &format).await,
        Commands::Register {
            email,
            first_name,
            last_name,
        } => commands::register(&api, email, first_name, last_name, &format).await,
        Commands::Logout => commands::logout(&api, &format),
        Commands::Status => commands::status(&api, &format),
        Commands::Onboard { farm_id, farm } => {
            commands::onboard(&api, farm_id, farm, &format).await
        }
        Commands::Profile => commands::profile(&api, &format).await,
        Commands::Livestock { command } => match command {
            LivestockCommands::List { page } => {
                commands::livestock_list(&api, page, &format).await
            }
            LivestockCommands::Show { id } => commands::livestock_show(&api, id, &format).await,
        },
        Commands::Products => commands::products(&api, &format).await,
        Commands::Categories => commands::categories(&api, &format).await,
        Commands::ForgotPassword { email } => {
            commands::forgot_password(&api, &email, &format).await
        }
        Commands::ChangePassword => commands::change_password(&api, &format).await,
    };

    if let Err(e) = result {
        // A 401 that survived the refresh means the session is gone for good.
        if e
            .downcast_ref::<AuthError>()
            .is_some_and(AuthError::requires_sign_in)
        {
            if let Err(e) = api.logout() {
                warn!(error = %e, "Failed to clear expired session");
            }
            output::print_error(
                "Your session has expired. Please log in again with 'farmstead login'",
                &format,
            );
            std::process::exit(1);
        }
        return Err(e.into());
    }

    Ok(())
}
