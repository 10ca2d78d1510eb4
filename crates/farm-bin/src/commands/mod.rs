//! CLI command implementations.

mod account;
mod farm;

pub use account::{change_password, forgot_password, login, logout, onboard, register, status};
pub use farm::{categories, livestock_list, livestock_show, products, profile};

use anyhow::Result;
use clap::Args;
use farm_api::FarmUpdate;
use std::io::{self, Write};

/// Farm details accepted by `onboard`.
#[derive(Args, Debug, Default)]
pub struct FarmArgs {
    /// Farm name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state_province: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
}

impl From<FarmArgs> for FarmUpdate {
    fn from(args: FarmArgs) -> Self {
        FarmUpdate {
            farm_name: args.name,
            farm_email: args.email,
            farm_website: args.website,
            farm_phone_number: args.phone,
            farm_address: args.address,
            farm_city: args.city,
            farm_state_province: args.state_province,
            farm_country: args.country,
            farm_postal_code: args.postal_code,
        }
    }
}

/// Read one trimmed line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Read a password without echoing it.
fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}
