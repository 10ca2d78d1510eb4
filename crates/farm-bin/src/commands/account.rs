//! Session and account commands.

use super::{prompt, prompt_password, FarmArgs};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use farm_api::{FarmApi, FarmUpdate, RegisterRequest, Registration};
use serde_json::json;

/// Log in with email and password.
pub async fn login(api: &FarmApi, email: Option<String>, format: &OutputFormat) -> Result<()> {
    if api.session().is_authenticated() {
        output::print_success("Already logged in", format);
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }

    let password = prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    api.login(&email, &password).await?;
    output::print_success(&format!("Logged in as {}", email), format);
    Ok(())
}

/// Create an account and log in to it.
pub async fn register(
    api: &FarmApi,
    email: String,
    first_name: String,
    last_name: String,
    format: &OutputFormat,
) -> Result<()> {
    let password = prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let registration = api
        .register(&RegisterRequest {
            email: email.clone(),
            password,
            first_name,
            last_name,
        })
        .await?;

    let message = match registration {
        Registration::SignedIn(_) => format!(
            "Account created for {}. Run 'farmstead onboard' to add your farm details",
            email
        ),
        Registration::AccountCreated => format!(
            "Account created for {}. Log in with 'farmstead login' to continue",
            email
        ),
    };
    output::print_success(&message, format);
    Ok(())
}

/// Clear the stored session.
pub fn logout(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    let was_authenticated = api.session().is_authenticated();
    api.logout()?;
    if was_authenticated {
        output::print_success("Logged out", format);
    } else {
        output::print_success("Not logged in", format);
    }
    Ok(())
}

/// Show the local session state. Makes no network calls.
pub fn status(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    let session = api.session().snapshot();
    let report = json!({
        "logged_in": session.is_authenticated(),
        "onboarding_pending": session.is_authenticated() && session.is_new_user,
        "has_refresh_token": session.refresh_token.is_some(),
    });

    output::print(&report, format, |_| {
        output::print_heading("Session");
        output::print_row(
            "Logged in",
            if session.is_authenticated() { "yes" } else { "no" },
        );
        if session.is_authenticated() && session.is_new_user {
            output::print_row("Onboarding", "pending (run 'farmstead onboard')");
        }
        if session.is_authenticated() && session.refresh_token.is_none() {
            output::print_row("Warning", "no refresh token; you will need to log in again soon");
        }
    });
    Ok(())
}

/// Save farm details and finish onboarding.
pub async fn onboard(
    api: &FarmApi,
    farm_id: Option<u64>,
    farm: FarmArgs,
    format: &OutputFormat,
) -> Result<()> {
    let update = FarmUpdate::from(farm);
    if update.is_empty() {
        bail!("Provide at least one farm detail, for example --name");
    }

    let farm_id = match farm_id {
        Some(id) => id,
        None => match api.user_profile().await?.farm {
            Some(id) => id,
            None => bail!("Your profile has no farm yet; pass --farm-id"),
        },
    };

    let farm = api.finish_onboarding(farm_id, &update).await?;
    output::print(&farm, format, |farm| {
        println!(
            "Saved farm {}. You're all set",
            farm.farm_name.as_deref().unwrap_or("details")
        );
    });
    Ok(())
}

/// Request a password reset email.
pub async fn forgot_password(api: &FarmApi, email: &str, format: &OutputFormat) -> Result<()> {
    api.forgot_password(email).await?;
    output::print_success(
        &format!("If an account exists for {}, a reset link is on its way", email),
        format,
    );
    Ok(())
}

/// Change the signed-in user's password.
pub async fn change_password(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    if !api.session().is_authenticated() {
        bail!("Not logged in. Run 'farmstead login' first");
    }

    let old_password = prompt_password("Current password: ")?;
    let new_password = prompt_password("New password: ")?;
    if new_password.is_empty() {
        bail!("New password is required");
    }
    let confirm = prompt_password("Confirm new password: ")?;
    if new_password != confirm {
        bail!("Passwords do not match");
    }

    api.change_password(&old_password, &new_password).await?;
    output::print_success("Password changed", format);
    Ok(())
}
