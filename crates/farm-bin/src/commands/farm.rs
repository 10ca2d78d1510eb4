//! Profile, livestock and inventory commands.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use farm_api::{FarmApi, Livestock};
use serde_json::json;

/// Show the user profile and, when known, the farm.
pub async fn profile(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    let profile = api.user_profile().await?;
    let farm = match profile.farm {
        Some(id) => Some(api.farm_info(id).await?),
        None => None,
    };

    let report = json!({ "user": &profile, "farm": &farm });
    output::print(&report, format, |_| {
        output::print_heading("Profile");
        output::print_row("Name", &profile.full_name());
        output::print_row("Email", &profile.email);
        output::print_opt_row("Phone", profile.phone_number.as_deref());
        output::print_opt_row("Address", profile.address.as_deref());
        output::print_opt_row("City", profile.city.as_deref());
        output::print_opt_row("State/Province", profile.state_province.as_deref());
        output::print_opt_row("Country", profile.country.as_deref());
        output::print_opt_row("Postal code", profile.postal_code.as_deref());

        if let Some(farm) = &farm {
            output::print_heading("Farm");
            output::print_opt_row("Name", farm.farm_name.as_deref());
            output::print_opt_row("Email", farm.farm_email.as_deref());
            output::print_opt_row("Website", farm.farm_website.as_deref());
            output::print_opt_row("Phone", farm.farm_phone_number.as_deref());
            output::print_opt_row("Address", farm.farm_address.as_deref());
            output::print_opt_row("City", farm.farm_city.as_deref());
            output::print_opt_row("Country", farm.farm_country.as_deref());
        }
    });
    Ok(())
}

pub async fn livestock_list(api: &FarmApi, page: u32, format: &OutputFormat) -> Result<()> {
    let listing = api.livestock_list(page).await?;

    output::print(&listing, format, |listing| {
        if listing.results.is_empty() {
            println!("No livestock found");
            return;
        }
        println!(
            "{:<8} {:<12} {:<18} {:<16} {}",
            "ID", "TYPE", "BREED", "NAME", "HEALTH"
        );
        output::print_divider();
        for animal in &listing.results {
            println!(
                "{:<8} {:<12} {:<18} {:<16} {}",
                animal.id,
                animal.animal_type,
                animal.breed.as_deref().unwrap_or("-"),
                animal.name.as_deref().unwrap_or("-"),
                animal.health_status.as_deref().unwrap_or("-"),
            );
        }
        let page = page.max(1);
        println!("\nPage {} ({} animals total)", page, listing.count);
        if listing.has_next() {
            println!("Next: farmstead livestock list --page {}", page + 1);
        }
    });
    Ok(())
}

pub async fn livestock_show(api: &FarmApi, id: u64, format: &OutputFormat) -> Result<()> {
    let animal = api.livestock(id).await?;
    output::print(&animal, format, print_animal);
    Ok(())
}

fn print_animal(animal: &Livestock) {
    output::print_heading(animal.name.as_deref().unwrap_or(&animal.animal_type));
    output::print_row("ID", &animal.id.to_string());
    output::print_row("Type", &animal.animal_type);
    output::print_opt_row("Breed", animal.breed.as_deref());
    output::print_opt_row("Gender", animal.gender.as_deref());
    output::print_opt_row(
        "Born",
        animal.date_of_birth.map(|d| d.to_string()).as_deref(),
    );
    output::print_opt_row(
        "Weight",
        animal.current_weight.map(|w| format!("{} kg", w)).as_deref(),
    );
    output::print_opt_row(
        "Age",
        animal.current_age.map(|a| format!("{} months", a)).as_deref(),
    );
    output::print_opt_row("Status", animal.status.as_deref());
    output::print_opt_row("Health", animal.health_status.as_deref());
    output::print_opt_row("Acquired via", animal.acquisition_method.as_deref());
}

pub async fn products(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    let products = api.products().await?;

    output::print(&products, format, |products| {
        if products.is_empty() {
            println!("No products found");
            return;
        }
        println!("{:<8} {:<28} {:>10} {:>8}", "ID", "NAME", "PRICE", "STOCK");
        output::print_divider();
        for product in products {
            println!(
                "{:<8} {:<28} {:>10} {:>8}",
                product.id,
                product.name,
                product
                    .price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string()),
                product
                    .stock
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    });
    Ok(())
}

pub async fn categories(api: &FarmApi, format: &OutputFormat) -> Result<()> {
    let categories = api.categories().await?;

    output::print(&categories, format, |categories| {
        if categories.is_empty() {
            println!("No categories found");
            return;
        }
        for category in categories {
            println!("  {:<6} {}", category.id, category.name);
        }
    });
    Ok(())
}
