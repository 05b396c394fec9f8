//! Pin-related commands

use crate::app::AppState;
use crate::database::Pin;
use crate::error::Result;

/// Place a new pin
pub async fn add_pin(state: &AppState, latitude: f64, longitude: f64) -> Result<()> {
    let pin = state.pins_service.create_pin(latitude, longitude).await?;
    println!("{}", pin.id);
    Ok(())
}

/// List all pins
pub async fn list_pins(state: &AppState) -> Result<()> {
    for pin in state.sync_engine.pins().await? {
        println!("{}", describe(&pin));
    }
    Ok(())
}

pub async fn rename_pin(state: &AppState, pin_id: &str, name: &str) -> Result<()> {
    let pin = state.pins_service.rename_pin(pin_id, name).await?;
    println!("{}", describe(&pin));
    Ok(())
}

/// Delete a pin with its photos and cached images
pub async fn delete_pin(state: &AppState, pin_id: &str) -> Result<()> {
    let removed = state.sync_engine.delete_pin(pin_id).await?;
    println!("Deleted pin {} and {} photos", pin_id, removed);
    Ok(())
}

pub async fn reset_pages(state: &AppState, pin_id: &str) -> Result<()> {
    let pin = state.sync_engine.reset_page_ceiling(pin_id).await?;
    println!("{}", describe(&pin));
    Ok(())
}

fn describe(pin: &Pin) -> String {
    let total = pin
        .total_photos
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let pages = pin
        .total_pages
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{}  {}  photos available: {}  pages: {}{}",
        pin.id,
        pin.name,
        total,
        pages,
        if pin.is_downloading { "  (syncing)" } else { "" }
    )
}
