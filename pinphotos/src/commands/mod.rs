//! CLI command handlers
//!
//! This module organizes commands into logical submodules:
//! - `pins`: Pin lifecycle
//! - `photos`: Collection sync, listing and image access
//! - `settings`: Application settings

pub mod photos;
pub mod pins;
pub mod settings;

use crate::app::AppState;
use crate::cli::Commands;
use crate::error::Result;

/// Run one command against an initialized application
pub async fn execute(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::AddPin {
            latitude,
            longitude,
        } => pins::add_pin(state, latitude, longitude).await,
        Commands::Pins => pins::list_pins(state).await,
        Commands::Rename { pin_id, name } => pins::rename_pin(state, &pin_id, &name).await,
        Commands::DeletePin { pin_id } => pins::delete_pin(state, &pin_id).await,
        Commands::ResetPages { pin_id } => pins::reset_pages(state, &pin_id).await,
        Commands::Sync {
            pin_id,
            skip_images,
        } => photos::sync(state, &pin_id, skip_images).await,
        Commands::Open { pin_id } => photos::open(state, &pin_id).await,
        Commands::Photos { pin_id } => photos::list_photos(state, &pin_id).await,
        Commands::SaveImage { photo_id, output } => {
            photos::save_image(state, &photo_id, &output).await
        }
        Commands::DeletePhoto { photo_id } => photos::delete_photo(state, &photo_id).await,
        Commands::Prune => photos::prune(state).await,
        Commands::SetApiKey { api_key } => settings::set_api_key(state, &api_key).await,
    }
}
