//! Settings-related commands

use crate::app::AppState;
use crate::error::Result;

/// Store the photo search API key. Takes effect on the next run.
pub async fn set_api_key(state: &AppState, api_key: &str) -> Result<()> {
    state.settings_service.update_api_key(api_key).await?;
    println!("API key saved");
    Ok(())
}
