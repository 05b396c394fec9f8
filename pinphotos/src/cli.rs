//! Command line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pinphotos",
    about = "Map pins with locally cached photo collections",
    long_about = "pinphotos - Keep a small random photo collection for each place you pin

WORKFLOW:
  1. Set your photo search API key (or export PINPHOTOS_API_KEY)
  2. Add a pin by latitude and longitude
  3. Sync it to download a fresh random collection

QUICK START:
  pinphotos set-api-key <KEY>
  pinphotos add-pin 37.77 -122.42
  pinphotos sync <PIN_ID>
  pinphotos photos <PIN_ID>",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the database, images and settings
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Place a new pin
    AddPin {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// List pins
    #[command(aliases = &["ls"])]
    Pins,

    /// Rename a pin
    Rename { pin_id: String, name: String },

    /// Replace a pin's collection with a new random one and download its images
    Sync {
        pin_id: String,
        /// Only record the new collection. Images are fetched later by `open` or `save-image`.
        #[arg(long)]
        skip_images: bool,
    },

    /// Show a pin's collection, syncing first if it is empty
    Open { pin_id: String },

    /// List a pin's photos
    Photos { pin_id: String },

    /// Write a photo's image to a file
    SaveImage { photo_id: String, output: PathBuf },

    /// Delete one photo
    DeletePhoto { photo_id: String },

    /// Delete a pin with all its photos
    #[command(aliases = &["rm"])]
    DeletePin { pin_id: String },

    /// Let the next sync look up the pin's page count again
    ResetPages { pin_id: String },

    /// Remove cached images no photo refers to
    Prune,

    /// Store the photo search API key
    SetApiKey { api_key: String },
}

/// Data directory from the flag, or the platform data directory
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> Option<PathBuf> {
    data_dir.or_else(|| dirs::data_dir().map(|dir| dir.join("pinphotos")))
}
