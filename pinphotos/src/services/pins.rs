//! Pins service
//!
//! Pin lifecycle outside of syncing: placing a pin and naming it.

use crate::config::{LAT_MAX, LAT_MIN, LON_MAX, LON_MIN};
use crate::database::{CreatePinRequest, Pin, Repository};
use crate::error::{AppError, Result};
use crate::events::{Event, EventBus};

/// Service for managing pins
#[derive(Clone)]
pub struct PinsService {
    repo: Repository,
    events: EventBus,
}

impl PinsService {
    pub fn new(repo: Repository, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Place a new pin. Its collection stays empty until the first sync.
    pub async fn create_pin(&self, latitude: f64, longitude: f64) -> Result<Pin> {
        validate_coordinate(latitude, longitude)?;

        tracing::info!("Creating pin at [{},{}]", latitude, longitude);

        let pin = self
            .repo
            .create_pin(CreatePinRequest {
                latitude,
                longitude,
            })
            .await?;

        tracing::info!("Pin created successfully: {}", pin.id);

        Ok(pin)
    }

    /// Replace the coordinate name with a resolved place name
    pub async fn rename_pin(&self, id: &str, name: &str) -> Result<Pin> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Generic("Pin name cannot be empty".to_string()));
        }

        let pin = self.repo.rename_pin(id, name).await?;

        self.events.emit(Event::PinRenamed {
            pin_id: pin.id.clone(),
            name: pin.name.clone(),
        });

        Ok(pin)
    }
}

fn validate_coordinate(latitude: f64, longitude: f64) -> Result<()> {
    let valid = (LAT_MIN..=LAT_MAX).contains(&latitude) && (LON_MIN..=LON_MAX).contains(&longitude);

    if !valid {
        return Err(AppError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }
    Ok(())
}
