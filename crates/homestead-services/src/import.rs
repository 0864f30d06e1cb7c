//! Property creation path shared by CSV import and external listing import.
//!
//! A property is always persisted first. Geocoding runs afterwards and only fills in
//! coordinates when a provider answers; it never turns a saved property into a failure.

use anyhow::Result;
use async_trait::async_trait;
use homestead_core::models::{Coordinates, ExternalListingRecord, GeocodeQuery, NewProperty};
use std::collections::HashMap;
use std::sync::Arc;

use crate::geocoding::GeocodingResolver;

/// Persistence seam for new properties.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Inserts the property and returns its id.
    async fn insert(&self, property: &NewProperty) -> Result<i64>;

    async fn set_coordinates(&self, id: i64, coordinates: Coordinates) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedProperty {
    pub id: i64,
    pub claim_token: String,
    pub coordinates: Option<Coordinates>,
    /// Coordinates came from the geocoder rather than the source record.
    pub geocoded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based position in the input.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: Vec<i64>,
    pub geocoded: usize,
    pub skipped: Vec<SkippedRow>,
}

pub struct ImportWorkflow {
    store: Arc<dyn PropertyStore>,
    geocoder: Arc<GeocodingResolver>,
}

impl ImportWorkflow {
    pub fn new(store: Arc<dyn PropertyStore>, geocoder: Arc<GeocodingResolver>) -> Self {
        Self { store, geocoder }
    }

    #[tracing::instrument(skip(self, property), fields(address = %property.address))]
    pub async fn create(&self, property: NewProperty) -> Result<CreatedProperty> {
        let id = self.store.insert(&property).await?;

        if property.has_coordinates() {
            tracing::debug!(property_id = id, "Property already has coordinates");
            return Ok(CreatedProperty {
                id,
                claim_token: property.claim_token,
                coordinates: property.latitude.zip(property.longitude).map(
                    |(latitude, longitude)| Coordinates {
                        latitude,
                        longitude,
                    },
                ),
                geocoded: false,
            });
        }

        let query = GeocodeQuery::new(
            property.address.as_str(),
            property.city.as_str(),
            property.state.as_str(),
            property.zip.as_str(),
        );
        let coordinates = match self.geocoder.geocode(&query).await {
            Some(coordinates) => match self.store.set_coordinates(id, coordinates).await {
                Ok(()) => Some(coordinates),
                Err(e) => {
                    tracing::warn!(property_id = id, error = %e, "Failed to save geocoded coordinates");
                    None
                }
            },
            None => None,
        };

        tracing::info!(
            property_id = id,
            geocoded = coordinates.is_some(),
            "Property created"
        );

        Ok(CreatedProperty {
            id,
            claim_token: property.claim_token,
            geocoded: coordinates.is_some(),
            coordinates,
        })
    }

    /// Imports CSV rows (header → cell). Invalid rows and failed inserts are skipped.
    pub async fn import_rows(&self, rows: &[HashMap<String, String>]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (index, row) in rows.iter().enumerate() {
            match NewProperty::from_row(row) {
                Ok(property) => self.import_one(index, property, &mut summary).await,
                Err(e) => summary.skipped.push(SkippedRow {
                    index,
                    reason: e.to_string(),
                }),
            }
        }
        log_summary("csv", &summary);
        summary
    }

    /// Imports normalized external listing records.
    pub async fn import_listings(&self, records: &[ExternalListingRecord]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (index, record) in records.iter().enumerate() {
            if record.address.trim().is_empty() {
                summary.skipped.push(SkippedRow {
                    index,
                    reason: "Missing required field: address".to_string(),
                });
                continue;
            }
            self.import_one(index, NewProperty::from_listing(record), &mut summary)
                .await;
        }
        log_summary("listing", &summary);
        summary
    }

    async fn import_one(&self, index: usize, property: NewProperty, summary: &mut ImportSummary) {
        match self.create(property).await {
            Ok(created) => {
                summary.created.push(created.id);
                if created.geocoded {
                    summary.geocoded += 1;
                }
            }
            Err(e) => {
                tracing::warn!(row = index, error = %e, "Failed to import property");
                summary.skipped.push(SkippedRow {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn log_summary(source: &str, summary: &ImportSummary) {
    tracing::info!(
        source,
        created = summary.created.len(),
        geocoded = summary.geocoded,
        skipped = summary.skipped.len(),
        "Import finished"
    );
}
