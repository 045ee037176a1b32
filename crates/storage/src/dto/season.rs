use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::SeasonPhase;
use crate::repository::season::SeasonDates;

/// Request payload for creating or updating a season's calendar
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_date_order"))]
pub struct UpsertSeasonRequest {
    #[validate(range(min = 1900, max = 2200))]
    pub season_year: i32,
    pub registration_opens_on: Option<NaiveDate>,
    pub registration_closes_on: Option<NaiveDate>,
    pub season_starts_on: Option<NaiveDate>,
    pub season_ends_on: Option<NaiveDate>,
}

impl UpsertSeasonRequest {
    pub fn dates(&self) -> SeasonDates {
        SeasonDates {
            registration_opens_on: self.registration_opens_on,
            registration_closes_on: self.registration_closes_on,
            season_starts_on: self.season_starts_on,
            season_ends_on: self.season_ends_on,
        }
    }
}

fn validate_date_order(req: &UpsertSeasonRequest) -> Result<(), ValidationError> {
    let ordered = [
        req.registration_opens_on,
        req.registration_closes_on,
        req.season_starts_on,
        req.season_ends_on,
    ];
    let present: Vec<NaiveDate> = ordered.into_iter().flatten().collect();

    if present.windows(2).all(|w| w[0] <= w[1]) {
        Ok(())
    } else {
        Err(ValidationError::new("season_dates_out_of_order"))
    }
}

/// Administrative phase override. Unlike `advance`, any target is allowed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OverridePhaseRequest {
    pub phase: SeasonPhase,
    #[validate(length(min = 1, max = 500, message = "A reason is required for phase overrides"))]
    pub reason: String,
}
