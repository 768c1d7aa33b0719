//! HTTP handler functions for the crime risk API.

use actix_web::{HttpResponse, web};
use crime_risk_crime_models::CrimeCategory;
use crime_risk_geocoder::GeocodeError;
use crime_risk_predictor::PredictError;
use crime_risk_server_models::{
    ApiCategory, ApiError, ApiHealth, ApiLocation, ApiOptions, ApiPrediction, GeocodeParams,
    LocateRequest, PredictRequest,
};

use crate::AppState;

fn locator_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ApiError::new("Locator unavailable"))
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        locator_available: state.locator().is_some(),
    })
}

/// `GET /api/categories`
///
/// Returns the crime categories with their offense lists.
pub async fn categories() -> HttpResponse {
    let categories: Vec<ApiCategory> = CrimeCategory::all()
        .iter()
        .copied()
        .map(ApiCategory::from)
        .collect();

    HttpResponse::Ok().json(categories)
}

/// `GET /api/options`
///
/// Returns the form choices and the initial map view.
pub async fn options() -> HttpResponse {
    HttpResponse::Ok().json(ApiOptions::all())
}

/// `POST /api/locate`
///
/// Resolves the precinct and borough containing a point.
pub async fn locate(state: web::Data<AppState>, body: web::Json<LocateRequest>) -> HttpResponse {
    let Some(locator) = state.locator() else {
        return locator_unavailable();
    };

    let location = locator.locate(body.latitude, body.longitude);
    HttpResponse::Ok().json(ApiLocation {
        precinct: location.precinct,
        borough: location.borough,
        resolved: location.is_resolved(),
    })
}

/// `POST /api/predict`
///
/// Resolves the location, then predicts the most likely crime category.
pub async fn predict(state: web::Data<AppState>, body: web::Json<PredictRequest>) -> HttpResponse {
    let Some(locator) = state.locator() else {
        return locator_unavailable();
    };

    let query = body.into_inner().into_query();
    match state.context.predict_at(&query, locator) {
        Ok(outcome) => HttpResponse::Ok().json(ApiPrediction {
            category: outcome.prediction.category,
            offenses: outcome.prediction.offenses,
            probabilities: outcome.prediction.probabilities,
            precinct: outcome.precinct,
            borough: outcome.borough,
            substitutions: outcome
                .substitutions
                .iter()
                .map(ToString::to_string)
                .collect(),
        }),
        Err(e @ PredictError::LocationUnresolved { .. }) => {
            log::debug!("Refusing prediction: {e}");
            HttpResponse::UnprocessableEntity().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::error!("Prediction failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Prediction failed"))
        }
    }
}

/// `GET /api/geocode?q=...`
///
/// Looks up a free-form address.
pub async fn geocode(
    state: web::Data<AppState>,
    params: web::Query<GeocodeParams>,
) -> HttpResponse {
    if params.q.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new("Missing query"));
    }

    match state.geocoder.geocode(&params.q).await {
        Ok(Some(point)) => HttpResponse::Ok().json(point),
        Ok(None) => HttpResponse::NotFound().json(ApiError::new("Location not found")),
        Err(GeocodeError::RateLimited) => {
            HttpResponse::TooManyRequests().json(ApiError::new("Geocoding rate limit exceeded"))
        }
        Err(e) => {
            log::error!("Geocoding failed for {:?}: {e}", params.q);
            HttpResponse::BadGateway().json(ApiError::new("Geocoding failed"))
        }
    }
}
