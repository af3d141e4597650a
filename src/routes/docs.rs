//! OpenAPI description of the HTTP API, served at `/api-docs/openapi.json` and browsable
//! at `/swagger`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::{ads, categories, health, users};
use crate::error::ErrorBody;
use crate::metrics::MetricsSnapshot;
use crate::middleware::API_KEY_HEADER;
use crate::types::{Ad, Category, StatusResponse, ToggleResponse, User, UserCreate};

/// Name of the security scheme referenced by protected operations.
pub const SECURITY_SCHEME: &str = "api_key";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Adboard API",
        version = "1.0.0",
        description = "Classifieds board: users post ads with images under categories"
    ),
    paths(
        health::healthz,
        health::metrics,
        ads::list_ads,
        ads::get_ad,
        ads::create_ad,
        ads::update_ad,
        ads::toggle_ad,
        ads::delete_ad,
        users::create_user,
        users::delete_user,
        categories::list_categories,
        categories::init_categories,
    ),
    components(schemas(
        Ad,
        User,
        Category,
        UserCreate,
        StatusResponse,
        ToggleResponse,
        MetricsSnapshot,
        ErrorBody
    )),
    tags(
        (name = "Ads", description = "Ad lifecycle and image upload"),
        (name = "Users", description = "User management"),
        (name = "Categories", description = "Category listing and seeding"),
        (name = "Operations", description = "Health and metrics"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            SECURITY_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
        );
    }
}
