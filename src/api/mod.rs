mod auth;
mod categories;
mod chatbot;
mod doctors;
mod error;
mod extract;
mod items;
mod reports;
mod sections;
mod transfer;
mod values;
mod wellness;

use axum::{Router, middleware};
use serde::Deserialize;
use std::sync::Arc;

use crate::attachments::Attachments;
use crate::auth::{AuthState, resolve_identity};
use crate::chatbot::Chatbot;
use crate::db::{Database, PageRequest};
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use transfer::MAX_UPLOAD_BYTES;

const DEFAULT_PAGE_SIZE: u32 = 10;

/// `?page=&size=` query for paginated listings. Pages are zero-based.
#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
    size: Option<u32>,
}

impl PageQuery {
    fn to_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// Create the API router.
///
/// Every route sits behind the identity middleware. Handlers decide for
/// themselves whether an identity is required.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    attachments: Attachments,
    chatbot: Chatbot,
    rate_limits: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let token_state = auth::TokenState {
        db: db.clone(),
        jwt,
    };

    let values_state = values::ValuesState {
        db: db.clone(),
        attachments: attachments.clone(),
    };

    let reports_state = reports::ReportsState {
        db: db.clone(),
        attachments,
    };

    Router::new()
        .nest("/auth", auth::router(token_state, rate_limits.clone()))
        .nest(
            "/report-categories",
            categories::router(categories::CategoriesState { db: db.clone() }),
        )
        .nest(
            "/report-sections",
            sections::router(sections::SectionsState { db: db.clone() }),
        )
        .nest(
            "/report-items",
            items::router(items::ItemsState { db: db.clone() }),
        )
        .nest("/report-values", values::router(values_state))
        .nest("/jendo-reports", reports::router(reports_state))
        .nest(
            "/doctors",
            doctors::router(doctors::DoctorsState { db: db.clone() }),
        )
        .nest(
            "/wellness-recommendations",
            wellness::router(wellness::WellnessState { db }),
        )
        .nest(
            "/chatbot",
            chatbot::router(chatbot::ChatbotState { chatbot }, rate_limits),
        )
        .layer(middleware::from_fn_with_state(auth_state, resolve_identity))
}
