//! Identity-verification flow: registration and the verification callback.
//!
//! Registration creates an unverified user, opens a people inspection at the
//! provider, and redirects the person to the hosted flow. The provider later
//! redirects them back to the callback URL minted at registration, which
//! carries a signed token; the verdict is pulled from the provider rather
//! than trusted from the redirect.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;
use surety_core::models::{User, UserId};
use surety_inspection::client::{Consumer, PeopleInspectionParams};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    crypto::{mint_token, verify_token},
    error::ApiError,
    pages,
    state::AppState,
};

/// Serves the registration page.
pub async fn index() -> Html<&'static str> {
    Html(pages::INDEX)
}

/// Registration form fields.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// Given name.
    pub firstname: String,
    /// Family name.
    pub lastname: String,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// National identification number.
    pub identification: String,
    /// Plaintext password; only its digest is stored.
    pub password: String,
}

/// Registers a user and redirects them into the hosted verification flow.
///
/// The callback URL embedded in the provider request carries a short-lived
/// HMAC token bound to the new user ID, so the later redirect back can be
/// authenticated. Responds 303 to the provider's magic link.
///
/// # Errors
///
/// - 400 when a required field is blank
/// - 502 when the people inspection cannot be created
#[instrument(name = "register", skip(state, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, ApiError> {
    validate_registration(&form)?;

    let now = state.clock.now_utc();
    let user = User {
        id: UserId::new(),
        firstname: form.firstname,
        lastname: form.lastname,
        username: form.username,
        email: form.email,
        identification: form.identification,
        password_hash: sha256::digest(form.password),
        verified: false,
        inspection_id: None,
        created_at: now,
    };
    let consumer = Consumer {
        email: user.email.clone(),
        first_name: user.firstname.clone(),
        last_name: Some(user.lastname.clone()),
        identification: user.identification.clone(),
    };

    let user_id = state.store.create_user(user).await?;

    let expires_at = now.timestamp() + state.config.callback_token_ttl_secs as i64;
    let token =
        mint_token(&state.config.callback_token_secret, &user_id.to_string(), expires_at);
    let callback_url = format!(
        "{}/identity/verification?user_id={user_id}&expires={expires_at}&token={token}",
        state.config.public_base_url.trim_end_matches('/'),
    );

    let created = state
        .inspector
        .create_people_inspection(PeopleInspectionParams {
            user_id: user_id.to_string(),
            locale: state.config.inspection_locale.clone(),
            callback_url,
            consumer,
            template_id: state.config.people_template_id.clone(),
        })
        .await?;

    state.store.attach_user_inspection(user_id, created.inspection_id.clone().into()).await?;

    info!(%user_id, inspection_id = %created.inspection_id, "User registered, redirecting to hosted flow");

    Ok(Redirect::to(&created.magic_link))
}

fn validate_registration(form: &RegisterForm) -> Result<(), ApiError> {
    let required = [
        ("firstname", &form.firstname),
        ("lastname", &form.lastname),
        ("username", &form.username),
        ("email", &form.email),
        ("identification", &form.identification),
        ("password", &form.password),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{name} must not be blank")));
        }
    }
    Ok(())
}

/// Query parameters on the verification callback.
///
/// `user_id`, `expires`, and `token` were minted at registration;
/// `inspection_id` is appended by the provider's hosted flow.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// User the token was minted for.
    pub user_id: Uuid,
    /// Inspection the hosted flow just completed.
    pub inspection_id: String,
    /// Token expiry as a unix timestamp in seconds.
    pub expires: i64,
    /// HMAC token over the user ID and expiry.
    pub token: String,
}

/// Handles the redirect back from the provider's hosted flow.
///
/// The token is verified first; only then is the verdict pulled from the
/// provider. The inspection must be the one recorded for the user at
/// registration and must carry the user ID in its metadata, so a valid token
/// cannot be replayed against someone else's inspection.
///
/// # Errors
///
/// - 400 when the token is expired, mismatched, or the inspection does not
///   belong to the user
/// - 404 when the user does not exist
/// - 502 when the verdict cannot be retrieved
#[instrument(name = "verification_callback", skip(state, query), fields(user_id = %query.user_id))]
pub async fn verification_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<&'static str>, ApiError> {
    let now = state.clock.now_utc().timestamp();
    verify_token(
        &state.config.callback_token_secret,
        &query.user_id.to_string(),
        query.expires,
        &query.token,
        now,
    )
    .map_err(|reason| {
        warn!(user_id = %query.user_id, ?reason, "Rejected verification callback token");
        ApiError::InvalidToken
    })?;

    let user_id = UserId::from(query.user_id);
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {user_id}")))?;

    let recorded = user.inspection_id.as_ref().map(|r| r.as_str());
    if recorded != Some(query.inspection_id.as_str()) {
        warn!(%user_id, inspection_id = %query.inspection_id, "Callback names an inspection not recorded for the user");
        return Err(ApiError::Validation("inspection does not belong to this user".to_string()));
    }

    let inspection = state.inspector.retrieve_inspection(&query.inspection_id).await?;

    let metadata_user = inspection.metadata.get("user_id").and_then(|value| value.as_str());
    if metadata_user != Some(query.user_id.to_string().as_str()) {
        warn!(%user_id, inspection_id = %query.inspection_id, "Inspection metadata does not name the user");
        return Err(ApiError::Validation("inspection does not belong to this user".to_string()));
    }

    if !inspection.is_approved() {
        info!(%user_id, verdict = ?inspection.verdict, "Identity verification not approved");
        return Ok(Html(pages::IDENTITY_DECLINED));
    }

    let flipped = state.store.mark_user_verified(user_id).await?;
    if !flipped {
        // Callback replay after a successful verification; the page is
        // still the right answer
        info!(%user_id, "User already verified");
    } else {
        info!(%user_id, "User verified");
    }

    Ok(Html(pages::IDENTITY_SUCCESS))
}
