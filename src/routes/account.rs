use actix_web::{http::header, middleware::from_fn, web, HttpResponse, Result};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{customer_validator, logout_guard, SessionUser},
    db,
    filters,
    models::{AppointmentRow, STATUS_CANCELLED, STATUS_COMPLETED, STATUS_CONFIRMED},
    notify::{self, Notice, KIND_INFO},
    profile::{self, ProfileGate},
    state::AppState,
    templates::render,
};

const REFERRAL_SOURCES: &[(&str, &str)] = &[
    ("google", "Google Search"),
    ("social_media", "Social Media"),
    ("friend_referral", "Friend Referral"),
    ("walk_by", "Walked By"),
    ("advertisement", "Advertisement"),
    ("other", "Other"),
];

#[derive(Clone, Debug)]
struct ReferralOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct AppointmentCard {
    service_name: String,
    provider_name: String,
    appointment_date: String,
    appointment_time: String,
    duration_minutes: i64,
    price: i64,
    status: String,
    status_label: &'static str,
    preferences: String,
    has_preferences: bool,
}

#[derive(Template)]
#[template(path = "account.html")]
struct AccountTemplate {
    signed_in: bool,
    session_email: String,
    has_profile: bool,
    first_name: String,
    last_name: String,
    phone: String,
    referral_options: Vec<ReferralOption>,
    appointments: Vec<AppointmentCard>,
    has_appointments: bool,
    errors: Vec<String>,
    saved: bool,
}

#[derive(Deserialize)]
struct ProfileForm {
    first_name: String,
    last_name: String,
    phone: Option<String>,
    referral_source: Option<String>,
    next: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account")
            .wrap(HttpAuthentication::basic(customer_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(account_page)))
            .service(web::resource("/profile").route(web::post().to(save_profile)))
            .service(
                web::resource("/notifications").route(web::post().to(subscribe_notifications)),
            ),
    );
}

async fn account_page(
    state: web::Data<AppState>,
    auth: web::ReqData<SessionUser>,
) -> Result<HttpResponse> {
    let gate = profile::resolve(&state, Some(auth.into_inner()))
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(render(
        account_template(&state, &gate, Vec::new(), false).await?,
    ))
}

async fn save_profile(
    state: web::Data<AppState>,
    auth: web::ReqData<SessionUser>,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse> {
    let user = auth.into_inner();
    let form = form.into_inner();

    let first_name = form.first_name.trim().to_string();
    let last_name = form.last_name.trim().to_string();
    let phone = form
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let referral_source = form
        .referral_source
        .as_deref()
        .map(str::trim)
        .filter(|value| REFERRAL_SOURCES.iter().any(|(key, _)| key == value));

    let mut errors = Vec::new();
    if first_name.is_empty() {
        errors.push("First name is required.".to_string());
    }
    if last_name.is_empty() {
        errors.push("Last name is required.".to_string());
    }

    if !errors.is_empty() {
        let gate = profile::resolve(&state, Some(user))
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?;
        let mut template = account_template(&state, &gate, errors, false).await?;
        template.first_name = first_name;
        template.last_name = last_name;
        template.phone = phone.unwrap_or_default().to_string();
        return Ok(render(template));
    }

    let customer = db::upsert_customer(
        &state.db,
        db::CustomerInput {
            auth_user_id: &user.id,
            email: &user.email,
            first_name: &first_name,
            last_name: &last_name,
            phone,
            referral_source,
        },
    )
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    log::info!("Profile saved for customer {}", customer.id);

    // Return to the wizard when the form was reached mid-booking.
    if let Some(next) = form.next.as_deref().filter(|next| next.starts_with('/')) {
        return Ok(HttpResponse::SeeOther()
            .append_header((header::LOCATION, next))
            .finish());
    }

    let gate = ProfileGate::Ready(customer);
    Ok(render(account_template(&state, &gate, Vec::new(), true).await?))
}

async fn subscribe_notifications(
    state: web::Data<AppState>,
    auth: web::ReqData<SessionUser>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let gate = profile::resolve(&state, Some(auth.into_inner()))
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let customer = match gate {
        ProfileGate::Ready(customer) => customer,
        _ => return Ok(HttpResponse::BadRequest().finish()),
    };

    let raw = String::from_utf8(body.to_vec()).unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().finish());
    }

    let _ = notify::store_subscription(&state.db, &customer.id, &raw).await;
    notify::notify_customer(
        &state,
        &customer.id,
        Notice {
            title: "Notifications enabled",
            body: "You'll receive updates about your appointments.",
            kind: KIND_INFO,
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn account_template(
    state: &web::Data<AppState>,
    gate: &ProfileGate,
    errors: Vec<String>,
    saved: bool,
) -> Result<AccountTemplate> {
    let (session_email, customer) = match gate {
        ProfileGate::SignedOut => (String::new(), None),
        ProfileGate::NeedsProfile(user) => (user.email.clone(), None),
        ProfileGate::Ready(customer) => (customer.email.clone(), Some(customer)),
    };

    let appointments = match customer {
        Some(customer) => db::appointments_for_customer(&state.db, &customer.id)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?
            .into_iter()
            .map(to_card)
            .collect(),
        None => Vec::new(),
    };

    let referral = customer.and_then(|c| c.referral_source.clone()).unwrap_or_default();
    let referral_options = REFERRAL_SOURCES
        .iter()
        .copied()
        .map(|(value, label)| ReferralOption {
            value,
            label,
            selected: referral == value,
        })
        .collect();

    Ok(AccountTemplate {
        signed_in: true,
        session_email,
        has_profile: customer.is_some(),
        first_name: customer.map(|c| c.first_name.clone()).unwrap_or_default(),
        last_name: customer.map(|c| c.last_name.clone()).unwrap_or_default(),
        phone: customer.and_then(|c| c.phone.clone()).unwrap_or_default(),
        referral_options,
        has_appointments: !appointments.is_empty(),
        appointments,
        errors,
        saved,
    })
}

fn to_card(row: AppointmentRow) -> AppointmentCard {
    let preferences = row.special_preferences.unwrap_or_default();
    let status_label = match row.status.as_str() {
        s if s == STATUS_CONFIRMED => "Confirmed",
        s if s == STATUS_CANCELLED => "Cancelled",
        s if s == STATUS_COMPLETED => "Completed",
        _ => "Pending",
    };
    AppointmentCard {
        service_name: row.service_name,
        provider_name: row.provider_name,
        appointment_date: row.appointment_date,
        appointment_time: row.appointment_time,
        duration_minutes: row.duration_minutes,
        price: row.price,
        status: row.status,
        status_label,
        has_preferences: !preferences.trim().is_empty(),
        preferences,
    }
}
