use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse, Result};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    auth::{current_session, customer_validator, logout_guard, SessionUser},
    booking::{Selection, SelectionParams, Steps},
    catalog,
    db,
    filters,
    notify::{self, Notice, KIND_SUCCESS},
    profile::{self, ProfileGate},
    state::AppState,
    templates::render,
};

const DATE_CHOICES: usize = 14;

#[derive(Clone, Debug)]
struct ServiceCard {
    name: &'static str,
    description: &'static str,
    duration_minutes: i64,
    price: i64,
    href: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ProviderCard {
    name: &'static str,
    specialty: &'static str,
    experience: &'static str,
    available: bool,
    href: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct DateOption {
    label: String,
    href: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct TimeOption {
    label: &'static str,
    href: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "book.html")]
struct BookingTemplate {
    signed_in: bool,
    session_email: String,
    steps: Steps,
    services: Vec<ServiceCard>,
    providers: Vec<ProviderCard>,
    dates: Vec<DateOption>,
    times: Vec<TimeOption>,
    show_signin: bool,
    show_profile_form: bool,
    show_summary: bool,
    signin_href: String,
    profile_email: String,
    book_url: String,
    customer_name: String,
    summary_service: String,
    summary_provider: String,
    summary_duration: i64,
    summary_price: i64,
    sel_service: String,
    sel_provider: String,
    sel_date: String,
    sel_time: String,
    preferences: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "book_success.html")]
struct BookingSuccessTemplate {
    signed_in: bool,
    session_email: String,
    customer_name: String,
    service_name: String,
    provider_name: String,
    appointment_date: String,
    appointment_time: String,
    duration_minutes: i64,
    price: i64,
    book_again_href: String,
    vapid_public_key: String,
}

#[derive(Deserialize)]
struct ConfirmForm {
    service: Option<String>,
    provider: Option<String>,
    date: Option<String>,
    time: Option<String>,
    preferences: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/book").route(web::get().to(show_wizard)))
        .service(
            web::resource("/book/confirm")
                .wrap(HttpAuthentication::basic(customer_validator))
                .wrap(from_fn(logout_guard))
                .route(web::post().to(confirm_booking)),
        );
}

async fn show_wizard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SelectionParams>,
) -> Result<HttpResponse> {
    let today = Utc::now().date_naive();
    let selection = query.into_inner().into_selection().normalized(today);
    let session = current_session(&state, &req).await;
    let gate = profile::resolve(&state, session)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(render(wizard_template(
        &selection,
        &gate,
        Vec::new(),
        String::new(),
        today,
    )))
}

async fn confirm_booking(
    state: web::Data<AppState>,
    auth: web::ReqData<SessionUser>,
    form: web::Form<ConfirmForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let today = Utc::now().date_naive();
    let mut selection = SelectionParams {
        service: form.service,
        provider: form.provider,
        date: form.date,
        time: form.time,
    }
    .into_selection()
    .normalized(today);
    let preferences = form.preferences.unwrap_or_default().trim().to_string();

    let gate = profile::resolve(&state, Some(auth.into_inner()))
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let customer = match &gate {
        ProfileGate::Ready(customer) => customer.clone(),
        // No profile yet: back to the wizard, which shows the profile form.
        _ => {
            return Ok(HttpResponse::SeeOther()
                .append_header((
                    header::LOCATION,
                    format!("/book{}", selection.query_string()),
                ))
                .finish());
        }
    };

    let details = match selection.validate() {
        Ok(details) => details,
        Err(errors) => {
            return Ok(render(wizard_template(
                &selection,
                &gate,
                errors,
                preferences,
                today,
            )));
        }
    };

    let inserted = db::insert_appointment(
        &state.db,
        db::NewAppointment {
            customer_id: &customer.id,
            service_name: details.service.name,
            provider_name: details.provider.name,
            appointment_date: details.date.format("%Y-%m-%d").to_string(),
            appointment_time: &details.time,
            duration_minutes: details.service.duration_minutes,
            price: details.service.price,
            special_preferences: if preferences.is_empty() {
                None
            } else {
                Some(preferences.as_str())
            },
        },
    )
    .await;

    let appointment = match inserted {
        Ok(appointment) => appointment,
        Err(err) => {
            log::error!("Appointment insert failed: {err}");
            let errors = vec![
                "There was an error creating your appointment. Please try again.".to_string(),
            ];
            return Ok(render(wizard_template(
                &selection,
                &gate,
                errors,
                preferences,
                today,
            )));
        }
    };

    log::info!(
        "Appointment {} confirmed for customer {}",
        appointment.id,
        customer.id
    );

    notify::notify_customer(
        &state,
        &customer.id,
        Notice {
            title: "Booking Confirmed",
            body: &format!(
                "Your appointment with {} for {} has been booked successfully.",
                appointment.provider_name, appointment.service_name
            ),
            kind: KIND_SUCCESS,
        },
    )
    .await;

    // A confirmed booking starts the next visit from a clean slate.
    selection.reset();
    let book_again_href = format!("/book{}", selection.query_string());

    Ok(render(BookingSuccessTemplate {
        signed_in: true,
        session_email: customer.email.clone(),
        customer_name: format!("{} {}", customer.first_name, customer.last_name),
        service_name: appointment.service_name,
        provider_name: appointment.provider_name,
        appointment_date: appointment.appointment_date,
        appointment_time: appointment.appointment_time,
        duration_minutes: appointment.duration_minutes,
        price: appointment.price,
        book_again_href,
        vapid_public_key: state.push.public_key.clone(),
    }))
}

fn wizard_template(
    selection: &Selection,
    gate: &ProfileGate,
    errors: Vec<String>,
    preferences: String,
    today: NaiveDate,
) -> BookingTemplate {
    let steps = selection.steps();
    let book_url = format!("/book{}", selection.query_string());
    let signin_next =
        serde_urlencoded::to_string(vec![("next", book_url.as_str())]).unwrap_or_default();

    let (signed_in, session_email) = match gate {
        ProfileGate::SignedOut => (false, String::new()),
        ProfileGate::NeedsProfile(user) => (true, user.email.clone()),
        ProfileGate::Ready(customer) => (true, customer.email.clone()),
    };

    let summary = if steps.form {
        summary_details(selection)
    } else {
        None
    };
    let has_summary = summary.is_some();
    let (summary_service, summary_provider, summary_duration, summary_price) =
        summary.unwrap_or_default();
    let customer = match gate {
        ProfileGate::Ready(customer) => Some(customer),
        _ => None,
    };

    BookingTemplate {
        signed_in,
        session_email: session_email.clone(),
        steps,
        services: service_cards(selection),
        providers: provider_cards(selection),
        dates: date_options(selection, today),
        times: time_options(selection),
        show_signin: steps.form && matches!(gate, ProfileGate::SignedOut),
        show_profile_form: steps.form && matches!(gate, ProfileGate::NeedsProfile(_)),
        show_summary: steps.form && customer.is_some() && has_summary,
        signin_href: format!("/login?{signin_next}"),
        profile_email: session_email,
        book_url,
        customer_name: customer
            .map(|c| format!("{} {}", c.first_name, c.last_name))
            .unwrap_or_default(),
        summary_service,
        summary_provider,
        summary_duration,
        summary_price,
        sel_service: selection.service.clone().unwrap_or_default(),
        sel_provider: selection.provider.clone().unwrap_or_default(),
        sel_date: selection
            .date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        sel_time: selection.time.clone().unwrap_or_default(),
        preferences,
        errors,
    }
}

fn summary_details(selection: &Selection) -> Option<(String, String, i64, i64)> {
    let service = selection.service.as_deref().and_then(catalog::find_service)?;
    let provider = selection.provider.as_deref().and_then(catalog::find_provider)?;
    Some((
        service.name.to_string(),
        provider.name.to_string(),
        service.duration_minutes,
        service.price,
    ))
}

fn service_cards(selection: &Selection) -> Vec<ServiceCard> {
    catalog::SERVICES
        .iter()
        .map(|service| {
            let mut next = selection.clone();
            next.select_service(service.id);
            ServiceCard {
                name: service.name,
                description: service.description,
                duration_minutes: service.duration_minutes,
                price: service.price,
                href: format!("/book{}", next.query_string()),
                selected: selection.service.as_deref() == Some(service.id),
            }
        })
        .collect()
}

fn provider_cards(selection: &Selection) -> Vec<ProviderCard> {
    catalog::PROVIDERS
        .iter()
        .map(|provider| {
            let mut next = selection.clone();
            next.select_provider(provider.id);
            ProviderCard {
                name: provider.name,
                specialty: provider.specialty,
                experience: provider.experience,
                available: provider.available,
                href: format!("/book{}", next.query_string()),
                selected: selection.provider.as_deref() == Some(provider.id),
            }
        })
        .collect()
}

fn date_options(selection: &Selection, today: NaiveDate) -> Vec<DateOption> {
    catalog::upcoming_dates(today, DATE_CHOICES)
        .into_iter()
        .map(|date| {
            let mut next = selection.clone();
            next.select_date(date);
            DateOption {
                label: date.format("%a, %b %-d").to_string(),
                href: format!("/book{}", next.query_string()),
                selected: selection.date == Some(date),
            }
        })
        .collect()
}

fn time_options(selection: &Selection) -> Vec<TimeOption> {
    catalog::TIME_SLOTS
        .iter()
        .map(|slot| {
            let mut next = selection.clone();
            next.select_time(slot);
            TimeOption {
                label: slot,
                href: format!("/book{}", next.query_string()),
                selected: selection.time.as_deref() == Some(*slot),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use chrono::Days;

    use super::*;
    use crate::{auth::hash_password, models::CustomerRow, state::PushConfig};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 3).unwrap()
    }

    #[::core::prelude::v1::test]
    fn service_links_apply_the_reducer() {
        let mut selection = Selection::default();
        selection.select_service("basic-facial");
        selection.select_provider("victoria");

        let cards = service_cards(&selection);
        let deluxe = cards.iter().find(|c| c.name == "Deluxe Anti-Aging Facial").unwrap();
        // Following the link switches service and drops the provider.
        assert!(deluxe.href.contains("service=deluxe-facial"));
        assert!(!deluxe.href.contains("provider"));

        let facial = cards.iter().find(|c| c.name == "Classic Facial").unwrap();
        assert!(facial.selected);
    }

    #[::core::prelude::v1::test]
    fn date_links_drop_the_chosen_time() {
        let mut selection = Selection::default();
        selection.select_service("basic-facial");
        selection.select_provider("victoria");
        selection.select_date(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        selection.select_time("10:00 AM");

        let dates = date_options(&selection, monday());
        assert_eq!(dates.len(), DATE_CHOICES);
        assert!(dates.iter().all(|d| !d.href.contains("time=")));
        assert!(dates.iter().any(|d| d.selected));
    }

    #[::core::prelude::v1::test]
    fn wizard_gates_the_final_step_on_the_profile() {
        let mut selection = Selection::default();
        selection.select_service("basic-facial");
        selection.select_provider("victoria");
        selection.select_date(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        selection.select_time("10:00 AM");

        let template = wizard_template(
            &selection,
            &ProfileGate::SignedOut,
            Vec::new(),
            String::new(),
            monday(),
        );
        assert!(template.show_signin);
        assert!(!template.show_profile_form && !template.show_summary);

        let template = wizard_template(
            &selection,
            &ProfileGate::NeedsProfile(SessionUser {
                id: "subject-1".to_string(),
                email: "anna@example.com".to_string(),
            }),
            Vec::new(),
            String::new(),
            monday(),
        );
        assert!(template.show_profile_form);
        assert!(!template.show_signin && !template.show_summary);

        let template = wizard_template(
            &selection,
            &ProfileGate::Ready(CustomerRow {
                id: "customer-1".to_string(),
                auth_user_id: "subject-1".to_string(),
                email: "anna@example.com".to_string(),
                first_name: "Anna".to_string(),
                last_name: "Petrova".to_string(),
                phone: None,
                referral_source: None,
                created_at: String::new(),
                updated_at: String::new(),
            }),
            Vec::new(),
            String::new(),
            monday(),
        );
        assert!(template.show_summary);
        assert_eq!(template.summary_price, 85);
        assert_eq!(template.summary_duration, 60);
    }

    // base64("anna@example.com:rosewater11")
    const BASIC_AUTH: &str = "Basic YW5uYUBleGFtcGxlLmNvbTpyb3Nld2F0ZXIxMQ==";

    async fn seeded_state() -> (AppState, String) {
        let pool = crate::db::testing::pool().await;

        let password_hash = hash_password("rosewater11").unwrap();
        let user_id = db::create_user(&pool, "anna@example.com", &password_hash)
            .await
            .unwrap();
        let customer = db::upsert_customer(
            &pool,
            db::CustomerInput {
                auth_user_id: &user_id,
                email: "anna@example.com",
                first_name: "Anna",
                last_name: "Petrova",
                phone: Some("555-0100"),
                referral_source: None,
            },
        )
        .await
        .unwrap();

        let state = AppState {
            db: pool,
            push: PushConfig {
                public_key: String::new(),
                private_key: String::new(),
                subject: String::new(),
            },
        };
        (state, customer.id)
    }

    fn bookable_date() -> String {
        let start = Utc::now().date_naive().checked_add_days(Days::new(1)).unwrap();
        catalog::upcoming_dates(start, 1)[0].format("%Y-%m-%d").to_string()
    }

    #[actix_web::test]
    async fn submitting_a_complete_booking_writes_one_confirmed_record() {
        let (state, customer_id) = seeded_state().await;
        let pool = state.db.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;
        let date = bookable_date();

        let request = test::TestRequest::post()
            .uri("/book/confirm")
            .insert_header(("Authorization", BASIC_AUTH))
            .set_form(vec![
                ("service", "basic-facial"),
                ("provider", "victoria"),
                ("date", date.as_str()),
                ("time", "10:00 AM"),
                ("preferences", "Please use unscented products"),
            ])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let history = db::appointments_for_customer(&pool, &customer_id).await.unwrap();
        assert_eq!(history.len(), 1);
        let appointment = &history[0];
        assert_eq!(appointment.status, "confirmed");
        assert_eq!(appointment.service_name, "Classic Facial");
        assert_eq!(appointment.provider_name, "Victoria Arabei");
        assert_eq!(appointment.price, 85);
        assert_eq!(appointment.duration_minutes, 60);
        assert_eq!(appointment.appointment_time, "10:00 AM");
        assert_eq!(
            appointment.special_preferences.as_deref(),
            Some("Please use unscented products")
        );
    }

    #[actix_web::test]
    async fn submitting_without_date_and_time_writes_nothing() {
        let (state, customer_id) = seeded_state().await;
        let pool = state.db.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/book/confirm")
            .insert_header(("Authorization", BASIC_AUTH))
            .set_form(vec![("service", "basic-facial"), ("provider", "victoria")])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = test::read_body(response).await;
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("Please pick a date."));
        assert!(page.contains("Please pick a time slot."));

        let history = db::appointments_for_customer(&pool, &customer_id).await.unwrap();
        assert!(history.is_empty());
    }
}
