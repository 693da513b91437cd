use chrono::NaiveDate;
use serde::Deserialize;

use crate::catalog::{self, Provider, Service};

/// The in-progress wizard state. Selections unlock strictly in order
/// (service, provider, date, time) and a change upstream invalidates
/// everything that depended on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub service: Option<String>,
    pub provider: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
}

/// Raw selection fields as they arrive in a query string or form body.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    pub service: Option<String>,
    pub provider: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl SelectionParams {
    pub fn into_selection(self) -> Selection {
        Selection {
            service: none_if_blank(self.service),
            provider: none_if_blank(self.provider),
            date: self
                .date
                .as_deref()
                .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()),
            time: none_if_blank(self.time),
        }
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Which wizard steps are open, derived from the selection on every render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Steps {
    pub providers: bool,
    pub schedule: bool,
    pub times: bool,
    pub form: bool,
}

/// A fully specified booking, resolved against the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDetails {
    pub service: &'static Service,
    pub provider: &'static Provider,
    pub date: NaiveDate,
    pub time: String,
}

impl Selection {
    pub fn select_service(&mut self, id: &str) {
        self.service = Some(id.to_string());
        // A new service invalidates the provider choice.
        self.provider = None;
    }

    pub fn select_provider(&mut self, id: &str) {
        self.provider = Some(id.to_string());
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        // A new date invalidates the time slot.
        self.time = None;
    }

    pub fn select_time(&mut self, label: &str) {
        self.time = Some(label.to_string());
    }

    pub fn reset(&mut self) {
        *self = Selection::default();
    }

    /// Re-validates a selection that round-tripped through the URL. Unknown
    /// ids, unavailable providers, closed dates and unknown slot labels are
    /// dropped together with everything downstream of them.
    pub fn normalized(mut self, today: NaiveDate) -> Selection {
        self.service = self
            .service
            .filter(|id| catalog::find_service(id).is_some());
        if self.service.is_none() {
            self.provider = None;
        }
        self.provider = self
            .provider
            .filter(|id| catalog::find_provider(id).is_some_and(|p| p.available));
        if self.provider.is_none() {
            self.date = None;
        }
        self.date = self.date.filter(|date| catalog::is_bookable(*date, today));
        if self.date.is_none() {
            self.time = None;
        }
        self.time = self.time.filter(|label| catalog::is_time_slot(label));
        self
    }

    pub fn steps(&self) -> Steps {
        let providers = self.service.is_some();
        let schedule = providers && self.provider.is_some();
        let times = schedule && self.date.is_some();
        let form = times && self.time.is_some();
        Steps {
            providers,
            schedule,
            times,
            form,
        }
    }

    /// Checks the selection is complete before anything is written to the
    /// store. Errors are user-facing and accumulated.
    pub fn validate(&self) -> Result<BookingDetails, Vec<String>> {
        let mut errors = Vec::new();

        let service = self.service.as_deref().and_then(catalog::find_service);
        if service.is_none() {
            errors.push("Please select a service.".to_string());
        }
        let provider = self.provider.as_deref().and_then(catalog::find_provider);
        if provider.is_none() {
            errors.push("Please select a provider.".to_string());
        }
        if self.date.is_none() {
            errors.push("Please pick a date.".to_string());
        }
        let time = self
            .time
            .as_deref()
            .filter(|label| catalog::is_time_slot(label));
        if time.is_none() {
            errors.push("Please pick a time slot.".to_string());
        }

        match (service, provider, self.date, time) {
            (Some(service), Some(provider), Some(date), Some(time)) => Ok(BookingDetails {
                service,
                provider,
                date,
                time: time.to_string(),
            }),
            _ => Err(errors),
        }
    }

    /// The selection as a query string (leading `?`), empty when nothing is
    /// selected. Inverse of `SelectionParams::into_selection`.
    pub fn query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(service) = &self.service {
            pairs.push(("service", service.clone()));
        }
        if let Some(provider) = &self.provider {
            pairs.push(("provider", provider.clone()));
        }
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(time) = &self.time {
            pairs.push(("time", time.clone()));
        }
        if pairs.is_empty() {
            return String::new();
        }
        let encoded = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        format!("?{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        // A Monday; the following Sunday is 2026-08-09.
        day(2026, 8, 3)
    }

    fn complete_selection() -> Selection {
        let mut selection = Selection::default();
        selection.select_service("basic-facial");
        selection.select_provider("victoria");
        selection.select_date(day(2026, 8, 10));
        selection.select_time("10:00 AM");
        selection
    }

    #[test]
    fn selecting_a_service_always_clears_the_provider() {
        let mut selection = Selection::default();
        for id in ["basic-facial", "leg-wax-full", "basic-facial", "deluxe-facial"] {
            selection.select_provider("victoria");
            selection.select_service(id);
            assert_eq!(selection.provider, None);
            assert_eq!(selection.service.as_deref(), Some(id));
        }
    }

    #[test]
    fn selecting_a_date_always_clears_the_time() {
        let mut selection = complete_selection();
        for date in [day(2026, 8, 11), day(2026, 8, 12), day(2026, 8, 11)] {
            selection.select_time("9:30 AM");
            selection.select_date(date);
            assert_eq!(selection.time, None);
            assert_eq!(selection.date, Some(date));
        }
    }

    #[test]
    fn reset_returns_to_the_initial_state() {
        let mut selection = complete_selection();
        selection.reset();
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn steps_unlock_strictly_in_order() {
        let mut selection = Selection::default();
        assert_eq!(selection.steps(), Steps::default());

        selection.select_service("basic-facial");
        let steps = selection.steps();
        assert!(steps.providers && !steps.schedule && !steps.times && !steps.form);

        selection.select_provider("victoria");
        let steps = selection.steps();
        assert!(steps.schedule && !steps.times && !steps.form);

        selection.select_date(day(2026, 8, 10));
        let steps = selection.steps();
        assert!(steps.times && !steps.form);

        selection.select_time("10:00 AM");
        assert!(selection.steps().form);
    }

    #[test]
    fn a_downstream_step_never_opens_without_its_upstream_selection() {
        let orphan = Selection {
            service: None,
            provider: Some("victoria".to_string()),
            date: Some(day(2026, 8, 10)),
            time: Some("10:00 AM".to_string()),
        };
        assert_eq!(orphan.steps(), Steps::default());
    }

    #[test]
    fn normalize_drops_stale_and_unknown_fields() {
        let today = today();

        let unknown_service = Selection {
            service: Some("hot-stone".to_string()),
            provider: Some("victoria".to_string()),
            ..Selection::default()
        };
        assert_eq!(unknown_service.normalized(today), Selection::default());

        let sunday = Selection {
            service: Some("basic-facial".to_string()),
            provider: Some("victoria".to_string()),
            date: Some(day(2026, 8, 9)),
            time: Some("10:00 AM".to_string()),
        };
        let normalized = sunday.normalized(today);
        assert_eq!(normalized.date, None);
        assert_eq!(normalized.time, None);
        assert!(normalized.provider.is_some());

        let bad_slot = Selection {
            time: Some("6:00 PM".to_string()),
            ..complete_selection()
        };
        assert_eq!(bad_slot.normalized(today).time, None);

        let intact = complete_selection();
        assert_eq!(intact.clone().normalized(today), intact);
    }

    #[test]
    fn validation_rejects_incomplete_selections() {
        let errors = Selection::default().validate().unwrap_err();
        assert_eq!(errors.len(), 4);

        let mut selection = Selection::default();
        selection.select_service("basic-facial");
        selection.select_provider("victoria");
        let errors = selection.validate().unwrap_err();
        assert!(errors.contains(&"Please pick a date.".to_string()));
        assert!(errors.contains(&"Please pick a time slot.".to_string()));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn a_complete_selection_resolves_against_the_catalog() {
        let details = complete_selection().validate().unwrap();
        assert_eq!(details.service.name, "Classic Facial");
        assert_eq!(details.service.price, 85);
        assert_eq!(details.service.duration_minutes, 60);
        assert_eq!(details.provider.name, "Victoria Arabei");
        assert_eq!(details.date, day(2026, 8, 10));
        assert_eq!(details.time, "10:00 AM");
    }

    #[test]
    fn selection_round_trips_through_the_query_string() {
        let selection = complete_selection();
        let query = selection.query_string();
        let params: SelectionParams =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap();
        assert_eq!(params.into_selection(), selection);

        assert_eq!(Selection::default().query_string(), "");
    }
}
