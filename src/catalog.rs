use chrono::{Datelike, NaiveDate, Weekday};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub duration_minutes: i64,
    pub price: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provider {
    pub id: &'static str,
    pub name: &'static str,
    pub specialty: &'static str,
    pub experience: &'static str,
    pub available: bool,
}

pub const SERVICES: &[Service] = &[
    Service {
        id: "basic-facial",
        name: "Classic Facial",
        description: "Deep cleansing, exfoliation, and moisturizing treatment",
        duration_minutes: 60,
        price: 85,
    },
    Service {
        id: "deluxe-facial",
        name: "Deluxe Anti-Aging Facial",
        description: "Advanced facial with anti-aging serums and LED therapy",
        duration_minutes: 90,
        price: 125,
    },
    Service {
        id: "swedish-massage-60",
        name: "Swedish Massage (60 min)",
        description: "Full-body relaxation massage with gentle, flowing strokes",
        duration_minutes: 60,
        price: 100,
    },
    Service {
        id: "swedish-massage-90",
        name: "Swedish Massage (90 min)",
        description: "Extended full-body massage for ultimate relaxation",
        duration_minutes: 90,
        price: 140,
    },
    Service {
        id: "leg-wax-half",
        name: "Half Leg Waxing",
        description: "Hair removal for lower legs (knee to ankle)",
        duration_minutes: 30,
        price: 50,
    },
    Service {
        id: "leg-wax-full",
        name: "Full Leg Waxing",
        description: "Complete leg hair removal from thigh to ankle",
        duration_minutes: 60,
        price: 85,
    },
];

pub const PROVIDERS: &[Provider] = &[Provider {
    id: "victoria",
    name: "Victoria Arabei",
    specialty: "Facials, Swedish Massage & Waxing Specialist",
    experience: "10+ years experience",
    available: true,
}];

pub const TIME_SLOTS: &[&str] = &[
    "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM",
    "12:00 PM", "12:30 PM", "1:00 PM", "1:30 PM", "2:00 PM", "2:30 PM",
    "3:00 PM", "3:30 PM", "4:00 PM", "4:30 PM", "5:00 PM", "5:30 PM",
];

pub fn find_service(id: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|service| service.id == id)
}

pub fn find_provider(id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|provider| provider.id == id)
}

pub fn is_time_slot(label: &str) -> bool {
    TIME_SLOTS.contains(&label)
}

// The salon takes no walk-ins on Sundays and no bookings in the past.
pub fn is_bookable(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today && date.weekday() != Weekday::Sun
}

pub fn upcoming_dates(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = today;
    while dates.len() < count {
        if is_bookable(day, today) {
            dates.push(day);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    dates
}
