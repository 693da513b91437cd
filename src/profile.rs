use crate::{auth::SessionUser, db, models::CustomerRow, state::AppState};

/// Where the visitor stands before the wizard's final step. Terminal per
/// session; resolved fresh on every request.
#[derive(Clone, Debug)]
pub enum ProfileGate {
    SignedOut,
    NeedsProfile(SessionUser),
    Ready(CustomerRow),
}

impl ProfileGate {
    pub fn from_lookup(session: Option<SessionUser>, customer: Option<CustomerRow>) -> Self {
        match (session, customer) {
            (None, _) => ProfileGate::SignedOut,
            (Some(user), None) => ProfileGate::NeedsProfile(user),
            (Some(_), Some(customer)) => ProfileGate::Ready(customer),
        }
    }
}

pub async fn resolve(
    state: &AppState,
    session: Option<SessionUser>,
) -> Result<ProfileGate, sqlx::Error> {
    let customer = match &session {
        Some(user) => db::find_customer_by_subject(&state.db, &user.id).await?,
        None => None,
    };
    Ok(ProfileGate::from_lookup(session, customer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionUser {
        SessionUser {
            id: "subject-1".to_string(),
            email: "anna@example.com".to_string(),
        }
    }

    fn customer() -> CustomerRow {
        CustomerRow {
            id: "customer-1".to_string(),
            auth_user_id: "subject-1".to_string(),
            email: "anna@example.com".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            phone: None,
            referral_source: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn gate_states_follow_session_and_lookup() {
        assert!(matches!(
            ProfileGate::from_lookup(None, None),
            ProfileGate::SignedOut
        ));
        // A signed-out visitor never reaches the customer lookup.
        assert!(matches!(
            ProfileGate::from_lookup(None, Some(customer())),
            ProfileGate::SignedOut
        ));
        assert!(matches!(
            ProfileGate::from_lookup(Some(session()), None),
            ProfileGate::NeedsProfile(_)
        ));
        assert!(matches!(
            ProfileGate::from_lookup(Some(session()), Some(customer())),
            ProfileGate::Ready(_)
        ));
    }
}
