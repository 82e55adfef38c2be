use super::domain::{Application, Requester, Role};

/// Action a requester wants to perform, carrying the target record where the
/// decision depends on ownership.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    Submit,
    ViewOwn,
    View(&'a Application),
    EditContent(&'a Application),
    SetStatus,
    ListAll,
    ViewStatistics,
}

impl Capability<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Submit => "submit",
            Capability::ViewOwn => "view_own",
            Capability::View(_) => "view",
            Capability::EditContent(_) => "edit_content",
            Capability::SetStatus => "set_status",
            Capability::ListAll => "list_all",
            Capability::ViewStatistics => "view_statistics",
        }
    }
}

pub fn permits(requester: &Requester, capability: Capability<'_>) -> bool {
    match (requester.role, capability) {
        (Role::Admin, Capability::View(_))
        | (Role::Admin, Capability::SetStatus)
        | (Role::Admin, Capability::ListAll)
        | (Role::Admin, Capability::ViewStatistics) => true,
        (Role::Applicant, Capability::Submit) | (Role::Applicant, Capability::ViewOwn) => true,
        (Role::Applicant, Capability::View(application))
        | (Role::Applicant, Capability::EditContent(application)) => {
            application.is_owned_by(requester.user_id)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::domain::{
        ApplicationFields, ApplicationId, ApplicationStatus, UserId,
    };
    use chrono::{NaiveDate, Utc};

    fn owned_by(user: i64) -> Application {
        let now = Utc::now();
        Application {
            id: ApplicationId(1),
            user_id: UserId(user),
            fields: ApplicationFields {
                student_name: "John Doe".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2010, 1, 1).expect("valid"),
                full_address: "Jakarta".to_string(),
                previous_school: "SD Negeri 1".to_string(),
                parent_name: "Jane Doe".to_string(),
                parent_contact: "0812".to_string(),
            },
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admins_review_but_never_edit_content() {
        let admin = Requester::admin(100);
        let app = owned_by(1);
        assert!(permits(&admin, Capability::View(&app)));
        assert!(permits(&admin, Capability::SetStatus));
        assert!(permits(&admin, Capability::ListAll));
        assert!(!permits(&admin, Capability::EditContent(&app)));
        assert!(!permits(&admin, Capability::Submit));
    }

    #[test]
    fn applicants_only_reach_their_own_record() {
        let owner = Requester::applicant(1);
        let stranger = Requester::applicant(2);
        let app = owned_by(1);
        assert!(permits(&owner, Capability::View(&app)));
        assert!(permits(&owner, Capability::EditContent(&app)));
        assert!(!permits(&stranger, Capability::View(&app)));
        assert!(!permits(&stranger, Capability::EditContent(&app)));
        assert!(!permits(&owner, Capability::SetStatus));
        assert!(!permits(&owner, Capability::ListAll));
        assert!(!permits(&owner, Capability::ViewStatistics));
    }
}
