use crate::api::attendance::{HistoryResponse, PrecheckRequest, PunchRequest};
use crate::api::student::DashboardResponse;
use crate::attendance::device::{Position, ReportedCaptureError, ReportedLocationError};
use crate::attendance::punch::{PunchOutcome, PunchPlan};
use crate::model::announcement::Announcement;
use crate::model::attendance::{AttendanceSummary, DayStatus, GeoSnapshot, PunchType};
use crate::model::banner::Banner;
use crate::model::lecture::LectureSession;
use crate::model::result::{ResultResponse, SubjectMark};
use crate::model::student::StudentProfile;
use crate::models::{LoginReqDto, TokenPair};
use crate::services::helpdesk::HelpContact;
use crate::services::history::{HistoryRow, MonthSection};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Portal API",
        version = "1.0.0",
        description = r#"
## Student Portal

Backend for the student portal: geofenced, photo-verified attendance plus
the read-only pages around it.

### 🔹 Key Features
- **Attendance**
  - Punch IN / OUT once per day, inside the branch geofence, with a selfie
  - Today's status and month-grouped history
- **Lectures**
  - Today, tomorrow and the branch's next 30 days
- **Results, announcements, banners and help desk**

### 🔐 Security
Everything under `/api` requires a **JWT Bearer** access token from
`/auth/login`. Students sign in with their registered mobile number.

### ⚠️ Errors
Punch failures answer with `{"code": "...", "message": "..."}`; the code is
stable, the message is meant for the student.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::student::me,
        crate::api::student::dashboard,

        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::precheck,
        crate::api::attendance::punch,

        crate::api::lectures::today,
        crate::api::lectures::tomorrow,
        crate::api::lectures::branch_month,

        crate::api::results::my_result,
        crate::api::announcements::list,
        crate::api::helpdesk::contact
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            StudentProfile,
            DashboardResponse,
            Banner,
            PunchType,
            Position,
            ReportedLocationError,
            ReportedCaptureError,
            PrecheckRequest,
            PunchRequest,
            PunchPlan,
            PunchOutcome,
            GeoSnapshot,
            DayStatus,
            AttendanceSummary,
            HistoryResponse,
            MonthSection,
            HistoryRow,
            LectureSession,
            ResultResponse,
            SubjectMark,
            Announcement,
            HelpContact
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign in, token rotation and sign out"),
        (name = "Student", description = "Profile and dashboard"),
        (name = "Attendance", description = "Geofenced IN/OUT punches"),
        (name = "Lectures", description = "Lecture schedule"),
        (name = "Results", description = "Exam results"),
        (name = "Announcements", description = "Branch announcements"),
        (name = "Help", description = "Help desk contact"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
