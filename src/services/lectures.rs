use serde::Serialize;
use utoipa::ToSchema;

use crate::model::lecture::{LECTURES_COLLECTION, LectureSession};
use crate::model::student::StudentProfile;
use crate::store::{Document, DocumentStore, Filter, StoreError};

/// How far ahead the branch calendar looks
pub const BRANCH_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct TodayTomorrow {
    pub today: Vec<LectureSession>,
    pub tomorrow: Vec<LectureSession>,
}

fn to_session(doc: Document) -> Option<LectureSession> {
    let mut session: LectureSession = serde_json::from_value(doc.body.into()).ok()?;
    session.id = doc.id;
    Some(session)
}

/// Sessions for the student's exact cohort on `today` and `tomorrow`.
/// Students with an incomplete profile get nothing rather than everything.
pub async fn today_tomorrow(
    store: &dyn DocumentStore,
    student: &StudentProfile,
    today: &str,
    tomorrow: &str,
) -> Result<TodayTomorrow, StoreError> {
    let Some((branch, course, batch, year)) = student.cohort() else {
        tracing::warn!(number = ?student.number, "missing student details to fetch lectures");
        return Ok(TodayTomorrow::default());
    };

    let docs = store
        .find(
            LECTURES_COLLECTION,
            &[
                Filter::eq("branch", branch),
                Filter::eq("course", course),
                Filter::eq("batch", batch),
                Filter::eq("year", year),
            ],
        )
        .await?;

    let mut out = TodayTomorrow::default();
    for session in docs.into_iter().filter_map(to_session) {
        if session.date == today {
            out.today.push(session);
        } else if session.date == tomorrow {
            out.tomorrow.push(session);
        }
    }
    out.today.sort_by(|a, b| a.start.cmp(&b.start));
    out.tomorrow.sort_by(|a, b| a.start.cmp(&b.start));
    Ok(out)
}

/// Every session of a branch between `from` and `to` (inclusive date keys),
/// ordered by date then start time
pub async fn branch_window(
    store: &dyn DocumentStore,
    branch: &str,
    from: &str,
    to: &str,
) -> Result<Vec<LectureSession>, StoreError> {
    let branch = branch.trim();
    if branch.is_empty() {
        return Ok(Vec::new());
    }

    let docs = store
        .find(LECTURES_COLLECTION, &[Filter::eq("branch", branch)])
        .await?;

    let mut sessions: Vec<LectureSession> = docs
        .into_iter()
        .filter_map(to_session)
        .filter(|s| s.date.as_str() >= from && s.date.as_str() <= to)
        .collect();
    sessions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.start.cmp(&b.start)));
    Ok(sessions)
}
