use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::core::{
    DateValidation, PaymentPlan, PlanCommand, PlanEditor, PlanSummary, PlanType, Price,
    Registration, RegistrationDraft, RegistrationList, date_range_warning, default_plan,
    format_optional_date, format_price, generate, generate_display, parse_date, parse_price,
    payment_options_text, plan_title, summarize, summarize_editor, validate_start_date,
};
use crate::error::PlanError;

const DEFAULT_SCHEDULE_COUNT: usize = 4;
const MAX_SCHEDULE_COUNT: usize = 120;

type SharedRegistrations = Arc<RwLock<RegistrationList>>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchedulePayload {
    start_date: Option<String>,
    count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    dates: Vec<String>,
    iso_dates: Vec<Option<NaiveDate>>,
}

/// Registration context a plan is priced and dated against.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanContextPayload {
    start_date: Option<String>,
    price: Option<String>,
    is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultPlanPayload {
    plan_type: PlanType,
    #[serde(flatten)]
    context: PlanContextPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyPayload {
    session: PlanEditor,
    command: PlanCommand,
    #[serde(flatten)]
    context: PlanContextPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    session: PlanEditor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationApplyPayload {
    session: PlanEditor,
    command: PlanCommand,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RegistrationPayload {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    is_free: Option<bool>,
    start_date: Option<String>,
    end_date: Option<String>,
    enabled_plan_types: Option<Vec<PlanType>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    plan: PaymentPlan,
    summary: PlanSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session: PlanEditor,
    summary: PlanSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationView {
    #[serde(flatten)]
    registration: Registration,
    price_text: String,
    start_date_text: String,
    end_date_text: String,
    payment_options_text: String,
    start_date_validation: DateValidation,
    date_range_warning: Option<&'static str>,
    plans: BTreeMap<PlanType, PlanView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanView {
    title: String,
    customized: bool,
    summary: PlanSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

struct PlanContext {
    anchor: Option<NaiveDate>,
    price: Price,
}

impl PlanContextPayload {
    fn resolve(&self, today: NaiveDate) -> PlanContext {
        let start_date = self.start_date.as_deref().and_then(parse_date);
        let anchor = start_date.filter(|_| validate_start_date(start_date, today).valid);
        let price = if self.is_free.unwrap_or(false) {
            Price::Free
        } else {
            Price::Amount(parse_price(self.price.as_deref().unwrap_or("")))
        };
        PlanContext { anchor, price }
    }
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let registrations: SharedRegistrations = Arc::new(RwLock::new(RegistrationList::new()));
    let app = router(registrations);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "registration plan API listening");

    axum::serve(listener, app).await
}

fn router(registrations: SharedRegistrations) -> Router {
    Router::new()
        .route("/api/schedule", get(schedule_handler))
        .route("/api/plans/default", post(default_plan_handler))
        .route("/api/plans/apply", post(apply_handler))
        .route(
            "/api/registrations",
            get(list_registrations_handler).post(create_registration_handler),
        )
        .route(
            "/api/registrations/:id",
            get(get_registration_handler)
                .put(update_registration_handler)
                .delete(delete_registration_handler),
        )
        .route(
            "/api/registrations/:id/duplicate",
            post(duplicate_registration_handler),
        )
        .route(
            "/api/registrations/:id/plans/:plan_type",
            get(open_plan_handler)
                .put(save_plan_handler)
                .delete(reset_plan_handler),
        )
        .route(
            "/api/registrations/:id/plans/:plan_type/apply",
            post(apply_registration_plan_handler),
        )
        .fallback(not_found_handler)
        .with_state(registrations)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn schedule_handler(Query(payload): Query<SchedulePayload>) -> Response {
    json_response(StatusCode::OK, schedule_response(&payload))
}

async fn default_plan_handler(Json(payload): Json<DefaultPlanPayload>) -> Response {
    json_response(StatusCode::OK, default_plan_response(&payload, today()))
}

async fn apply_handler(Json(payload): Json<ApplyPayload>) -> Response {
    match apply_command(payload, today()) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => plan_error_response(&err),
    }
}

async fn list_registrations_handler(State(registrations): State<SharedRegistrations>) -> Response {
    let registrations = registrations.read().await;
    let today = today();
    let views: Vec<RegistrationView> = registrations
        .list()
        .iter()
        .map(|registration| registration_view(registration, today))
        .collect();
    json_response(StatusCode::OK, views)
}

async fn create_registration_handler(
    State(registrations): State<SharedRegistrations>,
    Json(payload): Json<RegistrationPayload>,
) -> Response {
    let today = today();
    let mut draft = RegistrationDraft::default();
    apply_registration_payload(&mut draft, payload, today);

    let mut registrations = registrations.write().await;
    let registration = registrations.create(draft, Utc::now());
    info!(id = registration.id, "created registration");
    json_response(StatusCode::CREATED, registration_view(&registration, today))
}

async fn get_registration_handler(
    State(registrations): State<SharedRegistrations>,
    Path(id): Path<u64>,
) -> Response {
    let registrations = registrations.read().await;
    match registrations.get(id) {
        Ok(registration) => json_response(StatusCode::OK, registration_view(registration, today())),
        Err(err) => plan_error_response(&err),
    }
}

async fn update_registration_handler(
    State(registrations): State<SharedRegistrations>,
    Path(id): Path<u64>,
    Json(payload): Json<RegistrationPayload>,
) -> Response {
    let today = today();
    let mut registrations = registrations.write().await;
    match registrations.get_mut(id) {
        Ok(registration) => {
            apply_registration_payload(&mut registration.draft, payload, today);
            json_response(StatusCode::OK, registration_view(registration, today))
        }
        Err(err) => plan_error_response(&err),
    }
}

async fn delete_registration_handler(
    State(registrations): State<SharedRegistrations>,
    Path(id): Path<u64>,
) -> Response {
    let mut registrations = registrations.write().await;
    match registrations.delete(id) {
        Ok(_) => {
            info!(id, "deleted registration");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => plan_error_response(&err),
    }
}

async fn duplicate_registration_handler(
    State(registrations): State<SharedRegistrations>,
    Path(id): Path<u64>,
) -> Response {
    let mut registrations = registrations.write().await;
    match registrations.duplicate(id, Utc::now()) {
        Ok(copy) => {
            info!(source = id, id = copy.id, "duplicated registration");
            json_response(StatusCode::CREATED, registration_view(&copy, today()))
        }
        Err(err) => plan_error_response(&err),
    }
}

async fn open_plan_handler(
    State(registrations): State<SharedRegistrations>,
    Path((id, plan_type)): Path<(u64, PlanType)>,
) -> Response {
    let registrations = registrations.read().await;
    let result = registrations
        .get(id)
        .and_then(|registration| open_session(&registration.draft, plan_type, today()));
    match result {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => plan_error_response(&err),
    }
}

async fn apply_registration_plan_handler(
    State(registrations): State<SharedRegistrations>,
    Path((id, plan_type)): Path<(u64, PlanType)>,
    Json(payload): Json<RegistrationApplyPayload>,
) -> Response {
    let registrations = registrations.read().await;
    let today = today();
    let result = registrations.get(id).and_then(|registration| {
        let draft = &registration.draft;
        let session = PlanEditor {
            plan_type,
            ..payload.session
        };
        let next = session.apply(&payload.command, draft.anchor_date(today))?;
        let summary = summarize_editor(&next, draft.total_price());
        Ok(SessionResponse {
            session: next,
            summary,
        })
    });
    match result {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => plan_error_response(&err),
    }
}

async fn save_plan_handler(
    State(registrations): State<SharedRegistrations>,
    Path((id, plan_type)): Path<(u64, PlanType)>,
    Json(payload): Json<SessionPayload>,
) -> Response {
    let today = today();
    let mut registrations = registrations.write().await;
    let result = registrations.get_mut(id).and_then(|registration| {
        let session = PlanEditor {
            plan_type,
            ..payload.session
        };
        registration.draft.save_plan(&session)?;
        Ok(registration_view(registration, today))
    });
    match result {
        Ok(view) => json_response(StatusCode::OK, view),
        Err(err) => plan_error_response(&err),
    }
}

async fn reset_plan_handler(
    State(registrations): State<SharedRegistrations>,
    Path((id, plan_type)): Path<(u64, PlanType)>,
) -> Response {
    let today = today();
    let mut registrations = registrations.write().await;
    match registrations.get_mut(id) {
        Ok(registration) => {
            registration.draft.plan_library.remove(plan_type);
            json_response(StatusCode::OK, registration_view(registration, today))
        }
        Err(err) => plan_error_response(&err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn plan_error_response(err: &PlanError) -> Response {
    let status = match err {
        PlanError::UnknownRegistration(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

fn schedule_response(payload: &SchedulePayload) -> ScheduleResponse {
    let start_date = payload.start_date.as_deref().unwrap_or("");
    let count = payload
        .count
        .unwrap_or(DEFAULT_SCHEDULE_COUNT)
        .min(MAX_SCHEDULE_COUNT);
    ScheduleResponse {
        dates: generate_display(start_date, count),
        iso_dates: generate(parse_date(start_date), count),
    }
}

fn default_plan_response(payload: &DefaultPlanPayload, today: NaiveDate) -> PlanResponse {
    let context = payload.context.resolve(today);
    let plan = match payload.plan_type {
        PlanType::FullPayment => default_plan(
            payload.plan_type,
            payload.context.start_date.as_deref().and_then(parse_date),
        ),
        plan_type => default_plan(plan_type, context.anchor),
    };
    let summary = summarize(&plan, context.price);
    PlanResponse { plan, summary }
}

fn apply_command(payload: ApplyPayload, today: NaiveDate) -> Result<SessionResponse, PlanError> {
    let context = payload.context.resolve(today);
    let session = payload.session.apply(&payload.command, context.anchor)?;
    let summary = summarize_editor(&session, context.price);
    Ok(SessionResponse { session, summary })
}

fn open_session(
    draft: &RegistrationDraft,
    plan_type: PlanType,
    today: NaiveDate,
) -> Result<SessionResponse, PlanError> {
    let session = draft.open_plan(plan_type, today)?;
    let summary = summarize_editor(&session, draft.total_price());
    Ok(SessionResponse { session, summary })
}

/// Copies the fields present in `payload` onto `draft`.
///
/// A start date change refreshes the due dates of every saved plan. Text
/// that is not a date leaves the date unset.
fn apply_registration_payload(
    draft: &mut RegistrationDraft,
    payload: RegistrationPayload,
    today: NaiveDate,
) {
    if let Some(v) = payload.title {
        draft.title = v;
    }
    if let Some(v) = payload.description {
        draft.description = v;
    }
    if let Some(v) = payload.price {
        draft.set_price_input(&v);
    }
    if let Some(v) = payload.is_free {
        draft.set_free(v);
    }
    if let Some(v) = payload.end_date {
        draft.end_date = parse_date(&v);
    }
    if let Some(v) = payload.enabled_plan_types {
        draft.enabled_plan_types = v.into_iter().collect();
    }
    if let Some(v) = payload.start_date {
        let start_date = parse_date(&v);
        if start_date != draft.start_date {
            draft.change_start_date(start_date, today, None);
        }
    }
}

fn registration_view(registration: &Registration, today: NaiveDate) -> RegistrationView {
    let draft = &registration.draft;
    let price = draft.total_price();
    let plans = draft
        .enabled_plan_types
        .iter()
        .map(|&plan_type| {
            let plan = draft.effective_plan(plan_type, today);
            let view = PlanView {
                title: plan_title(&draft.plan_library, plan_type),
                customized: draft.plan_library.contains(plan_type),
                summary: summarize(&plan, price),
            };
            (plan_type, view)
        })
        .collect();

    RegistrationView {
        registration: registration.clone(),
        price_text: format_price(&draft.price, draft.is_free),
        start_date_text: format_optional_date(draft.start_date),
        end_date_text: format_optional_date(draft.end_date),
        payment_options_text: payment_options_text(&draft.enabled_plan_types),
        start_date_validation: validate_start_date(draft.start_date, today),
        date_range_warning: date_range_warning(draft.start_date, draft.end_date),
        plans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DueDate, Percentage};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn today() -> NaiveDate {
        date(2025, 3, 1)
    }

    #[test]
    fn schedule_payload_defaults_to_four_dates() {
        let payload: SchedulePayload =
            serde_json::from_str(r#"{"startDate":"2025-03-15"}"#).expect("payload");
        let response = schedule_response(&payload);
        assert_eq!(
            response.dates,
            vec!["May 1, 2025", "Jun 1, 2025", "Jul 1, 2025", "Aug 1, 2025"]
        );
        assert_eq!(response.iso_dates[0], Some(date(2025, 5, 1)));
    }

    #[test]
    fn schedule_with_unparseable_anchor_is_empty() {
        let payload = SchedulePayload {
            start_date: Some("soon".to_string()),
            count: Some(2),
        };
        let response = schedule_response(&payload);
        assert_eq!(response.dates, vec![String::new(), String::new()]);
        assert_eq!(response.iso_dates, vec![None, None]);
    }

    #[test]
    fn default_plan_payload_prices_rows() {
        let payload: DefaultPlanPayload = serde_json::from_str(
            r#"{"planType":"deposit-installments","startDate":"2025-03-15","price":"250"}"#,
        )
        .expect("payload");
        let response = default_plan_response(&payload, today());
        assert_eq!(response.plan.payments.len(), 5);
        assert!(response.summary.complete);
        assert_eq!(response.summary.rows[0].amount, "50.00");
        assert_eq!(response.summary.rows[1].due_date, "May 1, 2025");
    }

    #[test]
    fn default_plan_with_past_anchor_has_no_dates() {
        let payload: DefaultPlanPayload = serde_json::from_str(
            r#"{"planType":"fourInstallments","startDate":"2024-01-01"}"#,
        )
        .expect("payload");
        let response = default_plan_response(&payload, today());
        assert!(response.plan.payments.iter().all(|p| p.due_date == DueDate::Unset));
    }

    #[test]
    fn apply_payload_runs_command_against_session() {
        let session = PlanEditor::from_plan(
            PlanType::FourInstallments,
            default_plan(PlanType::FourInstallments, Some(date(2025, 3, 15))),
        );
        let json = serde_json::json!({
            "session": session,
            "command": { "op": "setPercentage", "id": 1, "input": "40" },
            "startDate": "2025-03-15",
            "price": "1000",
        });
        let payload: ApplyPayload = serde_json::from_value(json).expect("payload");
        let response = apply_command(payload, today()).expect("valid command");

        let values: Vec<Percentage> = response
            .session
            .rows
            .iter()
            .map(|row| row.percentage())
            .collect();
        assert_eq!(
            values,
            vec![
                Percentage::from_whole(40),
                Percentage::from_whole(20),
                Percentage::from_whole(20),
                Percentage::from_whole(20),
            ]
        );
        assert_eq!(response.summary.rows[0].amount, "400.00");
        assert!(response.summary.rows[0].locked);

        let round_trip = serde_json::to_value(&response.session).expect("serialize");
        assert_eq!(round_trip["rows"][0]["status"], "locked");
    }

    #[test]
    fn apply_payload_reports_caller_errors() {
        let session = PlanEditor::from_plan(
            PlanType::FourInstallments,
            default_plan(PlanType::FourInstallments, None),
        );
        let json = serde_json::json!({
            "session": session,
            "command": { "op": "setDeposit", "id": 3, "isDeposit": true },
        });
        let payload: ApplyPayload = serde_json::from_value(json).expect("payload");
        let err = apply_command(payload, today()).expect_err("deposit on third row");
        assert_eq!(err, PlanError::DepositNotFirst { id: 3, position: 2 });
    }

    #[test]
    fn registration_payload_updates_fields_and_refreshes_dates() {
        let mut draft = RegistrationDraft {
            start_date: Some(date(2025, 3, 15)),
            ..RegistrationDraft::default()
        };
        let editor = draft
            .open_plan(PlanType::FourInstallments, today())
            .expect("customizable");
        draft.save_plan(&editor).expect("complete plan saves");

        let payload: RegistrationPayload = serde_json::from_str(
            r#"{
              "title": "Fall term",
              "price": "$1,200.999",
              "startDate": "2025-06-10",
              "endDate": "2025-06-01",
              "enabledPlanTypes": ["fullPayment", "four-installments"]
            }"#,
        )
        .expect("payload");
        apply_registration_payload(&mut draft, payload, today());

        assert_eq!(draft.title, "Fall term");
        assert_eq!(draft.price, "1200.99");
        assert_eq!(draft.start_date, Some(date(2025, 6, 10)));
        assert_eq!(draft.date_range_warning(), Some(crate::core::END_BEFORE_START));
        let saved = draft
            .plan_library
            .get(PlanType::FourInstallments)
            .expect("saved plan");
        assert_eq!(saved.payments[0].due_date, DueDate::On(date(2025, 8, 1)));
    }

    #[test]
    fn registration_view_serializes_display_fields() {
        let mut list = RegistrationList::new();
        let registration = list.create(
            RegistrationDraft {
                title: "Swim lessons".to_string(),
                price: "1200".to_string(),
                start_date: Some(date(2025, 3, 15)),
                ..RegistrationDraft::default()
            },
            Utc::now(),
        );
        let json = serde_json::to_value(registration_view(&registration, today()))
            .expect("view should serialize");

        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Swim lessons");
        assert_eq!(json["priceText"], "$1,200.00");
        assert_eq!(json["startDateText"], "Mar 15, 2025");
        assert_eq!(json["endDateText"], "Not set");
        assert_eq!(
            json["paymentOptionsText"],
            "4 Installments, 4 Installments (with deposit)"
        );
        assert_eq!(json["startDateValidation"]["valid"], true);
        assert_eq!(
            json["plans"]["depositInstallments"]["summary"]["rows"][0]["amount"],
            "240.00"
        );
        assert_eq!(json["plans"]["fourInstallments"]["customized"], false);
    }

    #[test]
    fn open_session_refuses_full_payment() {
        let draft = RegistrationDraft::default();
        let err = open_session(&draft, PlanType::FullPayment, today()).expect_err("not editable");
        assert_eq!(err, PlanError::NotCustomizable(PlanType::FullPayment));
    }

    #[test]
    fn unknown_registration_maps_to_not_found() {
        let response = plan_error_response(&PlanError::UnknownRegistration(7));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = plan_error_response(&PlanError::UnknownInstallment(7));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
