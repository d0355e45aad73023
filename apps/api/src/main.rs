use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use cqrs_es::{AggregateError, CqrsFramework, EventStore};
use domain::{
    calculators::OrderRequest,
    drafting::{CannedDrafter, Drafter},
    orders::{self, inputs as order_inputs, OrderKind},
    prescriptions::{self, inputs as prescription_inputs},
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};
use ulid::Ulid;

#[derive(Clone)]
struct AppState {
    prescriptions_repo: prescriptions::cqrs::Repo,
    prescriptions_cqrs: Arc<prescriptions::cqrs::Framework>,
    orders_repo: orders::cqrs::Repo,
    orders_cqrs: Arc<orders::cqrs::Framework>,
    lab_orders_placed: Arc<AtomicU32>,
    imaging_orders_placed: Arc<AtomicU32>,
}

impl AppState {
    fn new(drafter: Arc<dyn Drafter>) -> Self {
        let prescriptions_repo = prescriptions::cqrs::init_repo();
        let prescriptions_cqrs = prescriptions::cqrs::init(
            prescriptions_repo.clone(),
            prescriptions::Services::new(drafter.clone()),
        );

        let orders_repo = orders::cqrs::init_repo();
        let orders_cqrs =
            orders::cqrs::init(orders_repo.clone(), orders::Services::new(drafter));

        Self {
            prescriptions_repo,
            prescriptions_cqrs,
            orders_repo,
            orders_cqrs,
            lab_orders_placed: Arc::new(AtomicU32::new(0)),
            imaging_orders_placed: Arc::new(AtomicU32::new(0)),
        }
    }

    fn next_order_number(&self, kind: OrderKind) -> u32 {
        let counter = match kind {
            OrderKind::Lab => &self.lab_orders_placed,
            OrderKind::Imaging => &self.imaging_orders_placed,
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or("0.0.0.0:3000".to_string());

    let state = AppState::new(Arc::new(CannedDrafter));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Encounter API listening on {}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prescriptions", post(create_prescription))
        .route(
            "/prescriptions/:id",
            get(get_prescription)
                .patch(update_prescription)
                .delete(remove_prescription),
        )
        .route("/prescriptions/:id/draft", post(draft_prescription_note))
        .route("/orders", post(place_order))
        .route("/orders/:id", get(get_order).delete(cancel_order))
        .route("/orders/:id/requests", post(add_request))
        .route("/orders/:id/requests/:index", axum::routing::delete(remove_request))
        .route("/orders/:id/diagnoses", post(add_diagnosis))
        .route(
            "/orders/:id/diagnoses/:index",
            axum::routing::delete(remove_diagnosis),
        )
        .route("/orders/:id/draft", post(draft_order))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// Run a command with a fresh command id in its metadata
async fn execute<A, ES>(
    cqrs: &CqrsFramework<A, ES>,
    id: &str,
    command: A::Command,
) -> Result<(), (StatusCode, String)>
where
    A: cqrs_es::Aggregate<Error = domain::Error>,
    ES: EventStore<A>,
{
    let mut metadata = HashMap::new();
    metadata.insert("command_id".to_string(), Ulid::new().to_string());

    cqrs.execute_with_metadata(id, command, metadata)
        .await
        .map_err(command_error)
}

fn command_error(err: AggregateError<domain::Error>) -> (StatusCode, String) {
    let status = match &err {
        AggregateError::UserError(user_error) => match user_error {
            domain::Error::NotFound { .. } => StatusCode::NOT_FOUND,
            domain::Error::Uniqueness { .. } => StatusCode::CONFLICT,
            domain::Error::Forbidden => StatusCode::FORBIDDEN,
            domain::Error::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            domain::Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            domain::Error::Drafting { .. } => StatusCode::BAD_GATEWAY,
        },
        AggregateError::AggregateConflict => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Command failed: {}", err);
    } else {
        tracing::warn!("Command rejected: {}", err);
    }
    (status, err.to_string())
}

async fn load_prescription(
    state: &AppState,
    id: &str,
) -> Result<prescriptions::PrescriptionCard, (StatusCode, String)> {
    let view = state
        .prescriptions_repo
        .load(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .filter(|view| !view.prescription.deleted)
        .ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;

    Ok(view.card())
}

async fn load_order(
    state: &AppState,
    id: &str,
) -> Result<orders::OrderCard, (StatusCode, String)> {
    let view = state
        .orders_repo
        .load(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;

    Ok(view.card())
}

// Add an empty prescription
async fn create_prescription(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let id = Ulid::new().to_string();

    let command = prescriptions::Command::AddPrescription { id: id.clone() };
    execute(&state.prescriptions_cqrs, &id, command).await?;

    tracing::info!("Prescription {} added", id);
    Ok((StatusCode::CREATED, Json(load_prescription(&state, &id).await?)))
}

async fn get_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    Ok(Json(load_prescription(&state, &id).await?))
}

// Update a single field
async fn update_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<prescription_inputs::UpdatePrescriptionInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let command = prescriptions::Command::UpdatePrescription { field: input };
    execute(&state.prescriptions_cqrs, &id, command).await?;

    Ok(Json(load_prescription(&state, &id).await?))
}

async fn draft_prescription_note(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<prescription_inputs::DraftNoteInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let command = prescriptions::Command::DraftNote { prompt: input.prompt };
    execute(&state.prescriptions_cqrs, &id, command).await?;

    Ok(Json(load_prescription(&state, &id).await?))
}

async fn remove_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    execute(&state.prescriptions_cqrs, &id, prescriptions::Command::RemovePrescription).await?;

    tracing::info!("Prescription {} removed", id);
    Ok((StatusCode::OK, "Prescription removed"))
}

// Open a lab or imaging order
async fn place_order(
    State(state): State<AppState>,
    Json(input): Json<order_inputs::PlaceOrderInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let id = Ulid::new().to_string();
    let number = state.next_order_number(input.kind);

    let command = orders::Command::PlaceOrder {
        id: id.clone(),
        kind: input.kind,
        number,
    };
    execute(&state.orders_cqrs, &id, command).await?;

    tracing::info!("{} order #{} placed as {}", input.kind.label(), number, id);
    Ok((StatusCode::CREATED, Json(load_order(&state, &id).await?)))
}

async fn get_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    Ok(Json(load_order(&state, &id).await?))
}

async fn add_request(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<order_inputs::AddRequestInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let command = orders::Command::AddRequest {
        request: OrderRequest::new(input.category, input.exams),
    };
    execute(&state.orders_cqrs, &id, command).await?;

    Ok(Json(load_order(&state, &id).await?))
}

async fn remove_request(
    Path((id, index)): Path<(String, usize)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    execute(&state.orders_cqrs, &id, orders::Command::RemoveRequest { index }).await?;

    Ok(Json(load_order(&state, &id).await?))
}

async fn add_diagnosis(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<order_inputs::AddDiagnosisInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let command = orders::Command::AddDiagnosis { diagnosis: input.diagnosis };
    execute(&state.orders_cqrs, &id, command).await?;

    Ok(Json(load_order(&state, &id).await?))
}

async fn remove_diagnosis(
    Path((id, index)): Path<(String, usize)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    execute(&state.orders_cqrs, &id, orders::Command::RemoveDiagnosis { index }).await?;

    Ok(Json(load_order(&state, &id).await?))
}

async fn draft_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<order_inputs::DraftOrderInput>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let command = orders::Command::DraftOrder { prompt: input.prompt };
    execute(&state.orders_cqrs, &id, command).await?;

    Ok(Json(load_order(&state, &id).await?))
}

async fn cancel_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    execute(&state.orders_cqrs, &id, orders::Command::CancelOrder).await?;

    tracing::info!("Order {} cancelled", id);
    Ok((StatusCode::OK, "Order cancelled"))
}
