//! The JSON façade over [`crate::dispatch::Dispatcher`] (SPEC_FULL §6
//! expansion): one endpoint per command verb under `/api/v1/...`, grounded
//! in the teacher's `web::start_web_server`/`RouteErrorResponse` shape but
//! stripped of HATEOAS/schema concerns the teacher's browsing API needed
//! and this reservation engine does not.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::command::Verb;
use crate::dispatch::Dispatcher;

#[derive(Clone)]
pub struct WebState {
    dispatcher: Arc<Mutex<Dispatcher>>,
    /// HTTP requests carry no command-prefix timestamp (§6.2's
    /// dispatcher-assigned `<ts>`), so the façade synthesizes a strictly
    /// increasing one itself, same total-order role §5 assigns the
    /// stdin loop's line number.
    next_timestamp: Arc<AtomicI64>,
}

impl WebState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            next_timestamp: Arc::new(AtomicI64::new(1)),
        }
    }

    async fn run(&self, verb: Verb) -> String {
        let timestamp = self.next_timestamp.fetch_add(1, Ordering::SeqCst);
        self.dispatcher.lock().await.execute(timestamp, verb)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,
    pub message: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

fn rejected(reply: String) -> Result<Json<ReplyDto>, ErrorResponse> {
    if reply == "-1" {
        Err(ErrorResponse {
            status_code: StatusCode::BAD_REQUEST,
            message: "request rejected".to_string(),
        })
    } else {
        Ok(Json(ReplyDto { reply }))
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyDto {
    pub reply: String,
}

pub fn routes(state: WebState) -> Router {
    Router::new()
        .nest("/api/v1", v1_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn v1_routes() -> Router<WebState> {
    Router::new()
        .route("/users", post(add_user))
        .route("/users/:username", get(query_profile).patch(modify_profile))
        .route("/sessions", post(login))
        .route("/sessions/:username", axum::routing::delete(logout))
        .route("/trains", post(add_train))
        .route(
            "/trains/:train_id",
            get(query_train).delete(delete_train),
        )
        .route("/trains/:train_id/release", post(release_train))
        .route("/tickets", get(query_ticket).post(buy_ticket))
        .route("/transfers", get(query_transfer))
        .route("/orders", get(query_order))
        .route("/orders/:index/refund", post(refund_ticket))
        .route("/system/clean", post(clean))
}

pub async fn start(state: WebState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, routes(state).into_make_service()).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserBody {
    cur: String,
    username: String,
    password: String,
    name: String,
    mail: String,
    privilege: u8,
}

async fn add_user(
    State(state): State<WebState>,
    Json(body): Json<AddUserBody>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    let reply = state
        .run(Verb::AddUser {
            cur: body.cur,
            username: body.username,
            password: body.password,
            name: body.name,
            mail: body.mail,
            privilege: body.privilege,
        })
        .await;
    rejected(reply)
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(
    State(state): State<WebState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::Login {
                username: body.username,
                password: body.password,
            })
            .await,
    )
}

async fn logout(
    State(state): State<WebState>,
    Path(username): Path<String>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(state.run(Verb::Logout { username }).await)
}

#[derive(Debug, Deserialize)]
struct CurQuery {
    cur: String,
}

async fn query_profile(
    State(state): State<WebState>,
    Path(username): Path<String>,
    Query(q): Query<CurQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::QueryProfile {
                cur: q.cur,
                username,
            })
            .await,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModifyProfileBody {
    cur: String,
    password: Option<String>,
    name: Option<String>,
    mail: Option<String>,
    privilege: Option<u8>,
}

async fn modify_profile(
    State(state): State<WebState>,
    Path(username): Path<String>,
    Json(body): Json<ModifyProfileBody>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::ModifyProfile {
                cur: body.cur,
                username,
                password: body.password,
                name: body.name,
                mail: body.mail,
                privilege: body.privilege,
            })
            .await,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTrainBody {
    train_id: String,
    station_num: u16,
    seat_num: u32,
    stations: Vec<String>,
    prices: Vec<i64>,
    start_time: String,
    travel_times: Vec<i64>,
    stopover_times: Vec<i64>,
    sale_start: String,
    sale_end: String,
    train_type: u8,
}

async fn add_train(
    State(state): State<WebState>,
    Json(body): Json<AddTrainBody>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::AddTrain {
                train_id: body.train_id,
                station_num: body.station_num,
                seat_num: body.seat_num,
                stations: body.stations,
                prices: body.prices,
                start_time: body.start_time,
                travel_times: body.travel_times,
                stopover_times: body.stopover_times,
                sale_start: body.sale_start,
                sale_end: body.sale_end,
                train_type: body.train_type,
            })
            .await,
    )
}

async fn delete_train(
    State(state): State<WebState>,
    Path(train_id): Path<String>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(state.run(Verb::DeleteTrain { train_id }).await)
}

async fn release_train(
    State(state): State<WebState>,
    Path(train_id): Path<String>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(state.run(Verb::ReleaseTrain { train_id }).await)
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: String,
}

async fn query_train(
    State(state): State<WebState>,
    Path(train_id): Path<String>,
    Query(q): Query<DateQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::QueryTrain {
                train_id,
                date: q.date,
            })
            .await,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteQuery {
    from: String,
    to: String,
    date: String,
    #[serde(default = "default_sort_by")]
    sort_by: String,
}

fn default_sort_by() -> String {
    "time".to_string()
}

async fn query_ticket(
    State(state): State<WebState>,
    Query(q): Query<RouteQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::QueryTicket {
                from: q.from,
                to: q.to,
                date: q.date,
                sort_by: q.sort_by,
            })
            .await,
    )
}

async fn query_transfer(
    State(state): State<WebState>,
    Query(q): Query<RouteQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::QueryTransfer {
                from: q.from,
                to: q.to,
                date: q.date,
                sort_by: q.sort_by,
            })
            .await,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuyTicketBody {
    username: String,
    train_id: String,
    date: String,
    num: u32,
    from: String,
    to: String,
    #[serde(default)]
    queue_if_full: bool,
}

async fn buy_ticket(
    State(state): State<WebState>,
    Json(body): Json<BuyTicketBody>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::BuyTicket {
                username: body.username,
                train_id: body.train_id,
                date: body.date,
                num: body.num,
                from: body.from,
                to: body.to,
                queue_if_full: body.queue_if_full,
            })
            .await,
    )
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: String,
}

async fn query_order(
    State(state): State<WebState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::QueryOrder { username: q.user })
            .await,
    )
}

async fn refund_ticket(
    State(state): State<WebState>,
    Path(index): Path<usize>,
    Query(q): Query<UserQuery>,
) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(
        state
            .run(Verb::RefundTicket {
                username: q.user,
                order_index: index,
            })
            .await,
    )
}

async fn clean(State(state): State<WebState>) -> Result<Json<ReplyDto>, ErrorResponse> {
    rejected(state.run(Verb::Clean).await)
}
