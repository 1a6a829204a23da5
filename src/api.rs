use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        FromRequest, Path, Request, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use rust_decimal::Decimal;

use crate::domain::{OrderId, OrderType, Side, Symbol};
use crate::engine::SubmitRequest;
use crate::facade::Exchange;

/// Shared application state. `default_depth` is the snapshot depth used
/// when a caller doesn't specify one.
#[derive(Clone)]
pub struct AppState {
    pub exchange: Exchange,
    pub default_depth: usize,
}

type ApiErr = (StatusCode, Json<serde_json::Value>);
fn err(status: StatusCode, msg: &str) -> ApiErr {
    (status, Json(json!({ "error": msg })))
}

pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| err(StatusCode::BAD_REQUEST, &e.to_string()))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(val) => Ok(LoggedJson(val)),
            Err(e) => {
                let preview = String::from_utf8_lossy(&bytes);
                let preview = &preview[..preview.len().min(4096)];
                warn!(
                    error = %e,
                    %method,
                    uri = %uri,
                    body_preview = %preview,
                    "order rejected: JSON deserialization failed"
                );
                Err(err(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))
            }
        }
    }
}

/// Request payload for `POST /orders`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: u64,
    pub client_id: String,
}

/// `POST /orders` — submits an order and returns its execution report.
pub async fn create_order(
    State(state): State<AppState>,
    LoggedJson(payload): LoggedJson<NewOrder>,
) -> impl IntoResponse {
    let report = state.exchange.submit_order(SubmitRequest {
        client_order_id: payload.client_order_id,
        symbol: payload.symbol,
        side: payload.side,
        order_type: payload.order_type,
        price: payload.price,
        quantity: payload.quantity,
        client_id: payload.client_id,
    });
    if report.order_status == '8' {
        warn!(order_id = %report.order_id, "order rejected");
    }
    Json(report)
}

/// `DELETE /orders/{symbol}/{id}` — cancels a resting order.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path((symbol, order_id)): Path<(Symbol, u64)>,
) -> impl IntoResponse {
    if state.exchange.cancel_order(&symbol, OrderId(order_id)) {
        info!(order_id, "order cancelled");
        (StatusCode::OK, Json(json!({"status": "cancelled"})))
    } else {
        warn!(order_id, "cancel failed: order not found or inactive");
        err(StatusCode::NOT_FOUND, "order not found")
    }
}

/// `GET /book/{symbol}` — a snapshot of the top of book.
pub async fn get_order_book(
    State(state): State<AppState>,
    Path(symbol): Path<Symbol>,
) -> impl IntoResponse {
    match state.exchange.snapshot(&symbol, state.default_depth) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => err(StatusCode::NOT_FOUND, "unknown symbol").into_response(),
    }
}

/// `GET /quote/{symbol}` — best bid/ask and spread.
pub async fn get_quote(State(state): State<AppState>, Path(symbol): Path<Symbol>) -> impl IntoResponse {
    match state.exchange.quote(&symbol) {
        Some(quote) => Json(quote).into_response(),
        None => err(StatusCode::NOT_FOUND, "unknown symbol").into_response(),
    }
}

/// `GET /stats` — process-wide order/trade counters.
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.exchange.stats())
}

/// `GET /ws/{symbol}` — upgrades to a WebSocket streaming market-data
/// events for `symbol`.
pub async fn ws_handler(
    Path(symbol): Path<Symbol>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, symbol))
}

/// Sends an initial order-book snapshot, then forwards market-data events
/// until the client disconnects or the subscriber channel closes.
async fn handle_socket(mut socket: WebSocket, state: AppState, symbol: Symbol) {
    let (sub_id, mut events) = state.exchange.subscribe_market_data(symbol.clone());

    if let Some(snapshot) = state.exchange.snapshot(&symbol, state.default_depth) {
        let event = crate::market_data::MarketDataEvent::from_snapshot(symbol.clone(), &snapshot);
        if let Err(e) = socket
            .send(Message::Text(serde_json::to_string(&event).unwrap().into()))
            .await
        {
            error!("failed to send initial snapshot: {:?}", e);
            state.exchange.unsubscribe_market_data(sub_id);
            return;
        }
    }

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else { break };
                if let Err(e) = socket.send(Message::Text(serde_json::to_string(&event).unwrap().into())).await {
                    error!("websocket send failed: {:?}", e);
                    break;
                }
            }
            maybe_msg = socket.recv() => {
                if maybe_msg.is_none() {
                    break;
                }
            }
        }
    }
    state.exchange.unsubscribe_market_data(sub_id);
}

/// Constructs the application's `Router` with all routes and shared state.
pub fn router(exchange: Exchange, default_depth: usize) -> Router {
    let state = AppState {
        exchange,
        default_depth,
    };
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{symbol}/{id}", delete(cancel_order))
        .route("/book/{symbol}", get(get_order_book))
        .route("/quote/{symbol}", get(get_quote))
        .route("/stats", get(get_stats))
        .route("/ws/{symbol}", get(ws_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(false)
                        .level(tracing::Level::TRACE),
                )
                .on_response(DefaultOnResponse::new().level(tracing::Level::TRACE)),
        )
        .with_state(state)
}
