use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::AnyPool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(
        name: String,
        actor_id: Option<Uuid>,
        subject_id: Option<Uuid>,
        payload: T,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Request context captured once at the HTTP boundary for audit entries.
/// Downstream code only ever sees these typed fields, never raw headers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            ip,
            user_agent,
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Audit payload: new state, optional previous state, request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    pub severity: Severity,
}

/// Emit an audit event for an entity. Fire and forget: audit failures must
/// never break the request that triggered them.
pub fn record_audit<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<Uuid>,
    entity: &T,
    old_entity: Option<&T>,
    context: Option<RequestContext>,
) {
    let event_name = format!("{}.{}", T::entity_type(), action);

    let severity = entity.severity_for_action(action);
    let payload = AuditPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        context,
        severity,
    };

    let event = DomainEvent::new(
        event_name,
        actor_id,
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    let _ = event_bus.send(serde_json::to_value(event).unwrap_or_default());
}

fn describe(name: &str) -> &'static str {
    match name {
        "user.created" => "User signed up",
        "group.created" => "Group created",
        "group.renamed" => "Group renamed",
        "group.deleted" => "Group deleted",
        "person.created" => "Person added to group",
        _ => "System event",
    }
}

/// Persist audit events into `audit_log`, chaining each row's hash to the
/// previous one so tampering is detectable.
pub async fn start_audit_listener(mut rx: broadcast::Receiver<Value>, pool: AnyPool) {
    use sha2::{Digest, Sha256};

    tracing::info!("audit listener started");
    while let Ok(event) = rx.recv().await {
        let name = event
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let actor_id = event
            .get("actor_id")
            .and_then(|v| v.as_str())
            .map(String::from);
        let subject_id = event
            .get("subject_id")
            .and_then(|v| v.as_str())
            .map(String::from);
        let occurred_at = event
            .get("occurred_at")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let severity = event
            .get("payload")
            .and_then(|p| p.get("severity"))
            .and_then(|s| s.as_str())
            .unwrap_or("important")
            .to_string();

        let payload = serde_json::to_string(&event).unwrap_or_default();

        let prev_hash: Option<String> = sqlx::query_scalar(
            "SELECT hash FROM audit_log ORDER BY recorded_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&pool)
        .await
        .ok()
        .flatten();

        // hash = SHA256(prev_hash || payload)
        let mut hasher = Sha256::new();
        if let Some(ref prev) = prev_hash {
            hasher.update(prev.as_bytes());
        }
        hasher.update(payload.as_bytes());
        let hash = hex::encode(hasher.finalize());

        let result = sqlx::query(
            "INSERT INTO audit_log \
               (id, event_name, description, actor_id, subject_id, occurred_at, payload, severity, prev_hash, hash, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(describe(&name))
        .bind(actor_id)
        .bind(subject_id)
        .bind(&occurred_at)
        .bind(&payload)
        .bind(&severity)
        .bind(&prev_hash)
        .bind(&hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::error!("failed to persist audit entry: {}", e);
        }
    }
}
