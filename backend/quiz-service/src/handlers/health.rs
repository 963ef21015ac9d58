/// Health endpoints - summary, readiness and liveness
use actix_web::{web, HttpResponse};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::RedisError;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::sse::EmitterRegistry;

pub struct HealthState {
    db_pool: PgPool,
    redis: ConnectionManager,
    registry: Arc<EmitterRegistry>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
pub struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    open_streams: usize,
    timestamp: String,
}

impl HealthState {
    pub fn new(db_pool: PgPool, redis: ConnectionManager, registry: Arc<EmitterRegistry>) -> Self {
        Self {
            db_pool,
            redis,
            registry,
        }
    }

    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }

    async fn check_redis(&self) -> Result<(), RedisError> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(RedisError::from((
                redis::ErrorKind::ResponseError,
                "unexpected PING response",
            )))
        }
    }
}

fn component<E: std::fmt::Display>(
    name: &str,
    result: Result<(), E>,
    started: Instant,
) -> ComponentCheck {
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: format!("{name} reachable"),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("{name} check failed: {e}"),
            latency_ms,
        },
    }
}

pub async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "quiz-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "quiz-service"
        })),
    }
}

pub async fn readiness(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let started = Instant::now();
    let postgres = state.check_postgres().await;
    checks.insert(
        "postgresql".to_string(),
        component("PostgreSQL", postgres, started),
    );

    let started = Instant::now();
    let redis = state.check_redis().await;
    checks.insert("redis".to_string(), component("Redis", redis, started));

    let ready = checks
        .values()
        .all(|check| check.status == ComponentStatus::Healthy);
    let response = ReadinessResponse {
        ready,
        status: if ready {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        },
        checks,
        open_streams: state.registry.emitter_count(),
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
