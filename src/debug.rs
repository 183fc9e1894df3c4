//! In-process request statistics for the `/debug/stats` endpoint.
//! Counters only — prediction contents are never retained.

use once_cell::sync::Lazy;
use serde::Serialize;
use shuttle_axum::axum::{routing::get, Json, Router};
use std::{collections::VecDeque, sync::Mutex};

const LAT_CAP: usize = 200;

#[derive(Default, Clone, Serialize)]
pub struct Stats {
    pub total_requests: u64,
    pub catalog_requests: u64,
    pub predict_requests: u64,
    pub rejected_predictions: u64,
}

static STATS: Lazy<Mutex<Stats>> = Lazy::new(|| Mutex::new(Stats::default()));
static LAT_MS: Lazy<Mutex<VecDeque<u128>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(LAT_CAP)));

pub fn router() -> Router {
    Router::new().route("/debug/stats", get(stats))
}

pub fn record_catalog() {
    let mut s = STATS.lock().unwrap();
    s.total_requests += 1;
    s.catalog_requests += 1;
}

pub fn record_predict(rejected: bool) {
    let mut s = STATS.lock().unwrap();
    s.total_requests += 1;
    s.predict_requests += 1;
    if rejected {
        s.rejected_predictions += 1;
    }
}

pub fn record_latency(lat_ms: u128) {
    let mut q = LAT_MS.lock().unwrap();
    if q.len() >= LAT_CAP {
        q.pop_front();
    }
    q.push_back(lat_ms);
}

#[derive(Serialize)]
struct StatsOut {
    #[serde(flatten)]
    stats: Stats,
    rolling_avg_ms: Option<f64>,
}

async fn stats() -> Json<StatsOut> {
    let stats = STATS.lock().unwrap().clone();
    let rolling_avg_ms = {
        let q = LAT_MS.lock().unwrap();
        if q.is_empty() {
            None
        } else {
            Some(q.iter().sum::<u128>() as f64 / q.len() as f64)
        }
    };
    Json(StatsOut {
        stats,
        rolling_avg_ms,
    })
}
