/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/test_cluster.rs
*
* A fake API server for tests. Every request the `kube::Client` sends is
* recorded and answered by a closure, so tests can script discovery, list
* pages, conflicts and not-found responses without a cluster.
*
* SPDX-License-Identifier: Apache-2.0 */

use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Value,
}

impl RecordedRequest {
    /// `GET /api/v1`
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Exact match on one encoded `key=value` pair of the query string.
    pub fn has_query(&self, pair: &str) -> bool {
        self.query.split('&').any(|p| p == pair)
    }
}

pub struct MockCluster {
    pub client: Client,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCluster {
    /// Must be called inside a Tokio runtime.
    pub fn new<F>(mut handler: F) -> Self
    where
        F: FnMut(&RecordedRequest) -> (u16, Value) + Send + 'static,
    {
        let (service, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Some((request, send)) = handle.next_request().await {
                let (parts, body) = request.into_parts();
                let bytes = body.collect().await.map(|c| c.to_bytes()).unwrap_or_default();
                let recorded = RecordedRequest {
                    method: parts.method.to_string(),
                    path: parts.uri.path().to_string(),
                    query: parts.uri.query().unwrap_or_default().to_string(),
                    body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
                };

                let (status, payload) = handler(&recorded);
                log.lock().unwrap().push(recorded);

                let response = Response::builder()
                    .status(StatusCode::from_u16(status).unwrap())
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                    .unwrap();
                send.send_response(response);
            }
        });

        Self {
            client: Client::new(service, "default"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::route).collect()
    }
}

/// An `APIResourceList` as served by `/api/v1` or `/apis/<group>/<version>`.
/// Each resource is (plural, kind, namespaced).
pub fn resource_list(group_version: &str, resources: &[(&str, &str, bool)]) -> Value {
    let resources: Vec<Value> = resources
        .iter()
        .map(|(plural, kind, namespaced)| {
            json!({
                "name": plural,
                "singularName": kind.to_lowercase(),
                "namespaced": namespaced,
                "kind": kind,
                "verbs": ["create", "delete", "get", "list", "patch", "update", "watch"],
            })
        })
        .collect();
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources,
    })
}

/// A failure `Status` body.
pub fn status_failure(code: u16, reason: &str) -> (u16, Value) {
    (
        code,
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("{} from the test cluster", reason),
            "reason": reason,
            "code": code,
        }),
    )
}

pub fn not_found() -> (u16, Value) {
    status_failure(404, "NotFound")
}
