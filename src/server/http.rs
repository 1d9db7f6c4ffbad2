//! rouille front end: parse, enqueue, wait, answer.
//!
//! Runs on rouille's worker threads. Never touches host state; everything
//! goes through the job channel to the [`TickBridge`](super::bridge::TickBridge).

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use rouille::{Request, Response};

use super::bridge::Job;
use super::routes::RouteTable;
use crate::api::{ApiResponse, Body};

pub(crate) struct HttpFrontend {
    routes: RouteTable,
    jobs: Sender<Job>,
    cors: bool,
}

impl HttpFrontend {
    pub(crate) fn new(routes: RouteTable, jobs: Sender<Job>, cors: bool) -> Self {
        Self { routes, jobs, cors }
    }

    pub(crate) fn handle(&self, request: &Request) -> Response {
        if self.cors && request.method() == "OPTIONS" {
            return self.with_cors(request, Self::preflight(request));
        }

        let path = request.url();
        let response = match self.routes.lookup(request.method(), &path) {
            Some(call) => {
                debug!("{} {} -> {:?}", request.method(), path, call);
                let (job, reply) = Job::new(call);
                to_rouille(self.dispatch(job, &reply))
            }
            None => to_rouille(ApiResponse::error(404, "Not found")),
        };
        self.with_cors(request, response)
    }

    /// Queue the job for the host thread and block until it is answered.
    fn dispatch(&self, job: Job, reply: &Receiver<ApiResponse>) -> ApiResponse {
        if self.jobs.send(job).is_err() {
            warn!("Request arrived after the tick bridge was removed");
            return ApiResponse::error(503, "Server is shutting down");
        }
        match reply.recv() {
            Ok(response) => response,
            Err(_) => {
                warn!("Tick bridge dropped a pending request");
                ApiResponse::error(503, "Server is shutting down")
            }
        }
    }

    fn preflight(request: &Request) -> Response {
        let headers = request
            .header("Access-Control-Request-Headers")
            .map(str::to_owned)
            .unwrap_or_else(|| "*".to_owned());
        Response::empty_204()
            .with_additional_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .with_additional_header("Access-Control-Allow-Headers", headers)
    }

    /// Permissive CORS: echo the origin so credentials are allowed.
    fn with_cors(&self, request: &Request, response: Response) -> Response {
        if !self.cors {
            return response;
        }
        let origin = request.header("Origin").map(str::to_owned).unwrap_or_else(|| "*".to_owned());
        response
            .with_additional_header("Access-Control-Allow-Origin", origin)
            .with_additional_header("Access-Control-Allow-Credentials", "true")
            .with_additional_header("Vary", "Origin")
    }
}

fn to_rouille(response: ApiResponse) -> Response {
    let out = match response.body {
        Body::Json(json) => Response::from_data("application/json", json),
        Body::Text(text) => Response::text(text),
    };
    out.with_status_code(response.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rouille_status_and_type() {
        let response = to_rouille(ApiResponse::error(404, "Not found"));
        assert_eq!(response.status_code, 404);
        assert!(
            response
                .headers
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("Content-Type") && v == "application/json")
        );

        let response = to_rouille(ApiResponse::text("1.0"));
        assert_eq!(response.status_code, 200);
    }
}
