//! Worker `fetch` entry: adapts the runtime request and response types.

use worker::{event, Context, Env, Headers, Request, Response, Result};

use crate::config::RelayConfig;
use crate::errors::HandlerError;
use crate::handler::EmailHandler;
use crate::logger::{LogLevel, Logger};
use crate::mailer::SmtpTransportFactory;
use crate::request::ApiRequest;
use crate::response::ApiResponse;

const LOG_PREFIX: &str = "[email-relay] ";

fn into_worker_response(response: ApiResponse) -> Result<Response> {
    let headers = Headers::new();
    for (name, value) in &response.headers {
        headers.set(name, value)?;
    }
    Ok(Response::ok(response.body)?
        .with_status(response.status_code)
        .with_headers(headers))
}

#[event(fetch)]
async fn fetch(mut req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = RelayConfig::from_env(&env, &Logger::new(LogLevel::Warn, LOG_PREFIX));
    let logger = Logger::new(config.log_level, LOG_PREFIX);
    let handler = EmailHandler::new(config, SmtpTransportFactory::new(logger.clone()), logger);

    let method = req.method().to_string();
    let response = match req.text().await {
        Ok(body) => handler.handle(&ApiRequest::new(method, Some(body))).await,
        Err(e) => handler.recover(&HandlerError::Unexpected(format!(
            "failed to read request body: {}",
            e
        ))),
    };
    into_worker_response(response)
}
