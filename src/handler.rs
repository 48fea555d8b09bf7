//! The request handler: one linear pass from request to [`ApiResponse`].

use crate::config::RelayConfig;
use crate::errors::HandlerError;
use crate::logger::Logger;
use crate::request::{ApiRequest, EmailRequest};
use crate::response::{create_response, ApiResponse, ErrorBody, SuccessBody};
use crate::transport::{MailMessage, MailTransport, TransportFactory};

pub struct EmailHandler<F> {
    config: RelayConfig,
    factory: F,
    logger: Logger,
}

impl<F: TransportFactory> EmailHandler<F> {
    pub fn new(config: RelayConfig, factory: F, logger: Logger) -> Self {
        Self {
            config,
            factory,
            logger,
        }
    }

    /// Never fails: every error becomes a JSON error response.
    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        if request.is_preflight() {
            return ApiResponse::preflight();
        }
        match self.process(request).await {
            Ok(response) => response,
            Err(e) => self.recover(&e),
        }
    }

    async fn process(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let email = EmailRequest::parse(request.body.as_deref())?;
        let settings = self.config.settings()?;

        let mut transport = self.factory.create(&settings);
        transport.verify().await?;

        let message = MailMessage::new(settings.sender(), &email);
        let sent = transport.send(&message).await?;

        let body = serde_json::to_value(SuccessBody::new(&sent.message_id, &email.receiver_email))
            .map_err(|e| HandlerError::Unexpected(e.to_string()))?;
        Ok(create_response(200, &body, &[]))
    }

    /// Maps an error to its response, logging the ones an operator must see.
    pub fn recover(&self, e: &HandlerError) -> ApiResponse {
        if e.is_operator_facing() {
            self.logger.error(&format!("{}: {}", e.error_code(), e));
        }
        match serde_json::to_value(ErrorBody::from(e)) {
            Ok(body) => create_response(e.status_code(), &body, &[]),
            Err(ser) => {
                self.logger.error(&format!("failed to serialize error body: {}", ser));
                ApiResponse::internal_error()
            }
        }
    }
}
