//! The `LogService` gRPC surface.
//!
//! Every method authenticates and authorizes the caller before touching the
//! [`crate::log::Log`], then maps [`LogError`] to a wire `Status` only at
//! this boundary — the storage layer itself never knows about gRPC.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::auth::{self, Authorizer};
use crate::booking::{self, Booking};
use crate::error::LogError;
use crate::log::Log;
use crate::pb;
use crate::pb::log_service_server::LogService;

/// Channel capacity for the two streaming RPCs. Small and fixed: the
/// producer/consumer on the other end of the stream is the natural backpressure
/// point, not this buffer.
const STREAM_BUFFER: usize = 16;

/// How long `ConsumeStream`'s tailing loop sleeps between `OffsetOutOfRange`
/// retries, so a caller waiting on the tail backs off instead of busy-looping.
const TAIL_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(15);

pub struct LogServer {
    log: Arc<Log>,
    authorizer: Arc<dyn Authorizer>,
    servers: Vec<pb::Server>,
}

impl LogServer {
    pub fn new(log: Arc<Log>, authorizer: Arc<dyn Authorizer>, servers: Vec<pb::Server>) -> Self {
        Self {
            log,
            authorizer,
            servers,
        }
    }

    /// Authenticates the caller and authorizes `action`, logging the outcome.
    /// Returns the verified subject on success.
    fn require_subject<T>(&self, request: &Request<T>, action: &'static str) -> Result<String, Status> {
        let subject = auth::subject(request).map_err(|err| {
            tracing::warn!(action, %err, "authentication failed");
            Status::from(err)
        })?;
        self.authorizer
            .authorize(&subject, auth::OBJECT_WILDCARD, action)
            .map_err(|err| {
                tracing::warn!(subject = %subject, action, "authorization denied");
                Status::from(err)
            })?;
        tracing::info!(subject = %subject, action, "rpc authorized");
        Ok(subject)
    }
}

fn require_booking(opt: Option<pb::Booking>, verb: &str) -> Result<Booking, Status> {
    let booking: Booking = opt
        .ok_or_else(|| {
            crate::error::localized_status(
                tonic::Code::InvalidArgument,
                format!("cannot {verb} booking: missing booking"),
            )
        })?
        .into();
    if booking.uuid.is_empty() {
        return Err(crate::error::localized_status(
            tonic::Code::InvalidArgument,
            format!("cannot {verb} booking: {booking:?}"),
        ));
    }
    Ok(booking)
}

#[tonic::async_trait]
impl LogService for LogServer {
    type ProduceStreamStream = ReceiverStream<Result<pb::ProduceResponse, Status>>;
    type ConsumeStreamStream = ReceiverStream<Result<pb::ConsumeResponse, Status>>;

    async fn produce(
        &self,
        request: Request<pb::ProduceRequest>,
    ) -> Result<Response<pb::ProduceResponse>, Status> {
        self.require_subject(&request, "produce")?;
        let record = request.into_inner().record.unwrap_or_default();
        let offset = self.log.append(record).map_err(|err| {
            tracing::error!(%err, "produce failed");
            Status::from(err)
        })?;
        Ok(Response::new(pb::ProduceResponse { offset }))
    }

    async fn consume(
        &self,
        request: Request<pb::ConsumeRequest>,
    ) -> Result<Response<pb::ConsumeResponse>, Status> {
        self.require_subject(&request, "consume")?;
        let offset = request.into_inner().offset;
        let record = self.log.read(offset).map_err(Status::from)?;
        Ok(Response::new(pb::ConsumeResponse {
            record: Some(record),
        }))
    }

    async fn produce_stream(
        &self,
        request: Request<tonic::Streaming<pb::ProduceRequest>>,
    ) -> Result<Response<Self::ProduceStreamStream>, Status> {
        self.require_subject(&request, "produce")?;
        let log = self.log.clone();
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                let message = match inbound.message().await {
                    Ok(Some(message)) => message,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                };
                let record = message.record.unwrap_or_default();
                let result = log.append(record).map(|offset| pb::ProduceResponse { offset });
                if tx.send(result.map_err(Status::from)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn consume_stream(
        &self,
        request: Request<pb::ConsumeRequest>,
    ) -> Result<Response<Self::ConsumeStreamStream>, Status> {
        self.require_subject(&request, "consume")?;
        let log = self.log.clone();
        let mut cursor = request.into_inner().offset;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                match log.read(cursor) {
                    Ok(record) => {
                        let response = pb::ConsumeResponse {
                            record: Some(record),
                        };
                        if tx.send(Ok(response)).await.is_err() {
                            // Client dropped the stream; stop without error.
                            break;
                        }
                        cursor += 1;
                    }
                    Err(LogError::OffsetOutOfRange(_)) => {
                        // Block past the tail, but notice a dropped receiver
                        // (client cancellation) instead of spinning forever.
                        tokio::select! {
                            _ = tokio::time::sleep(TAIL_POLL_INTERVAL) => {}
                            _ = tx.closed() => break,
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(Status::from(err))).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn create_booking(
        &self,
        request: Request<pb::CreateBookingRequest>,
    ) -> Result<Response<pb::CreateBookingResponse>, Status> {
        self.require_subject(&request, "createBooking")?;
        let mut incoming = require_booking(request.into_inner().booking, "create")?;
        incoming.active = true;
        incoming.created_at = Some(booking::now_nanos());
        incoming.updated_at = None;

        self.log.append_booking(&incoming).map_err(|err| {
            tracing::error!(%err, "create booking failed");
            Status::from(err)
        })?;
        Ok(Response::new(pb::CreateBookingResponse {
            booking: Some(incoming.into()),
        }))
    }

    async fn update_booking(
        &self,
        request: Request<pb::UpdateBookingRequest>,
    ) -> Result<Response<pb::UpdateBookingResponse>, Status> {
        self.require_subject(&request, "updateBooking")?;
        let mut incoming = require_booking(request.into_inner().booking, "update")?;

        let existing = self.log.read_booking(&incoming.uuid).map_err(Status::from)?;
        incoming.active = true;
        incoming.created_at = existing.created_at;
        incoming.updated_at = Some(booking::now_nanos());

        self.log.append_booking(&incoming).map_err(|err| {
            tracing::error!(%err, "update booking failed");
            Status::from(err)
        })?;
        Ok(Response::new(pb::UpdateBookingResponse {
            booking: Some(incoming.into()),
        }))
    }

    async fn get_booking(
        &self,
        request: Request<pb::GetBookingRequest>,
    ) -> Result<Response<pb::GetBookingResponse>, Status> {
        self.require_subject(&request, "getBooking")?;
        let uuid = request.into_inner().uuid;
        let booking = self.log.read_booking(&uuid).map_err(Status::from)?;
        Ok(Response::new(pb::GetBookingResponse {
            booking: Some(booking.into()),
        }))
    }

    async fn get_servers(
        &self,
        request: Request<pb::GetServersRequest>,
    ) -> Result<Response<pb::GetServersResponse>, Status> {
        self.require_subject(&request, "getServers")?;
        Ok(Response::new(pb::GetServersResponse {
            servers: self.servers.clone(),
        }))
    }
}
