//! Request and Response models for the inspection server
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{
    BlockadeQuery, IncidentQuery, PreloadRequest, ReadQuery, RoutePreloadRequest,
    TransferListQuery,
};
pub use responses::{
    ClearResponse, HealthResponse, InvalidateResponse, StatsResponse, StatusResponse,
};
