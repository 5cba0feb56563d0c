#![forbid(unsafe_code)]

pub mod gateway;
pub mod rest;

pub use gateway::{
    ActivityGateway, ApiError, Gateways, InMemoryGateway, ProgressGateway, SessionGateway,
    Submission, SubmittedAnswer, UserIdentity,
};
pub use rest::{RestConfig, RestGateway};
